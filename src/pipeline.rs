//! The build driver: stage → hooks → scan → per-file chain → bundles → page layout.
//!
//! ```text
//! source/ ──stage──▶ output/ ──before hooks──▶ ──scan──▶ [includes first, then pages/assets]
//!                                          │
//!               for each file: open → transform chain → write once
//!                                          │
//!                     bundle materialize (after every file) ──▶ output/<bundle dir>/
//!                                          │
//!                     page materialize (after bundles) ──▶ x.html → x/index.html
//!                                          │
//!                                     after hooks
//! ```
//!
//! The driver owns the build-scoped [`IncludeCache`] and [`BundleRegistry`]
//! and lends them to the transforms through [`BuildContext`]. Both are dropped
//! when [`Pipeline::run`] returns.
//!
//! Fatal errors stop the build at the first failure and name the stage and
//! file. Recoverable problems are reported as
//! [`Skipped`](crate::event::BuildEvent::Skipped) events and counted in the
//! [`BuildReport`].

use crate::bundle::{self, BundleArtifact, BundleCollector, BundleError, BundleRegistry};
use crate::cache::{CacheStats, IncludeCache};
use crate::config::{ConfigError, SiteConfig};
use crate::event::{BuildEvent, Reporter};
use crate::hook::{BuildData, BuildHook, HookError};
use crate::materialize::{MaterializeError, PathMaterializer};
use crate::minify::SourceMinifier;
use crate::paths::relative_slash_path;
use crate::scan::{self, PathRules, ScanError};
use crate::stage::{self, StageError};
use crate::transform::active::ActiveLinkAnnotator;
use crate::transform::include::IncludeResolver;
use crate::transform::inline::InlineResolver;
use crate::transform::placeholder::PlaceholderFiller;
use crate::transform::protocol::ProtocolNormalizer;
use crate::transform::src_path::SourcePathRewriter;
use crate::transform::{BuildContext, Transform, TransformError};
use crate::types::FileRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Stage error: {0}")]
    Stage(#[from] StageError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("[{stage}] {}: {source}", path.display())]
    Transform {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: TransformError,
    },
    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),
    #[error("Materialize error: {0}")]
    Materialize(#[from] MaterializeError),
    #[error("[{hook}] {phase} hook failed: {source}")]
    Hook {
        hook: &'static str,
        phase: &'static str,
        #[source]
        source: HookError,
    },
}

/// What a build produced. Written as JSON by `build --manifest`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub output: PathBuf,
    pub development: bool,
    /// Processed files relative to the output root, in their final layout.
    pub files: Vec<String>,
    pub bundles: Vec<BundleArtifact>,
    pub includes: CacheStats,
    /// Recoverable problems reported during the build.
    pub skipped: usize,
}

/// A configured build.
///
/// ```no_run
/// use pagesmith::config::SiteConfig;
/// use pagesmith::event::Reporter;
/// use pagesmith::pipeline::Pipeline;
///
/// let report = Pipeline::new(SiteConfig::default()).run(&Reporter::silent())?;
/// println!("{} files", report.files.len());
/// # Ok::<(), pagesmith::pipeline::BuildError>(())
/// ```
pub struct Pipeline {
    config: SiteConfig,
    user: Vec<Box<dyn Transform>>,
    hooks: Vec<Box<dyn BuildHook>>,
}

impl Pipeline {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config,
            user: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Add a whole-build hook. Hooks run in registration order.
    pub fn with_hook(mut self, hook: impl BuildHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Add a user transform. User transforms run first, in registration order.
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.user.push(Box::new(transform));
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Run the whole build.
    pub fn run(mut self, reporter: &Reporter) -> Result<BuildReport, BuildError> {
        let config = &self.config;
        config.validate()?;

        let staged = stage::stage(&config.source, &config.output)?;
        reporter.emit(BuildEvent::Staged {
            source: config.source.clone(),
            output: config.output.clone(),
            files: staged,
        });

        let mut build = BuildData {
            output_root: config.output.clone(),
            development: config.development,
            data: config.data.clone(),
        };
        for hook in self.hooks.iter_mut() {
            hook.before(&mut build).map_err(|source| BuildError::Hook {
                hook: hook.name(),
                phase: "before",
                source,
            })?;
        }

        let files = scan::scan(&config.output, &PathRules::from_config(config)?)?;
        reporter.emit(BuildEvent::Scanned { files: files.len() });

        let mut builtin = builtin_chain(config, build.data)?;
        let mut includes = IncludeCache::new();
        let mut bundles = BundleRegistry::new();

        for path in &files {
            let opened = FileRecord::open(path).map_err(|source| BuildError::Read {
                path: path.clone(),
                source,
            })?;
            // Staging already copied it; leave the bytes alone.
            let Some(mut file) = opened else {
                reporter.skip("read", path, "not UTF-8 text, copied unchanged");
                continue;
            };
            let mut ctx = BuildContext {
                output_root: &config.output,
                includes: &mut includes,
                bundles: &mut bundles,
                reporter,
            };
            for transform in self.user.iter_mut().chain(builtin.iter_mut()) {
                if !transform.accepts(&file) {
                    continue;
                }
                transform
                    .apply(&mut file, &mut ctx)
                    .map_err(|source| BuildError::Transform {
                        stage: transform.name(),
                        path: path.clone(),
                        source,
                    })?;
            }
            file.write().map_err(|source| BuildError::Write {
                path: path.clone(),
                source,
            })?;
            reporter.emit(BuildEvent::FileWritten {
                file: reporter.label(path),
            });
        }

        let artifacts = bundle::materialize(
            &bundles,
            &config.source,
            &config.output,
            &config.bundle.dir,
            !config.development,
            reporter,
        )?;

        let files = if config.pages.to_directory {
            PathMaterializer::from_config(config)?.run(&config.output, files, reporter)?
        } else {
            files
        };

        let report = BuildReport {
            output: config.output.clone(),
            development: config.development,
            files: relative_list(&config.output, &files),
            bundles: artifacts,
            includes: includes.stats(),
            skipped: reporter.skipped(),
        };
        for hook in self.hooks.iter_mut() {
            hook.after(&report).map_err(|source| BuildError::Hook {
                hook: hook.name(),
                phase: "after",
                source,
            })?;
        }
        Ok(report)
    }
}

/// The built-in transforms in chain order for this configuration.
/// `data` fills placeholders: `[data]` plus whatever before-hooks added.
fn builtin_chain(
    config: &SiteConfig,
    data: BTreeMap<String, String>,
) -> Result<Vec<Box<dyn Transform>>, BuildError> {
    let markers = &config.markers;
    let mut chain: Vec<Box<dyn Transform>> = vec![
        Box::new(PlaceholderFiller::new(data)),
        Box::new(IncludeResolver::new(
            markers.include.clone(),
            config.pages.to_directory,
            config.includes.strict,
        )),
    ];
    if config.development {
        let source_name = config
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let rewriter = SourcePathRewriter::new(&source_name).map_err(|source| {
            ConfigError::Pattern {
                pattern: source_name.clone(),
                source,
            }
        })?;
        chain.push(Box::new(rewriter));
    } else {
        chain.push(Box::new(InlineResolver::new(markers.inline.clone())));
    }
    chain.push(Box::new(ProtocolNormalizer::new(
        config.links.protocol_targets.clone(),
    )));
    chain.push(Box::new(ActiveLinkAnnotator::new(config.active_links.clone())));
    chain.push(Box::new(BundleCollector::new(
        markers.bundle.clone(),
        markers.no_minify.clone(),
        config.bundle.dir.clone(),
    )));
    if !config.development {
        chain.push(Box::new(SourceMinifier::new(config.minify.clone())));
    }
    Ok(chain)
}

/// Names of the built-in stages in the order they run, for display.
pub fn stage_names(config: &SiteConfig) -> Result<Vec<&'static str>, BuildError> {
    Ok(builtin_chain(config, config.data.clone())?
        .iter()
        .map(|t| t.name())
        .collect())
}

fn relative_list(root: &Path, files: &[PathBuf]) -> Vec<String> {
    files.iter().map(|f| relative_slash_path(root, f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;

    #[test]
    fn production_chain_order() {
        assert_eq!(
            stage_names(&SiteConfig::default()).unwrap(),
            vec![
                "placeholder",
                "include",
                "inline",
                "protocol",
                "active-links",
                "bundle",
                "minify"
            ]
        );
    }

    #[test]
    fn development_chain_skips_inline_and_minify() {
        let config = SiteConfig {
            development: true,
            ..SiteConfig::default()
        };
        assert_eq!(
            stage_names(&config).unwrap(),
            vec![
                "placeholder",
                "include",
                "src-path",
                "protocol",
                "active-links",
                "bundle"
            ]
        );
    }

    #[test]
    fn fixture_build_resolves_includes_and_bundles() {
        let site = setup_site();
        let report = Pipeline::new(site.config())
            .run(&Reporter::silent())
            .unwrap();

        let index = read_output(&site, "index.html");
        assert!(index.contains("<footer"));
        assert!(index.contains("/assets/bundle/bundle-main.js"));
        assert!(!index.contains("data-include"));

        let bundle = read_output(&site, "assets/bundle/bundle-main.js");
        assert!(bundle.contains("greeting"));
        assert_eq!(report.bundles.len(), 2);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn pages_are_materialized_in_report() {
        let site = setup_site();
        let report = Pipeline::new(site.config())
            .run(&Reporter::silent())
            .unwrap();

        assert!(report.files.contains(&"about/index.html".to_string()));
        assert!(report.files.contains(&"docs/guide/intro/index.html".to_string()));
        assert!(report.files.contains(&"index.html".to_string()));
        assert!(report.files.contains(&"includes/footer.html".to_string()));
        assert!(!site.output().join("about.html").exists());
    }

    #[test]
    fn include_fragments_are_read_once_per_build() {
        let site = setup_site();
        let report = Pipeline::new(site.config())
            .run(&Reporter::silent())
            .unwrap();

        // footer and nav, each used by several pages
        assert_eq!(report.includes.reads, 2);
        assert!(report.includes.hits > 0);
    }

    #[test]
    fn user_transforms_run_first() {
        struct Stamp;
        impl Transform for Stamp {
            fn name(&self) -> &'static str {
                "stamp"
            }
            fn accepts(&self, file: &FileRecord) -> bool {
                file.is_html()
            }
            fn apply(
                &mut self,
                file: &mut FileRecord,
                _ctx: &mut BuildContext<'_>,
            ) -> Result<(), TransformError> {
                file.text = file.text.replace("STAMP", "${year}");
                Ok(())
            }
        }

        let site = setup_site();
        fs::write(site.source().join("stamp.html"), "<p>STAMP</p>").unwrap();
        let mut config = site.config();
        config.data.insert("year".to_string(), "2026".to_string());
        config.minify.html = false;

        Pipeline::new(config)
            .with_transform(Stamp)
            .run(&Reporter::silent())
            .unwrap();
        // Placeholder filling ran after the user transform produced ${year}.
        assert_eq!(read_output(&site, "stamp/index.html"), "<p>2026</p>");
    }

    #[test]
    fn user_transform_error_names_stage_and_file() {
        struct Fail;
        impl Transform for Fail {
            fn name(&self) -> &'static str {
                "fail"
            }
            fn accepts(&self, file: &FileRecord) -> bool {
                file.name == "about"
            }
            fn apply(
                &mut self,
                _file: &mut FileRecord,
                _ctx: &mut BuildContext<'_>,
            ) -> Result<(), TransformError> {
                Err(TransformError::Custom("boom".to_string()))
            }
        }

        let site = setup_site();
        let err = Pipeline::new(site.config())
            .with_transform(Fail)
            .run(&Reporter::silent())
            .unwrap_err();
        match err {
            BuildError::Transform { stage, path, .. } => {
                assert_eq!(stage, "fail");
                assert!(path.ends_with("about.html"));
            }
            other => panic!("expected transform error, got {other:?}"),
        }
    }

    #[test]
    fn before_hooks_extend_data_and_add_files() {
        struct Generate;
        impl BuildHook for Generate {
            fn name(&self) -> &'static str {
                "generate"
            }
            fn before(&mut self, build: &mut BuildData) -> Result<(), HookError> {
                build.data.insert("built".to_string(), "today".to_string());
                fs::write(build.output_root.join("generated.html"), "<p>${built}</p>")?;
                Ok(())
            }
        }

        let site = setup_site();
        let mut config = site.config();
        config.minify.html = false;
        Pipeline::new(config)
            .with_hook(Generate)
            .run(&Reporter::silent())
            .unwrap();

        assert_eq!(read_output(&site, "generated/index.html"), "<p>today</p>");
        assert!(!site.source().join("generated.html").exists());
    }

    #[test]
    fn hooks_share_data_in_registration_order() {
        struct Set(&'static str);
        impl BuildHook for Set {
            fn name(&self) -> &'static str {
                "set"
            }
            fn before(&mut self, build: &mut BuildData) -> Result<(), HookError> {
                let seen = build.data.get("trail").cloned().unwrap_or_default();
                build.data.insert("trail".to_string(), format!("{seen}{}", self.0));
                Ok(())
            }
        }

        let site = setup_site();
        fs::write(site.source().join("trail.html"), "<p>${trail}</p>").unwrap();
        let mut config = site.config();
        config.minify.html = false;
        config.data.insert("trail".to_string(), "a".to_string());
        Pipeline::new(config)
            .with_hook(Set("b"))
            .with_hook(Set("c"))
            .run(&Reporter::silent())
            .unwrap();

        assert_eq!(read_output(&site, "trail/index.html"), "<p>abc</p>");
    }

    #[test]
    fn after_hooks_see_the_final_layout() {
        use std::sync::{Arc, Mutex};

        struct Record(Arc<Mutex<Vec<String>>>);
        impl BuildHook for Record {
            fn name(&self) -> &'static str {
                "record"
            }
            fn after(&mut self, report: &BuildReport) -> Result<(), HookError> {
                self.0.lock().unwrap().extend(report.files.iter().cloned());
                Ok(())
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let site = setup_site();
        Pipeline::new(site.config())
            .with_hook(Record(Arc::clone(&seen)))
            .run(&Reporter::silent())
            .unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&"about/index.html".to_string()));
        assert!(!seen.contains(&"about.html".to_string()));
    }

    #[test]
    fn hook_error_names_hook_and_phase() {
        struct Refuse;
        impl BuildHook for Refuse {
            fn name(&self) -> &'static str {
                "refuse"
            }
            fn before(&mut self, _build: &mut BuildData) -> Result<(), HookError> {
                Err("no thanks".into())
            }
        }

        let site = setup_site();
        let err = Pipeline::new(site.config())
            .with_hook(Refuse)
            .run(&Reporter::silent())
            .unwrap_err();
        match &err {
            BuildError::Hook { hook, phase, .. } => {
                assert_eq!(*hook, "refuse");
                assert_eq!(*phase, "before");
            }
            other => panic!("expected hook error, got {other:?}"),
        }
        assert_eq!(err.to_string(), "[refuse] before hook failed: no thanks");
        // Staged, but never transformed.
        assert!(read_output(&site, "index.html").contains("include="));
    }

    #[test]
    fn non_utf8_files_pass_through() {
        let site = setup_site();
        let bytes = [0x89, b'P', b'N', b'G', 0xff, 0xfe, 0x00];
        fs::create_dir_all(site.source().join("img")).unwrap();
        fs::write(site.source().join("img/logo.png"), bytes).unwrap();
        let mut config = site.config();
        config.paths.include = vec!["\\.png$".to_string()];

        let (tx, rx) = std::sync::mpsc::channel();
        let reporter = Reporter::new(tx, site.output());
        let report = Pipeline::new(config).run(&reporter).unwrap();
        drop(reporter);

        assert_eq!(fs::read(site.output().join("img/logo.png")).unwrap(), bytes);
        assert_eq!(report.skipped, 1);
        assert!(report.files.contains(&"img/logo.png".to_string()));
        let skipped: Vec<BuildEvent> = rx
            .iter()
            .filter(|e| matches!(e, BuildEvent::Skipped { .. }))
            .collect();
        assert!(matches!(
            &skipped[..],
            [BuildEvent::Skipped { stage: "read", file, .. }] if file == "img/logo.png"
        ));
    }

    #[test]
    fn missing_source_fails_before_touching_output() {
        let site = setup_site();
        let mut config = site.config();
        config.source = site.root().join("nope");
        let err = Pipeline::new(config).run(&Reporter::silent()).unwrap_err();
        assert!(matches!(err, BuildError::Stage(StageError::SourceNotFound(_))));
    }
}
