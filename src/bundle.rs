//! Asset bundling: collect marked assets per page, write one file per group.
//!
//! Bundling runs in two phases around the file loop.
//!
//! ## Phase A: collect (per HTML file)
//!
//! [`BundleCollector`] finds `<link>` and `<script>` elements carrying a
//! bundle marker:
//!
//! ```html
//! <script src="/js/a.js" bundle="main"></script>
//! <script src="/js/vendor.min.js" bundle="main" no-minify></script>
//! <script src="/js/b.js" bundle="main"></script>
//! ```
//!
//! Each member is registered in the [`BundleRegistry`] under
//! `(type, group)`, where the group is the marker value lowercased with
//! spaces turned into `-`. A path already in its group is not added again,
//! so the registry holds members in first-seen order across all pages.
//! Immediately before the *last* member of each group on the page a single
//! reference to `/<bundle dir>/bundle-<group>.<type>` is inserted, then every
//! marked element is removed.
//!
//! ## Phase B: materialize (once, after the loop)
//!
//! [`materialize`] reads every member from the **source** tree, minifies the
//! ones flagged for it, and writes the concatenation in registration order.
//! Reading and minifying run in parallel; the output order never changes. An
//! unreadable member fails the build.

use crate::dom::{self, HtmlDoc};
use crate::event::{BuildEvent, Reporter};
use crate::minify;
use crate::paths::strip_preview_origin;
use crate::transform::{BuildContext, Transform, TransformError};
use crate::types::{FileRecord, FileType};
use kuchikiki::NodeRef;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Bundle '{group}': cannot read member {}: {source}", path.display())]
    Read {
        group: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot write bundle {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One registered bundle member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Site-absolute path as referenced (`/js/a.js`).
    pub path: String,
    pub minify: bool,
}

/// Bundle members by `(type, group)`, in first-seen order.
#[derive(Debug, Default)]
pub struct BundleRegistry {
    groups: BTreeMap<(FileType, String), Vec<BundleEntry>>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member. Returns false when the path is already in the group.
    pub fn register(&mut self, file_type: FileType, group: &str, entry: BundleEntry) -> bool {
        let members = self
            .groups
            .entry((file_type, group.to_string()))
            .or_default();
        if members.iter().any(|m| m.path == entry.path) {
            return false;
        }
        members.push(entry);
        true
    }

    pub fn members(&self, file_type: FileType, group: &str) -> &[BundleEntry] {
        self.groups
            .get(&(file_type, group.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileType, &str, &[BundleEntry])> {
        self.groups
            .iter()
            .map(|((t, g), members)| (*t, g.as_str(), members.as_slice()))
    }
}

/// Normalize a marker value into a group name: `Main Scripts` → `main-scripts`.
pub fn group_name(value: &str) -> String {
    value.trim().replace(' ', "-").to_lowercase()
}

/// Site-absolute URL of a group's artifact.
pub fn bundle_url(bundle_dir: &str, file_type: FileType, group: &str) -> String {
    format!(
        "/{}/bundle-{group}.{}",
        bundle_dir.trim_matches('/'),
        file_type.extension()
    )
}

/// Phase A of bundling. See the [module docs](self).
pub struct BundleCollector {
    markers: Vec<String>,
    no_minify: Vec<String>,
    bundle_dir: String,
}

impl BundleCollector {
    pub fn new(markers: Vec<String>, no_minify: Vec<String>, bundle_dir: impl Into<String>) -> Self {
        Self {
            markers,
            no_minify,
            bundle_dir: bundle_dir.into(),
        }
    }

    fn reference(&self, file_type: FileType, group: &str) -> Option<NodeRef> {
        let url = dom::escape_attr(&bundle_url(&self.bundle_dir, file_type, group));
        match file_type {
            FileType::Css => dom::new_element(&format!("<link rel=\"stylesheet\" href=\"{url}\">"), "link"),
            _ => dom::new_element(&format!("<script src=\"{url}\">"), "script"),
        }
    }
}

/// A marked element accepted for bundling on the current page.
struct Member {
    node: NodeRef,
    file_type: FileType,
    group: String,
}

impl Transform for BundleCollector {
    fn name(&self) -> &'static str {
        "bundle"
    }

    fn accepts(&self, file: &FileRecord) -> bool {
        file.is_html()
    }

    fn apply(
        &mut self,
        file: &mut FileRecord,
        ctx: &mut BuildContext<'_>,
    ) -> Result<(), TransformError> {
        let doc = HtmlDoc::parse(&file.text);
        let marked = doc.elements_where(|el| {
            matches!(dom::tag_name(el), "link" | "script")
                && dom::first_attr_value(el, &self.markers).is_some()
        });
        if marked.is_empty() {
            return Ok(());
        }

        let mut members = Vec::new();
        for el in marked {
            let Some((_, value)) = dom::first_attr_value(&el, &self.markers) else {
                continue;
            };
            let (file_type, source_attr) = match dom::tag_name(&el) {
                "link" => (FileType::Css, "href"),
                _ => (FileType::Js, "src"),
            };
            let source = dom::attr(&el, source_attr).unwrap_or_default();
            let Some(path) = local_path(&source) else {
                ctx.reporter.skip(
                    self.name(),
                    &file.path,
                    format!("bundle '{value}': '{source}' is not a local path"),
                );
                continue;
            };

            let group = group_name(&value);
            ctx.bundles.register(
                file_type,
                &group,
                BundleEntry {
                    path,
                    minify: !dom::has_any_attr(&el, &self.no_minify),
                },
            );
            members.push(Member {
                node: el.as_node().clone(),
                file_type,
                group,
            });
        }

        for (i, member) in members.iter().enumerate() {
            let is_last = !members[i + 1..]
                .iter()
                .any(|m| m.file_type == member.file_type && m.group == member.group);
            if is_last && let Some(reference) = self.reference(member.file_type, &member.group) {
                member.node.insert_before(reference);
            }
        }
        for member in &members {
            member.node.detach();
        }

        if !members.is_empty() {
            file.text = doc.serialize();
        }
        Ok(())
    }
}

/// Site-absolute local path of a member reference, without query or fragment.
fn local_path(value: &str) -> Option<String> {
    let path = strip_preview_origin(value.trim());
    let path = path.split(['?', '#']).next().unwrap_or(path);
    (path.starts_with('/') && !path.starts_with("//") && path.len() > 1).then(|| path.to_string())
}

/// A written bundle file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleArtifact {
    pub file_type: FileType,
    pub group: String,
    pub path: PathBuf,
    pub members: usize,
}

/// Phase B of bundling. See the [module docs](self).
///
/// `minify` gates member minification as a whole (off in development builds);
/// members marked no-minify are never minified.
pub fn materialize(
    registry: &BundleRegistry,
    source_root: &Path,
    output_root: &Path,
    bundle_dir: &str,
    minify: bool,
    reporter: &Reporter,
) -> Result<Vec<BundleArtifact>, BundleError> {
    let mut artifacts = Vec::new();
    if registry.is_empty() {
        return Ok(artifacts);
    }

    let dir = output_root.join(bundle_dir.trim_matches('/'));
    fs::create_dir_all(&dir).map_err(|source| BundleError::Write {
        path: dir.clone(),
        source,
    })?;

    for (file_type, group, members) in registry.iter() {
        let parts: Vec<String> = members
            .par_iter()
            .map(|entry| -> Result<String, BundleError> {
                let path = source_root.join(entry.path.trim_start_matches('/'));
                let text = fs::read_to_string(&path).map_err(|source| BundleError::Read {
                    group: group.to_string(),
                    path,
                    source,
                })?;
                Ok(if minify && entry.minify {
                    minify::minify(file_type, &text)
                } else {
                    text
                })
            })
            .collect::<Result<_, _>>()?;

        let path = dir.join(format!("bundle-{group}.{}", file_type.extension()));
        fs::write(&path, concat(&parts)).map_err(|source| BundleError::Write {
            path: path.clone(),
            source,
        })?;

        reporter.emit(BuildEvent::BundleWritten {
            path: reporter.label(&path),
            members: members.len(),
        });
        artifacts.push(BundleArtifact {
            file_type,
            group: group.to_string(),
            path,
            members: members.len(),
        });
    }
    Ok(artifacts)
}

/// Join member texts, ending each with a newline so a trailing `//` comment
/// can't swallow the next member.
fn concat(parts: &[String]) -> String {
    let mut out = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for part in parts {
        out.push_str(part);
        if !part.is_empty() && !part.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::transform::tests::Harness;
    use tempfile::TempDir;

    fn collector() -> BundleCollector {
        let config = SiteConfig::default();
        BundleCollector::new(config.markers.bundle, config.markers.no_minify, config.bundle.dir)
    }

    fn entry(path: &str) -> BundleEntry {
        BundleEntry {
            path: path.to_string(),
            minify: true,
        }
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn group_names_are_normalized() {
        assert_eq!(group_name("Main Scripts"), "main-scripts");
        assert_eq!(group_name(" vendor "), "vendor");
    }

    #[test]
    fn registry_dedups_and_keeps_first_seen_order() {
        let mut registry = BundleRegistry::new();
        assert!(registry.register(FileType::Js, "vendor", entry("/a.js")));
        assert!(registry.register(FileType::Js, "vendor", entry("/b.js")));
        assert!(!registry.register(FileType::Js, "vendor", entry("/b.js")));
        assert!(registry.register(FileType::Js, "vendor", entry("/c.js")));

        let paths: Vec<&str> = registry
            .members(FileType::Js, "vendor")
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(paths, vec!["/a.js", "/b.js", "/c.js"]);
    }

    #[test]
    fn types_with_same_group_are_separate() {
        let mut registry = BundleRegistry::new();
        registry.register(FileType::Js, "main", entry("/a.js"));
        registry.register(FileType::Css, "main", entry("/a.css"));
        assert_eq!(registry.members(FileType::Js, "main").len(), 1);
        assert_eq!(registry.members(FileType::Css, "main").len(), 1);
        assert!(registry.members(FileType::Css, "other").is_empty());
    }

    #[test]
    fn reference_goes_before_last_instance() {
        let mut harness = Harness::new(Path::new("/out"));
        let mut file = FileRecord::new(
            "/out/index.html",
            "<p>top</p><script src=\"/js/a.js\" bundle=\"main\"></script><p>mid</p><script src=\"/js/b.js\" data-bundle=\"Main\"></script><p>end</p>",
        );

        harness.run(&mut collector(), &mut file).unwrap();
        assert_eq!(
            file.text,
            "<p>top</p><p>mid</p><script src=\"/assets/bundle/bundle-main.js\"></script><p>end</p>"
        );
        let paths: Vec<&str> = harness
            .bundles
            .members(FileType::Js, "main")
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(paths, vec!["/js/a.js", "/js/b.js"]);
    }

    #[test]
    fn css_groups_get_stylesheet_links() {
        let mut harness = Harness::new(Path::new("/out"));
        let mut file = FileRecord::new(
            "/out/index.html",
            "<link rel=\"stylesheet\" href=\"/css/a.css\" bundle=\"site\"><link rel=\"stylesheet\" href=\"/css/b.css\" bundle=\"site\" no-minify>",
        );

        harness.run(&mut collector(), &mut file).unwrap();
        assert!(file.text.contains("bundle-site.css"));
        assert!(file.text.contains("rel=\"stylesheet\""));
        assert!(!file.text.contains("/css/a.css"));
        let members = harness.bundles.members(FileType::Css, "site");
        assert!(members[0].minify);
        assert!(!members[1].minify);
    }

    #[test]
    fn pages_sharing_a_group_do_not_duplicate_members() {
        let mut harness = Harness::new(Path::new("/out"));
        let pages = [
            ("/out/p1.html", "<script src=\"/a.js\" bundle=\"vendor\"></script><script src=\"/b.js\" bundle=\"vendor\"></script>"),
            ("/out/p2.html", "<script src=\"/b.js\" bundle=\"vendor\"></script><script src=\"/c.js\" bundle=\"vendor\"></script>"),
        ];
        for (path, text) in pages {
            let mut file = FileRecord::new(path, text);
            harness.run(&mut collector(), &mut file).unwrap();
        }
        let paths: Vec<&str> = harness
            .bundles
            .members(FileType::Js, "vendor")
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(paths, vec!["/a.js", "/b.js", "/c.js"]);
    }

    #[test]
    fn external_member_is_skipped_and_kept() {
        let mut harness = Harness::new(Path::new("/out"));
        let original = "<script src=\"https://cdn.example.com/x.js\" bundle=\"main\"></script>";
        let mut file = FileRecord::new("/out/index.html", original);

        harness.run(&mut collector(), &mut file).unwrap();
        assert_eq!(file.text, original);
        assert!(harness.bundles.is_empty());
        assert_eq!(harness.reporter.skipped(), 1);
    }

    #[test]
    fn materialize_concatenates_in_registration_order() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.js", "var a = 1;");
        write(src.path(), "b.js", "var b = a;");
        write(src.path(), "c.js", "var c = b;");

        let mut registry = BundleRegistry::new();
        for path in ["/a.js", "/b.js", "/c.js", "/b.js"] {
            registry.register(
                FileType::Js,
                "vendor",
                BundleEntry {
                    path: path.to_string(),
                    minify: false,
                },
            );
        }

        let artifacts = materialize(
            &registry,
            src.path(),
            out.path(),
            "assets/bundle",
            true,
            &Reporter::silent(),
        )
        .unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].members, 3);

        let text = fs::read_to_string(out.path().join("assets/bundle/bundle-vendor.js")).unwrap();
        assert_eq!(text, "var a = 1;\nvar b = a;\nvar c = b;\n");
    }

    #[test]
    fn materialize_minifies_flagged_members_only() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "css/a.css", "a {\n  color: red;\n}\n");
        write(src.path(), "css/b.css", "b {\n  color: blue;\n}\n");

        let mut registry = BundleRegistry::new();
        registry.register(FileType::Css, "site", entry("/css/a.css"));
        registry.register(
            FileType::Css,
            "site",
            BundleEntry {
                path: "/css/b.css".to_string(),
                minify: false,
            },
        );

        materialize(&registry, src.path(), out.path(), "assets/bundle", true, &Reporter::silent())
            .unwrap();
        let text = fs::read_to_string(out.path().join("assets/bundle/bundle-site.css")).unwrap();
        assert!(text.starts_with(&format!("{}\n", minify::minify_css("a {\n  color: red;\n}\n"))));
        assert!(text.ends_with("b {\n  color: blue;\n}\n"));
    }

    #[test]
    fn materialize_keeps_module_syntax_when_minifying() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(
            src.path(),
            "js/store.js",
            "// state\nexport class Store {\n  get size() { return this.items.length }\n}\n",
        );
        write(
            src.path(),
            "js/main.js",
            "export function start() {\n  return new Store()\n}\n",
        );

        let mut registry = BundleRegistry::new();
        registry.register(FileType::Js, "app", entry("/js/store.js"));
        registry.register(FileType::Js, "app", entry("/js/main.js"));

        materialize(&registry, src.path(), out.path(), "assets/bundle", true, &Reporter::silent())
            .unwrap();
        let text = fs::read_to_string(out.path().join("assets/bundle/bundle-app.js")).unwrap();
        assert_eq!(
            text,
            "export class Store{get size(){return this.items.length}}\n\
             export function start(){return new Store()}\n"
        );
    }

    #[test]
    fn materialize_missing_member_is_fatal() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let mut registry = BundleRegistry::new();
        registry.register(FileType::Js, "main", entry("/missing.js"));

        let result = materialize(&registry, src.path(), out.path(), "assets/bundle", true, &Reporter::silent());
        match result {
            Err(BundleError::Read { group, .. }) => assert_eq!(group, "main"),
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn empty_registry_writes_nothing() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let artifacts = materialize(
            &BundleRegistry::new(),
            src.path(),
            out.path(),
            "assets/bundle",
            true,
            &Reporter::silent(),
        )
        .unwrap();
        assert!(artifacts.is_empty());
        assert!(!out.path().join("assets").exists());
    }
}
