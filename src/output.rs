//! CLI output formatting for builds and checks.
//!
//! # Information-First Display
//!
//! Every line leads with the file it is about, relative to the output root.
//! Transform details (which include went in, which link was rewritten) are
//! indented beneath the build progress so a build log reads as an inventory
//! of what changed in each file.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Staged src → dist (14 files)
//! Processing 9 files
//!     index.html ← /includes/nav (read)
//!     index.html ← /includes/footer (read)
//!     index.html: www.example.com → http://www.example.com
//! index.html
//!     about.html ← /includes/nav (cached)
//!     Skipped [include] about.html: /includes/missing (No such file or directory)
//! about.html
//! Bundle assets/bundle/bundle-main.js (3 files)
//! Moved about.html → about/index.html
//!
//! Bundles
//!     assets/bundle/bundle-main.css (2 files)
//!     assets/bundle/bundle-main.js (3 files)
//! Includes: 3 cached, 2 read (5 total)
//! Built 9 files into dist, 2 bundles, 1 skipped
//! ```
//!
//! ## Check
//!
//! ```text
//! Config
//!     Source: src
//!     Output: dist
//!     Mode: production
//! Stages
//!     placeholder → include → inline → protocol → active-links → bundle → minify
//! Files
//!     includes/footer.html
//!     index.html
//!
//! 2 files would be processed
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::config::SiteConfig;
use crate::event::BuildEvent;
use crate::paths::relative_slash_path;
use crate::pipeline::BuildReport;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Build progress
// ============================================================================

/// Format a single build event as display lines.
///
/// Per-file details are indented one level and arrive before the
/// `FileWritten` line of the file they belong to.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Staged {
            source,
            output,
            files,
        } => vec![format!(
            "Staged {} \u{2192} {} ({})",
            source.display(),
            output.display(),
            plural(*files, "file", "files")
        )],
        BuildEvent::Scanned { files } => {
            vec![format!("Processing {}", plural(*files, "file", "files"))]
        }
        BuildEvent::IncludeInserted {
            file,
            target,
            cached,
        } => {
            let status = if *cached { "cached" } else { "read" };
            vec![format!("{}{file} \u{2190} {target} ({status})", indent(1))]
        }
        BuildEvent::Inlined { file, target } => {
            vec![format!("{}{file} \u{2190} {target} (inlined)", indent(1))]
        }
        BuildEvent::LinkRewritten { file, from, to } => {
            vec![format!("{}{file}: {from} \u{2192} {to}", indent(1))]
        }
        BuildEvent::Skipped {
            stage,
            file,
            detail,
        } => vec![format!("{}Skipped [{stage}] {file}: {detail}", indent(1))],
        BuildEvent::FileWritten { file } => vec![file.clone()],
        BuildEvent::BundleWritten { path, members } => vec![format!(
            "Bundle {path} ({})",
            plural(*members, "file", "files")
        )],
        BuildEvent::PageMoved { from, to } => vec![format!("Moved {from} \u{2192} {to}")],
    }
}

/// Format the closing summary of a finished build.
pub fn format_build_summary(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![String::new()];

    if !report.bundles.is_empty() {
        lines.push("Bundles".to_string());
        for bundle in &report.bundles {
            lines.push(format!(
                "{}{} ({})",
                indent(1),
                relative_slash_path(&report.output, &bundle.path),
                plural(bundle.members, "file", "files")
            ));
        }
    }

    if report.includes.total() > 0 {
        lines.push(format!("Includes: {}", report.includes));
    }

    let mut tail = format!(
        "Built {} into {}",
        plural(report.files.len(), "file", "files"),
        report.output.display()
    );
    if !report.bundles.is_empty() {
        tail.push_str(&format!(
            ", {}",
            plural(report.bundles.len(), "bundle", "bundles")
        ));
    }
    if report.skipped > 0 {
        tail.push_str(&format!(", {} skipped", report.skipped));
    }
    if report.development {
        tail.push_str(" (development)");
    }
    lines.push(tail);
    lines
}

/// Print the build summary to stdout.
pub fn print_build_summary(report: &BuildReport) {
    for line in format_build_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the `check` command output: resolved config, stage order and the
/// files a build would process (relative to the source root).
pub fn format_check_output(config: &SiteConfig, stages: &[&str], files: &[String]) -> Vec<String> {
    let mode = if config.development {
        "development"
    } else {
        "production"
    };
    let mut lines = vec![
        "Config".to_string(),
        format!("{}Source: {}", indent(1), config.source.display()),
        format!("{}Output: {}", indent(1), config.output.display()),
        format!("{}Mode: {mode}", indent(1)),
    ];
    if config.includes.strict {
        lines.push(format!("{}Includes: strict", indent(1)));
    }

    lines.push("Stages".to_string());
    lines.push(format!("{}{}", indent(1), stages.join(" \u{2192} ")));

    if !files.is_empty() {
        lines.push("Files".to_string());
        lines.extend(files.iter().map(|f| format!("{}{f}", indent(1))));
    }

    lines.push(String::new());
    lines.push(format!(
        "{} would be processed",
        plural(files.len(), "file", "files")
    ));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(config: &SiteConfig, stages: &[&str], files: &[String]) {
    for line in format_check_output(config, stages, files) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleArtifact;
    use crate::cache::CacheStats;
    use crate::types::FileType;
    use std::path::PathBuf;

    fn report() -> BuildReport {
        BuildReport {
            output: PathBuf::from("dist"),
            development: false,
            files: vec!["index.html".to_string(), "about/index.html".to_string()],
            bundles: vec![],
            includes: CacheStats::default(),
            skipped: 0,
        }
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "file", "files"), "1 file");
        assert_eq!(plural(0, "file", "files"), "0 files");
        assert_eq!(plural(3, "file", "files"), "3 files");
    }

    #[test]
    fn staged_event() {
        let lines = format_build_event(&BuildEvent::Staged {
            source: PathBuf::from("src"),
            output: PathBuf::from("dist"),
            files: 14,
        });
        assert_eq!(lines, vec!["Staged src \u{2192} dist (14 files)"]);
    }

    #[test]
    fn include_event_shows_cache_status() {
        let read = format_build_event(&BuildEvent::IncludeInserted {
            file: "index.html".to_string(),
            target: "/includes/nav".to_string(),
            cached: false,
        });
        let cached = format_build_event(&BuildEvent::IncludeInserted {
            file: "about.html".to_string(),
            target: "/includes/nav".to_string(),
            cached: true,
        });
        assert_eq!(read, vec!["    index.html \u{2190} /includes/nav (read)"]);
        assert_eq!(cached, vec!["    about.html \u{2190} /includes/nav (cached)"]);
    }

    #[test]
    fn skipped_event_names_stage_file_and_detail() {
        let lines = format_build_event(&BuildEvent::Skipped {
            stage: "include",
            file: "about.html".to_string(),
            detail: "/includes/missing".to_string(),
        });
        assert_eq!(
            lines,
            vec!["    Skipped [include] about.html: /includes/missing"]
        );
    }

    #[test]
    fn file_written_is_unindented() {
        let lines = format_build_event(&BuildEvent::FileWritten {
            file: "docs/a.html".to_string(),
        });
        assert_eq!(lines, vec!["docs/a.html"]);
    }

    #[test]
    fn bundle_and_move_events() {
        assert_eq!(
            format_build_event(&BuildEvent::BundleWritten {
                path: "assets/bundle/bundle-main.js".to_string(),
                members: 1,
            }),
            vec!["Bundle assets/bundle/bundle-main.js (1 file)"]
        );
        assert_eq!(
            format_build_event(&BuildEvent::PageMoved {
                from: "about.html".to_string(),
                to: "about/index.html".to_string(),
            }),
            vec!["Moved about.html \u{2192} about/index.html"]
        );
    }

    #[test]
    fn summary_minimal() {
        let lines = format_build_summary(&report());
        assert_eq!(lines, vec!["", "Built 2 files into dist"]);
    }

    #[test]
    fn summary_with_bundles_includes_and_skips() {
        let mut report = report();
        report.bundles.push(BundleArtifact {
            file_type: FileType::Js,
            group: "main".to_string(),
            path: PathBuf::from("dist/assets/bundle/bundle-main.js"),
            members: 3,
        });
        report.includes = CacheStats { hits: 3, reads: 2 };
        report.skipped = 1;
        report.development = true;

        let lines = format_build_summary(&report);
        assert_eq!(
            lines,
            vec![
                "",
                "Bundles",
                "    assets/bundle/bundle-main.js (3 files)",
                "Includes: 3 cached, 2 read (5 total)",
                "Built 2 files into dist, 1 bundle, 1 skipped (development)",
            ]
        );
    }

    #[test]
    fn check_output_lists_stages_and_files() {
        let config = SiteConfig::default();
        let files = vec!["includes/footer.html".to_string(), "index.html".to_string()];
        let lines = format_check_output(&config, &["include", "minify"], &files);
        assert_eq!(
            lines,
            vec![
                "Config",
                "    Source: src",
                "    Output: dist",
                "    Mode: production",
                "Stages",
                "    include \u{2192} minify",
                "Files",
                "    includes/footer.html",
                "    index.html",
                "",
                "2 files would be processed",
            ]
        );
    }

    #[test]
    fn check_output_marks_strict_and_development() {
        let mut config = SiteConfig::default();
        config.development = true;
        config.includes.strict = true;
        let lines = format_check_output(&config, &[], &[]);
        assert!(lines.contains(&"    Mode: development".to_string()));
        assert!(lines.contains(&"    Includes: strict".to_string()));
        assert_eq!(lines.last().unwrap(), "0 files would be processed");
    }
}
