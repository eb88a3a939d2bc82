//! Select the staged files that enter the transform loop.
//!
//! Scanning runs against the output directory after staging, so every path
//! rule matches output-relative paths with `/` separators
//! (`assets/scripts/vendor/jquery.js`).
//!
//! ## Selection Rules
//!
//! A file is selected when either:
//! - it matches a force-allow pattern (`[paths] include`), whatever its
//!   extension and even if a deny pattern also matches, or
//! - its extension is `html`, `css` or `js` and no deny pattern matches.
//!
//! Deny patterns are the built-in [`DEFAULT_DENY`] plus `[paths] exclude`.
//!
//! ## Ordering
//!
//! Files under the includes directory come first so fragments are fully
//! transformed before any page reads them. Within each group the order is the
//! directory walk's, sorted by file name, so builds are reproducible.

use crate::config::{self, ConfigError, SiteConfig};
use crate::paths::relative_slash_path;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Deny patterns applied to every build. Vendored scripts are shipped as-is.
pub const DEFAULT_DENY: &[&str] = &["^assets/scripts/vendor/"];

const ALLOWED_EXTENSIONS: &[&str] = &["html", "css", "js"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Scan root not found: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Compiled allow/deny rules.
#[derive(Debug, Clone)]
pub struct PathRules {
    force_allow: Vec<Regex>,
    deny: Vec<Regex>,
    includes_dir: String,
}

impl PathRules {
    pub fn new(force_allow: Vec<Regex>, deny: Vec<Regex>, includes_dir: impl Into<String>) -> Self {
        Self {
            force_allow,
            deny,
            includes_dir: includes_dir.into(),
        }
    }

    /// Rules from `[paths]` and `[includes]`, with the default deny list.
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        let defaults: Vec<String> = DEFAULT_DENY.iter().map(|p| p.to_string()).collect();
        let mut deny = config::compile_patterns(&defaults)?;
        deny.extend(config::compile_patterns(&config.paths.exclude)?);
        Ok(Self::new(
            config::compile_patterns(&config.paths.include)?,
            deny,
            config.includes.dir.clone(),
        ))
    }

    /// Whether the file at output-relative `rel` is processed.
    pub fn accepts(&self, rel: &str) -> bool {
        if self.force_allow.iter().any(|re| re.is_match(rel)) {
            return true;
        }
        if self.deny.iter().any(|re| re.is_match(rel)) {
            return false;
        }
        Path::new(rel)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
    }

    fn is_include(&self, rel: &str) -> bool {
        rel.strip_prefix(self.includes_dir.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Walk `root` and return the files to process, includes first.
pub fn scan(root: &Path, rules: &PathRules) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }

    let mut files: Vec<(bool, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative_slash_path(root, entry.path());
        if rules.accepts(&rel) {
            files.push((!rules.is_include(&rel), entry.into_path()));
        }
    }

    // Stable: keeps walk order inside each group.
    files.sort_by_key(|(is_page, _)| *is_page);
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn rel_list(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files.iter().map(|f| relative_slash_path(root, f)).collect()
    }

    fn default_rules() -> PathRules {
        PathRules::from_config(&SiteConfig::default()).unwrap()
    }

    #[test]
    fn selects_html_css_js_only() {
        let tmp = TempDir::new().unwrap();
        for rel in ["index.html", "css/site.css", "js/app.js", "img/logo.png", "robots.txt"] {
            touch(tmp.path(), rel);
        }
        let files = scan(tmp.path(), &default_rules()).unwrap();
        assert_eq!(
            rel_list(tmp.path(), &files),
            vec!["css/site.css", "index.html", "js/app.js"]
        );
    }

    #[test]
    fn includes_directory_sorts_first() {
        let tmp = TempDir::new().unwrap();
        for rel in ["about.html", "index.html", "includes/nav.html", "includes/footer.html"] {
            touch(tmp.path(), rel);
        }
        let files = scan(tmp.path(), &default_rules()).unwrap();
        assert_eq!(
            rel_list(tmp.path(), &files),
            vec![
                "includes/footer.html",
                "includes/nav.html",
                "about.html",
                "index.html"
            ]
        );
    }

    #[test]
    fn vendor_scripts_are_denied_by_default() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "assets/scripts/vendor/lib.js");
        touch(tmp.path(), "assets/scripts/app.js");
        let files = scan(tmp.path(), &default_rules()).unwrap();
        assert_eq!(rel_list(tmp.path(), &files), vec!["assets/scripts/app.js"]);
    }

    #[test]
    fn force_allow_beats_deny_and_extension() {
        let mut config = SiteConfig::default();
        config.paths.include = vec![
            "^assets/scripts/vendor/keep\\.js$".to_string(),
            "\\.svg$".to_string(),
        ];
        let rules = PathRules::from_config(&config).unwrap();
        assert!(rules.accepts("assets/scripts/vendor/keep.js"));
        assert!(!rules.accepts("assets/scripts/vendor/other.js"));
        assert!(rules.accepts("img/icon.svg"));
    }

    #[test]
    fn user_deny_patterns_apply() {
        let mut config = SiteConfig::default();
        config.paths.exclude = vec!["^drafts/".to_string()];
        let rules = PathRules::from_config(&config).unwrap();
        assert!(!rules.accepts("drafts/post.html"));
        assert!(rules.accepts("posts/drafts.html"));
    }

    #[test]
    fn includes_prefix_needs_directory_boundary() {
        let rules = default_rules();
        assert!(rules.is_include("includes/nav.html"));
        assert!(!rules.is_include("includes-old/nav.html"));
        assert!(!rules.is_include("docs/includes/nav.html"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = scan(&tmp.path().join("nope"), &default_rules());
        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }
}
