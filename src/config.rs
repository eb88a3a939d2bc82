//! Build configuration.
//!
//! Handles loading, validating, and merging `pagesmith.toml`. Stock defaults
//! are serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `pagesmith.toml` lives next to the source directory (the project root).
//! Pass `--config` to use another path. A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! source = "src"            # Source tree, copied verbatim into `output`
//! output = "dist"           # Distributable directory (recreated per build)
//! development = false       # Skip inlining and minification
//!
//! [pages]
//! to_directory = true       # about.html -> about/index.html
//! exclude = ["^includes/", "(^|/)404\\.html$"]
//!
//! [paths]
//! include = []              # Regexes force-allowed into the file loop
//! exclude = []              # Regexes kept out of the file loop
//!
//! [markers]
//! include = ["include", "data-include"]
//! inline = ["inline", "data-inline"]
//! bundle = ["bundle", "data-bundle"]
//! no_minify = ["no-minify", "data-no-minify"]
//!
//! [includes]
//! dir = "includes"
//! strict = false            # Missing include aborts the build when true
//!
//! [active_links]
//! style = "class"           # "class" or "attribute"
//! active = "active"
//! parent_active = "parent-active"
//!
//! [links]
//! protocol_targets = ["www", "cdn"]
//!
//! [bundle]
//! dir = "assets/bundle"
//!
//! [minify]
//! html = true
//! css = true
//! js = true
//!
//! [data]
//! year = "2026"             # Replaces ${year} in HTML
//! ```
//!
//! ## Validation
//!
//! Unknown keys are rejected. Marker attribute names must be non-empty and
//! made of ASCII letters, digits, `-`, `_` or `:`. Every path pattern must
//! compile as a regex. `source` and `output` must differ.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config filename, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "pagesmith.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid path pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site build configuration loaded from `pagesmith.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Source tree that gets staged into `output`.
    pub source: PathBuf,
    /// Distributable output directory.
    pub output: PathBuf,
    /// Development builds skip inlining and minification.
    pub development: bool,
    pub pages: PagesConfig,
    pub paths: PathsConfig,
    pub markers: MarkerConfig,
    pub includes: IncludesConfig,
    pub active_links: ActiveLinkConfig,
    pub links: LinksConfig,
    pub bundle: BundleConfig,
    pub minify: MinifyConfig,
    /// Values substituted for `${key}` placeholders in HTML.
    pub data: BTreeMap<String, String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src"),
            output: PathBuf::from("dist"),
            development: false,
            pages: PagesConfig::default(),
            paths: PathsConfig::default(),
            markers: MarkerConfig::default(),
            includes: IncludesConfig::default(),
            active_links: ActiveLinkConfig::default(),
            links: LinksConfig::default(),
            bundle: BundleConfig::default(),
            minify: MinifyConfig::default(),
            data: BTreeMap::new(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source == self.output {
            return Err(ConfigError::Validation(
                "source and output must be different directories".into(),
            ));
        }
        for (key, names) in [
            ("markers.include", &self.markers.include),
            ("markers.inline", &self.markers.inline),
            ("markers.bundle", &self.markers.bundle),
            ("markers.no_minify", &self.markers.no_minify),
        ] {
            if names.is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
            if let Some(bad) = names.iter().find(|n| !is_attribute_name(n)) {
                return Err(ConfigError::Validation(format!(
                    "{key} contains invalid attribute name '{bad}'"
                )));
            }
        }
        for name in [&self.active_links.active, &self.active_links.parent_active] {
            if !is_attribute_name(name) {
                return Err(ConfigError::Validation(format!(
                    "active_links marker '{name}' must be a valid class/attribute name"
                )));
            }
        }
        if Path::new(&self.bundle.dir).is_absolute() {
            return Err(ConfigError::Validation(
                "bundle.dir must be relative to the output directory".into(),
            ));
        }
        if self.includes.dir.is_empty() || self.includes.dir.contains('/') {
            return Err(ConfigError::Validation(
                "includes.dir must be a single directory name".into(),
            ));
        }
        compile_patterns(&self.paths.include)?;
        compile_patterns(&self.paths.exclude)?;
        compile_patterns(&self.pages.exclude)?;
        Ok(())
    }
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

/// Compile a list of user regexes, naming the first one that fails.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| ConfigError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Page-to-directory conversion (`about.html` → `about/index.html`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagesConfig {
    /// Convert flat pages into directory form after the build.
    pub to_directory: bool,
    /// Regexes (matched against output-relative paths) that are never converted.
    pub exclude: Vec<String>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            to_directory: true,
            exclude: vec!["^includes/".to_string(), r"(^|/)404\.html$".to_string()],
        }
    }
}

/// Which staged files enter the file loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Force-allowed regexes: matched files are processed whatever their
    /// extension, even when a deny pattern also matches.
    pub include: Vec<String>,
    /// Deny regexes, added to the built-in vendor exclusion.
    pub exclude: Vec<String>,
}

/// HTML attribute names that drive the transforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerConfig {
    pub include: Vec<String>,
    pub inline: Vec<String>,
    pub bundle: Vec<String>,
    pub no_minify: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        let pair = |name: &str| vec![name.to_string(), format!("data-{name}")];
        Self {
            include: pair("include"),
            inline: pair("inline"),
            bundle: pair("bundle"),
            no_minify: pair("no-minify"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IncludesConfig {
    /// Directory (directly under the output root) holding include fragments.
    /// Files below it are processed before everything else.
    pub dir: String,
    /// Abort the build when an include target cannot be read.
    pub strict: bool,
}

impl Default for IncludesConfig {
    fn default() -> Self {
        Self {
            dir: "includes".to_string(),
            strict: false,
        }
    }
}

/// How active navigation links are marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    /// Add a CSS class.
    Class,
    /// Add an empty `data-<name>` attribute.
    Attribute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActiveLinkConfig {
    pub style: MarkerStyle,
    /// Marker for links to the current page.
    pub active: String,
    /// Marker for links to an ancestor section of the current page.
    pub parent_active: String,
}

impl Default for ActiveLinkConfig {
    fn default() -> Self {
        Self {
            style: MarkerStyle::Class,
            active: "active".to_string(),
            parent_active: "parent-active".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinksConfig {
    /// Leading host labels (`www` in `www.example.com`) that mark a
    /// protocol-less value as an external domain.
    pub protocol_targets: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            protocol_targets: vec!["www".to_string(), "cdn".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Output-relative directory for `bundle-<group>.<type>` artifacts.
    pub dir: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            dir: "assets/bundle".to_string(),
        }
    }
}

/// Per-type minification switches. Development mode overrides all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinifyConfig {
    pub html: bool,
    pub css: bool,
    pub js: bool,
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self {
            html: true,
            css: true,
            js: true,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value. `Ok(None)` when it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a `pagesmith.toml` path, falling back to stock defaults.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `pagesmith.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pagesmith configuration
# ======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# Source tree. Copied verbatim into `output` at the start of every build.
source = "src"

# Distributable directory. Removed and recreated by every build.
output = "dist"

# Development builds skip inlining and minification.
# `pagesmith build --dev` sets this for a single run.
development = false

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
[pages]
# Convert about.html into about/index.html after all content is final.
# When disabled, links must spell out the .html extension.
to_directory = true

# Regexes matched against output-relative paths that are never converted.
exclude = ["^includes/", "(^|/)404\\.html$"]

# ---------------------------------------------------------------------------
# File selection
# ---------------------------------------------------------------------------
[paths]
# Only .html, .css and .js files are transformed. Regexes listed here are
# processed regardless of extension and win over `exclude`.
include = []

# Regexes kept out of the file loop. assets/scripts/vendor is always excluded.
exclude = []

# ---------------------------------------------------------------------------
# Marker attributes
# ---------------------------------------------------------------------------
[markers]
# <div include="/includes/footer"></div>
include = ["include", "data-include"]
# <link rel="stylesheet" href="/css/critical.css" inline>
inline = ["inline", "data-inline"]
# <script src="/js/a.js" bundle="main"></script>
bundle = ["bundle", "data-bundle"]
# Bundle the file without minifying it first (already-minified vendor code)
no_minify = ["no-minify", "data-no-minify"]

# ---------------------------------------------------------------------------
# Includes
# ---------------------------------------------------------------------------
[includes]
# Fragment directory directly under the output root. Processed first.
dir = "includes"
# Abort the build when an include target is missing (default: warn and skip)
strict = false

# ---------------------------------------------------------------------------
# Active navigation links
# ---------------------------------------------------------------------------
[active_links]
# "class" adds class="active"; "attribute" adds data-active
style = "class"
active = "active"
parent_active = "parent-active"

# ---------------------------------------------------------------------------
# External links written without a protocol (href="www.example.com")
# ---------------------------------------------------------------------------
[links]
protocol_targets = ["www", "cdn"]

# ---------------------------------------------------------------------------
# Bundles
# ---------------------------------------------------------------------------
[bundle]
# Output-relative directory for bundle-<group>.css / bundle-<group>.js
dir = "assets/bundle"

# ---------------------------------------------------------------------------
# Minification (ignored in development builds)
# ---------------------------------------------------------------------------
[minify]
html = true
css = true
js = true

# ---------------------------------------------------------------------------
# Placeholder data: ${key} in HTML is replaced with the value
# ---------------------------------------------------------------------------
[data]
# site_name = "My Site"
"##
}
