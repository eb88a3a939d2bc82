//! Path and URL helpers shared by the transforms.
//!
//! Everything here is a pure function over strings or paths so the link
//! rules can be unit tested without a DOM or a filesystem.
//!
//! ## Page Keys
//!
//! A page key is the name a page is known by in navigation. Both the current
//! file and every `<a href>` are reduced to a key before comparison:
//! - `docs/guide/intro.html` → `"intro"`
//! - `docs/guide/intro/index.html` → `"intro"`
//! - `/docs/guide/intro` → `"intro"`
//! - `index.html`, `/`, `/index.html` → `"/"`

use std::path::{Component, Path, PathBuf};

/// Origin the local preview server serves the output directory from.
/// Values rendered through it carry `localhost` as a path segment.
pub const PREVIEW_ORIGIN: &str = "https://localhost";

/// `path` relative to `root` with `/` separators. Paths outside `root` are
/// returned whole.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Drop a `?query` and `#fragment` from a URL path.
fn strip_query(value: &str) -> &str {
    let end = value.find(['?', '#']).unwrap_or(value.len());
    &value[..end]
}

/// Everything before the first `.` of a filename.
fn stem(segment: &str) -> &str {
    segment.split('.').next().unwrap_or(segment)
}

fn segments(value: &str) -> Vec<&str> {
    strip_query(value).split('/').filter(|s| !s.is_empty()).collect()
}

/// Reduce a file path or link target to its page key.
///
/// The leaf's stem is the key, except for `index` leaves, which take their
/// parent directory's name. An index at the top level is `"/"`.
pub fn page_key(value: &str) -> String {
    let parts = segments(value);
    let Some(last) = parts.last() else {
        return "/".to_string();
    };
    let name = stem(last);
    if name != "index" {
        return name.to_string();
    }
    match parts.len().checked_sub(2).map(|i| parts[i]) {
        Some(parent) => parent.to_string(),
        None => "/".to_string(),
    }
}

/// The section chain a page lives in, ending with the page's own key.
///
/// `docs/guide/intro/index.html` and `docs/guide/intro.html` both give
/// `["docs", "guide", "intro"]`. The root `index.html` gives `[]`.
pub fn page_sections(rel_path: &str) -> Vec<String> {
    let mut parts: Vec<String> = segments(rel_path).iter().map(|s| s.to_string()).collect();
    if let Some(last) = parts.pop() {
        let name = stem(&last);
        if name != "index" {
            parts.push(name.to_string());
        }
    }
    parts
}

/// True when `value` starts with a URL scheme (`https:`, `mailto:`, ...).
pub fn has_scheme(value: &str) -> bool {
    let Some(colon) = value.find(':') else {
        return false;
    };
    let scheme = &value[..colon];
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resolve an attribute value the way the preview server's browser would.
///
/// - `https://cdn.example.com/x.js` → unchanged
/// - `/css/site.css` → `https://localhost/css/site.css`
/// - `www.example.com` → `https://localhost/www.example.com`
pub fn preview_url(value: &str) -> String {
    if has_scheme(value) || value.starts_with("//") {
        value.to_string()
    } else if value.starts_with('/') {
        format!("{PREVIEW_ORIGIN}{value}")
    } else {
        format!("{PREVIEW_ORIGIN}/{value}")
    }
}

/// Strip a `://localhost[:port]` origin from a value rendered by the preview
/// server, leaving the site-absolute path.
///
/// - `https://localhost/css/a.css` → `/css/a.css`
/// - `http://localhost:3000/js/a.js` → `/js/a.js`
/// - `/css/a.css` → `/css/a.css`
pub fn strip_preview_origin(value: &str) -> &str {
    const HOST: &str = "://localhost";
    let Some(pos) = value.find(HOST) else {
        return value;
    };
    let rest = &value[pos + HOST.len()..];
    match rest.strip_prefix(':') {
        Some(port) => port.trim_start_matches(|c: char| c.is_ascii_digit()),
        None => rest,
    }
}

/// Where an include marker's value points on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeTarget {
    /// Normalized path under the configured page layout. Also the cache key.
    pub primary: PathBuf,
    /// Flat `x.html` alternative, tried when `primary` (the `x/index.html`
    /// form) doesn't exist because pages are only moved at the end of a build.
    pub fallback: Option<PathBuf>,
}

/// Resolve an include value against the output root.
///
/// With `to_directory` enabled:
/// - `/includes/footer` → `includes/footer/index.html` (fallback `includes/footer.html`)
/// - `/includes/footer.html` → `includes/footer/index.html` (fallback `includes/footer.html`)
///
/// With `to_directory` disabled:
/// - `/includes/footer` → `includes/footer.html`
/// - `/includes/footer.html` → unchanged
///
/// Values with any other extension (`/img/logo.svg`) are used as written.
pub fn resolve_include(output_root: &Path, value: &str, to_directory: bool) -> IncludeTarget {
    let value = strip_query(value).trim_start_matches('/');
    let path = output_root.join(value);
    let leaf = value.rsplit('/').next().unwrap_or(value);

    let html_base = if let Some(base) = value.strip_suffix(".html") {
        Some(base)
    } else if !leaf.contains('.') {
        Some(value)
    } else {
        None
    };

    match (html_base, to_directory) {
        (Some(base), true) => IncludeTarget {
            primary: output_root.join(base).join("index.html"),
            fallback: Some(output_root.join(format!("{base}.html"))),
        },
        (Some(base), false) => IncludeTarget {
            primary: output_root.join(format!("{base}.html")),
            fallback: None,
        },
        (None, _) => IncludeTarget {
            primary: path,
            fallback: None,
        },
    }
}
