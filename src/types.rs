//! Shared types used across the file loop.
//!
//! A [`FileRecord`] is the unit every transform operates on: it is opened from
//! the staged output tree, passed by `&mut` through the whole chain, and
//! written back exactly once.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File types the transform chain knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Html,
    Css,
    Js,
}

impl FileType {
    /// Map a lowercase extension (`"html"`, `"css"`, `"js"`) to a file type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "html" => Some(Self::Html),
            "css" => Some(Self::Css),
            "js" => Some(Self::Js),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One file being transformed.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Location in the staged output tree.
    pub path: PathBuf,
    /// Filename without extension (`about` for `about.html`).
    pub name: String,
    /// Lowercase extension, empty when the file has none.
    pub extension: String,
    /// Current content. The only field transforms mutate.
    pub text: String,
}

impl FileRecord {
    /// Build a record from a path and in-memory text.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Self {
            path,
            name,
            extension,
            text: text.into(),
        }
    }

    /// Read a file from disk into a new record. `None` when the content
    /// isn't UTF-8, which happens for binaries force-allowed by `[paths]`.
    pub fn open(path: &Path) -> io::Result<Option<Self>> {
        let bytes = fs::read(path)?;
        Ok(String::from_utf8(bytes).ok().map(|text| Self::new(path, text)))
    }

    /// The transform-relevant type, if the extension is one we handle.
    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_extension(&self.extension)
    }

    pub fn is_html(&self) -> bool {
        self.file_type() == Some(FileType::Html)
    }

    /// Write `text` back to `path`.
    pub fn write(&self) -> io::Result<()> {
        fs::write(&self.path, &self.text)
    }
}
