//! Convert flat pages into directory form: `about.html` → `about/index.html`.
//!
//! Runs once after every content transform and bundle has been written, so
//! nothing reads a page at its old path afterwards. `index.html` files and
//! paths matching a `[pages] exclude` pattern stay where they are. A page
//! whose target already exists is reported and left in place.

use crate::config::{self, ConfigError, SiteConfig};
use crate::event::{BuildEvent, Reporter};
use crate::paths::relative_slash_path;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Cannot move {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct PathMaterializer {
    exclude: Vec<Regex>,
}

impl PathMaterializer {
    pub fn new(exclude: Vec<Regex>) -> Self {
        Self { exclude }
    }

    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config::compile_patterns(&config.pages.exclude)?))
    }

    /// Directory-form path for `path`, or `None` when it stays put.
    pub fn target(&self, root: &Path, path: &Path) -> Option<PathBuf> {
        let is_html = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("html"));
        let stem = path.file_stem()?.to_string_lossy();
        if !is_html || stem == "index" {
            return None;
        }
        let rel = relative_slash_path(root, path);
        if self.exclude.iter().any(|re| re.is_match(&rel)) {
            return None;
        }
        Some(path.with_file_name(stem.as_ref()).join("index.html"))
    }

    /// Move every eligible page and return `files` with the new layout.
    pub fn run(
        &self,
        root: &Path,
        files: Vec<PathBuf>,
        reporter: &Reporter,
    ) -> Result<Vec<PathBuf>, MaterializeError> {
        let mut result = Vec::with_capacity(files.len());
        for path in files {
            let Some(target) = self.target(root, &path) else {
                result.push(path);
                continue;
            };
            if target.exists() {
                reporter.skip(
                    "materialize",
                    &path,
                    format!("{} already exists", reporter.label(&target)),
                );
                result.push(path);
                continue;
            }

            let io_err = |source| MaterializeError::Io {
                path: path.clone(),
                source,
            };
            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir).map_err(io_err)?;
            }
            fs::rename(&path, &target).map_err(io_err)?;

            reporter.emit(BuildEvent::PageMoved {
                from: reporter.label(&path),
                to: reporter.label(&target),
            });
            result.push(target);
        }
        Ok(result)
    }
}
