//! Shared test utilities for the pagesmith test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = setup_site();
//! let report = Pipeline::new(site.config()).run(&Reporter::silent()).unwrap();
//! assert!(read_output(&site, "index.html").contains("<footer"));
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::SiteConfig;

// =========================================================================
// Fixture setup
// =========================================================================

/// A temp directory holding a copy of `fixtures/site/` as `src/`, with
/// `dist/` as the (not yet created) output directory.
pub struct Site {
    tmp: TempDir,
}

impl Site {
    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn source(&self) -> PathBuf {
        self.root().join("src")
    }

    pub fn output(&self) -> PathBuf {
        self.root().join("dist")
    }

    /// Stock config pointed at this site's directories.
    pub fn config(&self) -> SiteConfig {
        SiteConfig {
            source: self.source(),
            output: self.output(),
            ..SiteConfig::default()
        }
    }
}

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_site() -> Site {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    let source = tmp.path().join("src");
    std::fs::create_dir_all(&source).unwrap();
    copy_dir_recursive(&fixtures, &source).unwrap();
    Site { tmp }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Read a file from the site's output directory. Panics with the path on miss.
pub fn read_output(site: &Site, rel: &str) -> String {
    let path = site.output().join(rel);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read output {}: {e}", path.display()))
}
