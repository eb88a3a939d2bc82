//! Stage the source tree into a fresh output directory.
//!
//! Every build starts from a clean copy: the output directory is removed,
//! recreated, and the whole source tree is copied in. Transforms then work on
//! the copy in place, so the source is never modified.
//!
//! Symlinks are followed: a linked file or directory is staged as a real
//! copy of its target. A dangling link or a link cycle fails the build.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Output {} overlaps source {}", output.display(), source_dir.display())]
    Overlap { source_dir: PathBuf, output: PathBuf },
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> StageError + '_ {
    move |source| StageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Replace `output` with a copy of `source`. Returns the number of files copied.
///
/// Refuses when either directory contains the other, since removing or
/// filling the output would then destroy or recurse into the source.
pub fn stage(source: &Path, output: &Path) -> Result<usize, StageError> {
    if !source.is_dir() {
        return Err(StageError::SourceNotFound(source.to_path_buf()));
    }
    let abs_source = std::path::absolute(source).map_err(io_at(source))?;
    let abs_output = std::path::absolute(output).map_err(io_at(output))?;
    if abs_output.starts_with(&abs_source) || abs_source.starts_with(&abs_output) {
        return Err(StageError::Overlap {
            source_dir: source.to_path_buf(),
            output: output.to_path_buf(),
        });
    }

    if output.exists() {
        fs::remove_dir_all(output).map_err(io_at(output))?;
    }
    fs::create_dir_all(output).map_err(io_at(output))?;

    let mut copied = 0;
    for entry in WalkDir::new(source).min_depth(1).follow_links(true) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let dest = output.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(io_at(&dest))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &dest).map_err(io_at(&dest))?;
            copied += 1;
        }
    }
    Ok(copied)
}
