//! The per-file transform chain.
//!
//! Every selected file is opened into a [`FileRecord`], handed by `&mut`
//! through each [`Transform`] in a fixed order, then written once. A
//! transform only ever replaces `file.text`; the path stays fixed for the
//! whole loop.
//!
//! ## Chain Order
//!
//! | Order | Transform                          | Files     | Development |
//! |-------|------------------------------------|-----------|-------------|
//! | 0     | user transforms                    | any       | yes         |
//! | 1     | [`placeholder::PlaceholderFiller`] | html      | yes         |
//! | 2     | [`include::IncludeResolver`]       | html      | yes         |
//! | 3     | [`inline::InlineResolver`]         | html      | no          |
//! | 4     | [`src_path::SourcePathRewriter`]   | html, css | only        |
//! | 5     | [`protocol::ProtocolNormalizer`]   | html      | yes         |
//! | 6     | [`active::ActiveLinkAnnotator`]    | html      | yes         |
//! | 7     | [`BundleCollector`](crate::bundle::BundleCollector) | html | yes |
//! | 8     | [`SourceMinifier`](crate::minify::SourceMinifier) | html, css, js | no |
//!
//! ## Shared State
//!
//! Transforms hold only their configuration. Build-scoped state (the include
//! cache and the bundle registry) is owned by the driver and lent to each
//! call through [`BuildContext`], so nothing outlives the build.

pub mod active;
pub mod include;
pub mod inline;
pub mod placeholder;
pub mod protocol;
pub mod src_path;

use crate::bundle::BundleRegistry;
use crate::cache::{IncludeCache, IncludeError};
use crate::event::Reporter;
use crate::types::FileRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error(transparent)]
    Include(#[from] IncludeError),
    #[error("Cannot read inline source {}: {source}", path.display())]
    Inline {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Raised by user transforms.
    #[error("{0}")]
    Custom(String),
}

/// Build-scoped state lent to transforms for one file.
pub struct BuildContext<'a> {
    /// Root of the staged output tree.
    pub output_root: &'a Path,
    pub includes: &'a mut IncludeCache,
    pub bundles: &'a mut BundleRegistry,
    pub reporter: &'a Reporter,
}

/// One step of the per-file chain.
///
/// Implement this to add a user transform with
/// [`Pipeline::with_transform`](crate::pipeline::Pipeline::with_transform).
/// User transforms run before the built-in chain.
pub trait Transform {
    /// Stage name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Whether `apply` should run for this file.
    fn accepts(&self, file: &FileRecord) -> bool;

    /// Rewrite `file.text` in place.
    fn apply(&mut self, file: &mut FileRecord, ctx: &mut BuildContext<'_>)
    -> Result<(), TransformError>;
}
