//! Build progress events.
//!
//! Stages never print. They emit [`BuildEvent`]s through a [`Reporter`], and
//! the CLI renders them on a printer thread with
//! [`format_build_event`](crate::output::format_build_event). Library callers
//! and tests that don't care about progress use [`Reporter::silent`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;

/// Progress and diagnostics from one build. File paths are relative to the
/// output root.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    /// Source tree copied into the output directory.
    Staged {
        source: PathBuf,
        output: PathBuf,
        files: usize,
    },
    /// Files selected for the transform loop.
    Scanned { files: usize },
    /// An include marker was replaced with fragment content.
    IncludeInserted {
        file: String,
        target: String,
        cached: bool,
    },
    /// A stylesheet or script reference was replaced with its content.
    Inlined { file: String, target: String },
    /// A protocol-less external link was given a scheme.
    LinkRewritten {
        file: String,
        from: String,
        to: String,
    },
    /// A recoverable problem: the element was left alone and the build went on.
    Skipped {
        stage: &'static str,
        file: String,
        detail: String,
    },
    /// The file's final text was written back.
    FileWritten { file: String },
    /// A bundle artifact was written after the file loop.
    BundleWritten { path: String, members: usize },
    /// `x.html` was moved to `x/index.html`.
    PageMoved { from: String, to: String },
}

/// Sends events to an optional listener and counts skips.
#[derive(Debug, Default)]
pub struct Reporter {
    tx: Option<Sender<BuildEvent>>,
    root: PathBuf,
    skipped: AtomicUsize,
}

impl Reporter {
    /// Report to `tx`, labelling files relative to `root`.
    pub fn new(tx: Sender<BuildEvent>, root: impl Into<PathBuf>) -> Self {
        Self {
            tx: Some(tx),
            root: root.into(),
            skipped: AtomicUsize::new(0),
        }
    }

    /// Discard all events.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: BuildEvent) {
        if matches!(event, BuildEvent::Skipped { .. }) {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(tx) = &self.tx {
            // A gone listener is not a build failure.
            tx.send(event).ok();
        }
    }

    /// Emit a [`BuildEvent::Skipped`] for `path`.
    pub fn skip(&self, stage: &'static str, path: &Path, detail: impl Into<String>) {
        self.emit(BuildEvent::Skipped {
            stage,
            file: self.label(path),
            detail: detail.into(),
        });
    }

    /// Display label for a path under the output root.
    pub fn label(&self, path: &Path) -> String {
        crate::paths::relative_slash_path(&self.root, path)
    }

    /// Number of `Skipped` events emitted so far.
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }
}
