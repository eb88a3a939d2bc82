//! Whole-build hooks.
//!
//! A [`Transform`](crate::transform::Transform) sees one file at a time. A
//! [`BuildHook`] runs once per build instead:
//!
//! ```text
//! stage ──▶ before hooks ──▶ scan ──▶ per-file chain ──▶ bundles ──▶ page layout ──▶ after hooks
//! ```
//!
//! `before` sees the staged output tree, so it can drop generated files into
//! it, and it can extend the `[data]` table that fills `${name}`
//! placeholders. Hooks run in registration order and share one
//! [`BuildData`], so a later hook sees what an earlier one added. `after`
//! gets the finished [`BuildReport`].
//!
//! A hook error stops the build and names the hook.

use crate::pipeline::BuildReport;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Build-wide state handed to [`BuildHook::before`].
#[derive(Debug, Clone)]
pub struct BuildData {
    /// Root of the staged output tree.
    pub output_root: PathBuf,
    pub development: bool,
    /// Placeholder values, seeded from `[data]`.
    pub data: BTreeMap<String, String>,
}

pub trait BuildHook {
    /// Short name used in errors.
    fn name(&self) -> &'static str;

    fn before(&mut self, _build: &mut BuildData) -> Result<(), HookError> {
        Ok(())
    }

    fn after(&mut self, _report: &BuildReport) -> Result<(), HookError> {
        Ok(())
    }
}
