//! # Pagesmith
//!
//! A build pipeline for hand-written static sites. Pages are plain HTML files
//! in a source tree; attributes on ordinary elements tell the build what to
//! do with them. Shared fragments are spliced in, critical CSS and scripts
//! are inlined, assets are concatenated into bundles, navigation links learn
//! which page they are on, and everything is minified.
//!
//! # Architecture: Stage, Transform, Materialize
//!
//! ```text
//! 1. Stage        src/  →  dist/           (clean copy of the source tree)
//! 2. Transform    dist/ →  dist/           (per-file chain, in place, one write per file)
//! 3. Materialize  bundles, then x.html → x/index.html
//! ```
//!
//! Transforms work on the staged copy, never on the source. Anything that
//! needs a complete view of the site (bundle contents, the final page layout)
//! waits until every file has been through the chain.
//!
//! # Marker Attributes
//!
//! ```html
//! <div include="/includes/footer" class="site-footer"></div>
//! <link rel="stylesheet" href="/css/critical.css" inline>
//! <script src="/js/menu.js" bundle="main"></script>
//! <script src="/js/vendor.min.js" bundle="main" no-minify></script>
//! <a href="www.example.com">example</a>
//! ```
//!
//! Each marker also works with a `data-` prefix. All names are configurable
//! in `pagesmith.toml`.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Build driver: owns build-scoped state and runs the stages in order |
//! | [`stage`] | Copies the source tree into a fresh output directory |
//! | [`scan`] | Selects the files that enter the transform loop, includes first |
//! | [`transform`] | The `Transform` trait and the per-file HTML transforms |
//! | [`hook`] | `BuildHook`: code that runs once before and once after the file loop |
//! | [`bundle`] | Collects bundle members during the loop, writes artifacts after it |
//! | [`materialize`] | Moves flat pages into directory form at the very end |
//! | [`minify`] | HTML and CSS minification via `minify-html`, JS comment and whitespace stripping |
//! | [`cache`] | Build-scoped include fragment cache |
//! | [`dom`] | Thin helpers over the `kuchikiki` DOM |
//! | [`paths`] | URL and path conventions shared by the transforms |
//! | [`config`] | `pagesmith.toml` loading, merging and validation |
//! | [`event`] | Build progress events and the `Reporter` that sends them |
//! | [`output`] | CLI output formatting |
//! | [`types`] | `FileRecord` and `FileType` |
//!
//! # Design Decisions
//!
//! ## One Write Per File
//!
//! A [`types::FileRecord`] is read once, passed by `&mut` through every
//! transform, and written once. Transforms only replace its text; the path
//! never changes during the loop. Page moves happen in [`materialize`] after
//! the loop, which is why an include written as `/about` falls back to
//! `about.html` when `about/index.html` does not exist yet.
//!
//! ## Explicit Build State
//!
//! The include cache and the bundle registry are created by
//! [`pipeline::Pipeline::run`] and lent to transforms through
//! [`transform::BuildContext`]. Nothing is global, so two builds in one
//! process never share state.
//!
//! ## Warn, Don't Abort
//!
//! A missing include or inline target is reported as a `Skipped` event and
//! the element is left alone. Set `[includes] strict = true` to make missing
//! includes fatal. I/O failures while writing are always fatal and name the
//! stage and file.

pub mod bundle;
pub mod cache;
pub mod config;
pub mod dom;
pub mod event;
pub mod hook;
pub mod materialize;
pub mod minify;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod scan;
pub mod stage;
pub mod transform;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
