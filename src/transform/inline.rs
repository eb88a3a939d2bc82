//! Inline marked stylesheets and scripts.
//!
//! `<link rel="stylesheet" href="/css/critical.css" inline>` becomes a
//! `<style>` holding the file's text, and `<script src="/js/a.js" inline>`
//! becomes a `<script>` holding its text. Only site-absolute local paths
//! (leading `/`) are inlined; the file is read from the output tree as it is
//! at that moment in the loop.
//!
//! Values rendered by the preview server (`https://localhost/css/a.css`) are
//! reduced to their path first. A missing file is reported and the element
//! left as written, and so is a file whose text contains the closing tag of
//! the element it would go into (`</script>` in a script), since that would
//! end the element early.

use super::{BuildContext, Transform, TransformError};
use crate::dom::{self, HtmlDoc};
use crate::event::BuildEvent;
use crate::paths::strip_preview_origin;
use crate::types::FileRecord;
use kuchikiki::NodeRef;
use std::fs;
use std::path::Path;

/// Attributes that only make sense on the external reference.
const DROPPED_ATTRS: &[&str] = &[
    "async",
    "crossorigin",
    "defer",
    "href",
    "integrity",
    "rel",
    "src",
];

pub struct InlineResolver {
    markers: Vec<String>,
}

impl InlineResolver {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }
}

/// The site-absolute path an inline reference points at, if it is local.
fn local_path(value: &str) -> Option<&str> {
    let path = strip_preview_origin(value.trim());
    let path = path.split(['?', '#']).next().unwrap_or(path);
    (path.starts_with('/') && !path.starts_with("//")).then_some(path)
}

/// `</tag` anywhere in `text`, in any case.
fn closes_element(text: &str, tag: &str) -> bool {
    text.to_ascii_lowercase().contains(&format!("</{tag}"))
}

fn read_inline(root: &Path, path: &str) -> Result<String, TransformError> {
    let full = root.join(path.trim_start_matches('/'));
    fs::read_to_string(&full).map_err(|source| TransformError::Inline { path: full, source })
}

impl Transform for InlineResolver {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn accepts(&self, file: &FileRecord) -> bool {
        file.is_html()
    }

    fn apply(
        &mut self,
        file: &mut FileRecord,
        ctx: &mut BuildContext<'_>,
    ) -> Result<(), TransformError> {
        let doc = HtmlDoc::parse(&file.text);
        let targets = doc.elements_where(|el| {
            matches!(dom::tag_name(el), "link" | "script") && dom::has_any_attr(el, &self.markers)
        });

        let mut changed = false;
        for el in targets {
            let (source_attr, new_tag) = match dom::tag_name(&el) {
                "link" => ("href", "style"),
                _ => ("src", "script"),
            };

            let Some(value) = dom::attr(&el, source_attr) else {
                continue;
            };
            let Some(path) = local_path(&value) else {
                continue;
            };
            let text = match read_inline(ctx.output_root, path) {
                Ok(text) => text,
                Err(err) => {
                    ctx.reporter.skip(self.name(), &file.path, err.to_string());
                    continue;
                }
            };
            if closes_element(&text, new_tag) {
                ctx.reporter.skip(
                    self.name(),
                    &file.path,
                    format!("{path} contains </{new_tag}>"),
                );
                continue;
            }

            let Some(replacement) = dom::new_element(&format!("<{new_tag}>"), new_tag) else {
                continue;
            };
            replacement.append(NodeRef::new_text(text));
            if let Some(new_el) = replacement.as_element() {
                for (name, attr_value) in dom::attributes(&el) {
                    if !DROPPED_ATTRS.contains(&name.as_str()) && !self.markers.contains(&name) {
                        dom::set_attr(new_el, &name, &attr_value);
                    }
                }
            }
            el.as_node().insert_before(replacement);
            el.as_node().detach();
            changed = true;

            ctx.reporter.emit(BuildEvent::Inlined {
                file: ctx.reporter.label(&file.path),
                target: path.to_string(),
            });
        }

        if changed {
            file.text = doc.serialize();
        }
        Ok(())
    }
}
