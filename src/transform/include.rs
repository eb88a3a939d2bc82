//! Replace include markers with fragment content.
//!
//! ```html
//! <div include="/includes/footer" class="site-footer"></div>
//! ```
//!
//! becomes the content of `includes/footer/index.html` (or
//! `includes/footer.html`, see [`resolve_include`]), inserted where the
//! marker was. The marker's other attributes are copied onto the first
//! inserted element that can carry them: `class` values are appended, any
//! other attribute overwrites.
//!
//! Fragments are inserted as-is. Markers inside an inserted fragment are not
//! expanded in the same pass.

use super::{BuildContext, Transform, TransformError};
use crate::dom::{self, HtmlDoc};
use crate::event::BuildEvent;
use crate::paths::resolve_include;
use crate::types::FileRecord;
use kuchikiki::{ElementData, NodeRef};

/// Elements that never receive the marker's attributes.
const SKIPPED_TAGS: &[&str] = &[
    "description",
    "link",
    "meta",
    "script",
    "style",
    "template",
    "title",
];

pub struct IncludeResolver {
    markers: Vec<String>,
    to_directory: bool,
    strict: bool,
}

impl IncludeResolver {
    pub fn new(markers: Vec<String>, to_directory: bool, strict: bool) -> Self {
        Self {
            markers,
            to_directory,
            strict,
        }
    }
}

impl Transform for IncludeResolver {
    fn name(&self) -> &'static str {
        "include"
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
        let markers = doc.elements_where(|el| dom::first_attr_value(el, &self.markers).is_some());
        if markers.is_empty() {
            return Ok(());
        }

        let mut changed = false;
        for marker in markers {
            let Some((_, value)) = dom::first_attr_value(&marker, &self.markers) else {
                continue;
            };
            let target = resolve_include(ctx.output_root, &value, self.to_directory);
            let lookup = match ctx.includes.get(&target) {
                Ok(lookup) => lookup,
                Err(err) if self.strict => return Err(err.into()),
                Err(err) => {
                    ctx.reporter
                        .skip(self.name(), &file.path, format!("{value}: {err}"));
                    continue;
                }
            };

            let nodes = dom::parse_nodes(&lookup.text);
            dom::insert_all_after(marker.as_node(), &nodes);
            copy_attributes(&marker, &nodes, &self.markers);
            marker.as_node().detach();
            changed = true;

            ctx.reporter.emit(BuildEvent::IncludeInserted {
                file: ctx.reporter.label(&file.path),
                target: value,
                cached: lookup.cached,
            });
        }

        if changed {
            file.text = doc.serialize();
        }
        Ok(())
    }
}

/// Copy the marker's non-marker attributes onto the first eligible element
/// among `inserted`.
fn copy_attributes(marker: &ElementData, inserted: &[NodeRef], marker_names: &[String]) {
    let Some(target) = inserted.iter().find_map(|node| {
        node.as_element()
            .filter(|el| !SKIPPED_TAGS.contains(&dom::tag_name(el)))
    }) else {
        return;
    };

    for (name, value) in dom::attributes(marker) {
        if marker_names.contains(&name) {
            continue;
        }
        if name == "class" {
            for class in value.split_whitespace() {
                dom::add_class(target, class);
            }
        } else {
            dom::set_attr(target, &name, &value);
        }
    }
}
