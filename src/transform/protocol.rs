//! Give protocol-less external links a scheme.
//!
//! Authors write `<a href="www.example.com">` and mean an external site, but
//! a browser treats it as a relative path. Resolved against the preview
//! origin such a value becomes `https://localhost/www.example.com`; when the
//! last path segment's first label is a configured target (`www`, `cdn`) the
//! value is rewritten to `http://www.example.com`.
//!
//! Checked attributes: `href` on `<a>` and `<link>`, `src` on `<script>`.

use super::{BuildContext, Transform, TransformError};
use crate::dom::{self, HtmlDoc};
use crate::event::BuildEvent;
use crate::paths::preview_url;
use crate::types::FileRecord;

pub struct ProtocolNormalizer {
    targets: Vec<String>,
}

impl ProtocolNormalizer {
    pub fn new(targets: Vec<String>) -> Self {
        Self { targets }
    }

    /// The rewritten value, or `None` when `value` is left alone.
    pub fn normalize(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let resolved = preview_url(value);
        let segments: Vec<&str> = resolved.split('/').filter(|s| !s.is_empty()).collect();
        if !segments.contains(&"localhost") {
            return None;
        }
        let last = segments.last()?;
        let label = last.split('.').next().unwrap_or(last);
        self.targets
            .iter()
            .any(|t| t == label)
            .then(|| format!("http://{last}"))
    }
}

impl Transform for ProtocolNormalizer {
    fn name(&self) -> &'static str {
        "protocol"
    }

    fn accepts(&self, file: &FileRecord) -> bool {
        file.is_html() && !self.targets.is_empty()
    }

    fn apply(
        &mut self,
        file: &mut FileRecord,
        ctx: &mut BuildContext<'_>,
    ) -> Result<(), TransformError> {
        let doc = HtmlDoc::parse(&file.text);
        let mut changed = false;

        for el in doc.elements_where(|el| matches!(dom::tag_name(el), "a" | "link" | "script")) {
            let attr = if dom::tag_name(&el) == "script" { "src" } else { "href" };
            let Some(value) = dom::attr(&el, attr) else {
                continue;
            };
            let Some(rewritten) = self.normalize(&value) else {
                continue;
            };
            dom::set_attr(&el, attr, &rewritten);
            changed = true;
            ctx.reporter.emit(BuildEvent::LinkRewritten {
                file: ctx.reporter.label(&file.path),
                from: value,
                to: rewritten,
            });
        }

        if changed {
            file.text = doc.serialize();
        }
        Ok(())
    }
}
