//! Mark navigation links that point at the current page or one of its
//! sections.
//!
//! For `docs/guide/intro.html` (or `docs/guide/intro/index.html`):
//! - `<a href="/docs/guide/intro">` is *active*
//! - `<a href="/docs">` and `<a href="/docs/guide/">` are *parent-active*
//! - `<a href="/blog">` is untouched
//!
//! Links are compared by [page key](crate::paths::page_key), so `/x`,
//! `/x.html` and `/x/index.html` are the same page. External links, pure
//! `#fragment` links and empty hrefs are skipped.

use super::{BuildContext, Transform, TransformError};
use crate::config::{ActiveLinkConfig, MarkerStyle};
use crate::dom::{self, HtmlDoc};
use crate::paths::{self, has_scheme, page_key, page_sections, strip_preview_origin};
use crate::types::FileRecord;
use kuchikiki::ElementData;

/// How a link relates to the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Active,
    ParentActive,
}

/// Page key plus ancestor section keys for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    key: String,
    ancestors: Vec<String>,
}

impl PageLocation {
    /// Locate a page from its output-relative path.
    pub fn from_relative(rel_path: &str) -> Self {
        let mut ancestors = page_sections(rel_path);
        ancestors.pop();
        Self {
            key: page_key(rel_path),
            ancestors,
        }
    }

    /// Classify an `href` relative to this page. Exact match wins.
    pub fn classify(&self, href: &str) -> Option<LinkState> {
        let href = strip_preview_origin(href.trim());
        if href.is_empty() || href.starts_with('#') || has_scheme(href) || href.starts_with("//") {
            return None;
        }
        let link_key = page_key(href);
        if link_key == self.key {
            Some(LinkState::Active)
        } else if self.ancestors.contains(&link_key) {
            Some(LinkState::ParentActive)
        } else {
            None
        }
    }
}

pub struct ActiveLinkAnnotator {
    config: ActiveLinkConfig,
}

impl ActiveLinkAnnotator {
    pub fn new(config: ActiveLinkConfig) -> Self {
        Self { config }
    }

    fn mark(&self, el: &ElementData, state: LinkState) {
        let name = match state {
            LinkState::Active => &self.config.active,
            LinkState::ParentActive => &self.config.parent_active,
        };
        match self.config.style {
            MarkerStyle::Class => dom::add_class(el, name),
            MarkerStyle::Attribute => dom::set_attr(el, &format!("data-{name}"), ""),
        }
    }
}

impl Transform for ActiveLinkAnnotator {
    fn name(&self) -> &'static str {
        "active-links"
    }

    fn accepts(&self, file: &FileRecord) -> bool {
        file.is_html()
    }

    fn apply(
        &mut self,
        file: &mut FileRecord,
        ctx: &mut BuildContext<'_>,
    ) -> Result<(), TransformError> {
        let rel = paths::relative_slash_path(ctx.output_root, &file.path);
        let page = PageLocation::from_relative(&rel);
        let doc = HtmlDoc::parse(&file.text);

        let mut changed = false;
        for link in doc.elements_where(|el| dom::tag_name(el) == "a") {
            let Some(href) = dom::attr(&link, "href") else {
                continue;
            };
            if let Some(state) = page.classify(&href) {
                self.mark(&link, state);
                changed = true;
            }
        }

        if changed {
            file.text = doc.serialize();
        }
        Ok(())
    }
}
