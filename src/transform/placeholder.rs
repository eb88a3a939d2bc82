//! `${key}` placeholder substitution from the `[data]` config table.
//!
//! Unknown keys are left exactly as written so a literal `${...}` in inline
//! JavaScript survives.

use super::{BuildContext, Transform, TransformError};
use crate::types::FileRecord;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}]*)\}").expect("placeholder regex is valid"));

pub struct PlaceholderFiller {
    data: BTreeMap<String, String>,
}

impl PlaceholderFiller {
    pub fn new(data: BTreeMap<String, String>) -> Self {
        Self { data }
    }

    pub fn fill(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures| match self.data.get(caps[1].trim()) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

impl Transform for PlaceholderFiller {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn accepts(&self, file: &FileRecord) -> bool {
        file.is_html() && !self.data.is_empty()
    }

    fn apply(
        &mut self,
        file: &mut FileRecord,
        _ctx: &mut BuildContext<'_>,
    ) -> Result<(), TransformError> {
        if file.text.contains("${") {
            file.text = self.fill(&file.text);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filler() -> PlaceholderFiller {
        PlaceholderFiller::new(BTreeMap::from([
            ("year".to_string(), "2026".to_string()),
            ("site".to_string(), "Example".to_string()),
        ]))
    }

    #[test]
    fn replaces_known_keys() {
        assert_eq!(
            filler().fill("<p>&copy; ${year} ${ site }</p>"),
            "<p>&copy; 2026 Example</p>"
        );
    }

    #[test]
    fn leaves_unknown_keys_alone() {
        assert_eq!(
            filler().fill("<script>`${count} items`</script>"),
            "<script>`${count} items`</script>"
        );
    }

    #[test]
    fn only_html_is_accepted() {
        let filler = filler();
        assert!(filler.accepts(&FileRecord::new("a.html", "")));
        assert!(!filler.accepts(&FileRecord::new("a.css", "")));
        assert!(!PlaceholderFiller::new(BTreeMap::new()).accepts(&FileRecord::new("a.html", "")));
    }
}
