//! Drop the `/<source>` prefix from `url()` references in development builds.
//!
//! Stylesheets may reference `url(/src/css/base.css)` so that an inlined copy
//! resolves against the project root. Development builds don't inline, and
//! the source directory doesn't exist in the output, so those references are
//! rewritten to `url(/css/base.css)`.

use super::{BuildContext, Transform, TransformError};
use crate::types::{FileRecord, FileType};
use regex::Regex;

pub struct SourcePathRewriter {
    pattern: Regex,
}

impl SourcePathRewriter {
    /// `source_dir` is the source directory's name as it appears in URLs (`src`).
    pub fn new(source_dir: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r#"\((\s*['"]?)/{}/"#,
            regex::escape(source_dir.trim_matches('/'))
        ))?;
        Ok(Self { pattern })
    }

    pub fn rewrite(&self, text: &str) -> String {
        self.pattern.replace_all(text, "(${1}/").into_owned()
    }
}

impl Transform for SourcePathRewriter {
    fn name(&self) -> &'static str {
        "src-path"
    }

    fn accepts(&self, file: &FileRecord) -> bool {
        matches!(file.file_type(), Some(FileType::Html | FileType::Css))
    }

    fn apply(
        &mut self,
        file: &mut FileRecord,
        _ctx: &mut BuildContext<'_>,
    ) -> Result<(), TransformError> {
        if self.pattern.is_match(&file.text) {
            file.text = self.rewrite(&file.text);
        }
        Ok(())
    }
}
