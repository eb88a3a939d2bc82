//! Minification for HTML, CSS and JS.
//!
//! HTML goes through [`minify_html`] and stylesheets go through it wrapped
//! in a `<style>` element whose tags are stripped again afterwards. Scripts
//! only lose comments and whitespace (see [`js`]); minify-html's own JS
//! pass is off, which also leaves inline `<script>` bodies alone. Whenever
//! a minifier fails the input is returned unchanged, so minification never
//! corrupts a file.
//!
//! Closing tags and `<html>`/`<head>` opening tags are kept: include fragments
//! are minified before pages splice them in.

pub mod js;

use crate::config::MinifyConfig;
use crate::transform::{BuildContext, Transform, TransformError};
use crate::types::{FileRecord, FileType};
use minify_html::Cfg;

fn cfg() -> Cfg {
    Cfg {
        minify_css: true,
        minify_js: false,
        keep_closing_tags: true,
        keep_html_and_head_opening_tags: true,
        ..Cfg::default()
    }
}

pub fn minify_html(text: &str) -> String {
    String::from_utf8(minify_html::minify(text.as_bytes(), &cfg())).unwrap_or_else(|_| text.to_string())
}

pub fn minify_css(text: &str) -> String {
    minify_wrapped(text, "style")
}

pub fn minify_js(text: &str) -> String {
    js::minify(text).unwrap_or_else(|_| text.to_string())
}

/// Minify `text` as the body of a `<tag>` element.
fn minify_wrapped(text: &str, tag: &str) -> String {
    let close = format!("</{tag}>");
    if text.to_ascii_lowercase().contains(&format!("</{tag}")) {
        return text.to_string();
    }
    let open = format!("<{tag}>");
    let wrapped = format!("{open}{text}{close}");
    let minified = minify_html(&wrapped);
    minified
        .trim()
        .strip_prefix(open.as_str())
        .and_then(|rest| rest.strip_suffix(close.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| text.to_string())
}

/// Minify `text` according to `file_type`.
pub fn minify(file_type: FileType, text: &str) -> String {
    match file_type {
        FileType::Html => minify_html(text),
        FileType::Css => minify_css(text),
        FileType::Js => minify_js(text),
    }
}

/// Last step before a file is written. Left out of development builds.
pub struct SourceMinifier {
    config: MinifyConfig,
}

impl SourceMinifier {
    pub fn new(config: MinifyConfig) -> Self {
        Self { config }
    }

    pub fn enabled_for(&self, file_type: FileType) -> bool {
        match file_type {
            FileType::Html => self.config.html,
            FileType::Css => self.config.css,
            FileType::Js => self.config.js,
        }
    }
}

impl Transform for SourceMinifier {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn accepts(&self, file: &FileRecord) -> bool {
        file.file_type().is_some_and(|t| self.enabled_for(t))
    }

    fn apply(
        &mut self,
        file: &mut FileRecord,
        ctx: &mut BuildContext<'_>,
    ) -> Result<(), TransformError> {
        match file.file_type() {
            Some(FileType::Js) => match js::minify(&file.text) {
                Ok(text) => file.text = text,
                Err(err) => ctx.reporter.skip(self.name(), &file.path, err.to_string()),
            },
            Some(file_type) => file.text = minify(file_type, &file.text),
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_whitespace_and_comments_collapse() {
        let out = minify_css("/* header */\nbody {\n  margin: 0;\n}\n");
        assert!(!out.contains("header"));
        assert!(!out.contains('\n'));
        assert!(out.contains("margin:0"));
    }

    #[test]
    fn js_is_compressed_but_keeps_identifiers() {
        let out = minify_js("// note\nfunction greet(name) {\n    return 'hi ' + name;\n}\n");
        assert!(!out.contains("note"));
        assert!(out.contains("function greet(name)"));
        assert!(out.len() < "function greet(name) {\n    return 'hi ' + name;\n}\n".len());
    }

    #[test]
    fn js_modules_and_getters_survive() {
        let src = "export class Counter {\n  get value() { return this.n }\n}\nexport function make() {\n  return new Counter()\n}\n";
        let out = minify_js(src);
        assert!(out.starts_with("export class Counter{get value(){return this.n}}"));
        assert!(out.contains("export function make(){return new Counter()}"));
    }

    #[test]
    fn unterminated_js_is_returned_unchanged() {
        let js = "var s = 'open\nvar t = 1;";
        assert_eq!(minify_js(js), js);
    }

    #[test]
    fn inline_scripts_in_pages_are_not_rewritten() {
        let page = "<script type=\"module\">\nexport const answer = 42;\nexport function ask() { return answer }\n</script>";
        let out = minify_html(page);
        assert!(out.contains("export const answer = 42;"));
        assert!(out.contains("export function ask() { return answer }"));
    }

    #[test]
    fn html_comments_and_whitespace_collapse() {
        let out = minify_html("<div>\n    <!-- c -->\n    <p>Hello</p>\n</div>\n");
        assert!(!out.contains("<!--"));
        assert!(out.contains("<p>Hello</p>"));
    }

    #[test]
    fn minification_is_idempotent() {
        let css = minify_css("a {  color : red ; }\n\nb { color: blue }");
        assert_eq!(minify_css(&css), css);
        let js = minify_js("let total = 1 +  2;\nconsole.log( total );");
        assert_eq!(minify_js(&js), js);
        let html = minify_html("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>");
        assert_eq!(minify_html(&html), html);
    }

    #[test]
    fn embedded_closing_tag_is_left_alone() {
        let js = "document.write('</script>');";
        assert_eq!(minify_js(js), js);
    }

    #[test]
    fn transform_reports_js_it_cannot_minify() {
        use crate::transform::tests::Harness;
        use std::path::Path;

        let mut harness = Harness::new(Path::new("/out"));
        let mut minifier = SourceMinifier::new(MinifyConfig::default());
        let original = "let a = 1; /* open";
        let mut file = FileRecord::new("/out/js/app.js", original);

        harness.run(&mut minifier, &mut file).unwrap();
        assert_eq!(file.text, original);
        assert_eq!(harness.reporter.skipped(), 1);
    }

    #[test]
    fn per_type_switches() {
        let minifier = SourceMinifier::new(MinifyConfig {
            html: true,
            css: false,
            js: true,
        });
        assert!(minifier.accepts(&FileRecord::new("a.html", "")));
        assert!(!minifier.accepts(&FileRecord::new("a.css", "")));
        assert!(!minifier.accepts(&FileRecord::new("a.txt", "")));
    }
}
