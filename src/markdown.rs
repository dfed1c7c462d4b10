//! Markdown rendering via pulldown-cmark.
//!
//! Also hosts the first-paragraph summary fallback used when a page declares
//! neither `summary` nor `description` in its frontmatter.

use pulldown_cmark::{Options, Parser, html};
use regex::Regex;
use std::sync::OnceLock;

/// Words kept by the summary fallback when no `<p>` is found.
const SUMMARY_MAX_WORDS: usize = 30;

static PARAGRAPH_RE: OnceLock<Regex> = OnceLock::new();

/// Render a markdown fragment to HTML.
pub fn render_markdown(input: &str, smart_punctuation: bool) -> String {
    let mut options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH;
    if smart_punctuation {
        options |= Options::ENABLE_SMART_PUNCTUATION;
    }

    let parser = Parser::new_ext(input, options);
    let mut out = String::with_capacity(input.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Extract the first paragraph from rendered HTML.
///
/// Falls back to the first [`SUMMARY_MAX_WORDS`] words wrapped in a `<p>`
/// when the content has no paragraph element.
pub fn first_paragraph(html_content: &str) -> String {
    let re = PARAGRAPH_RE
        .get_or_init(|| Regex::new(r"(?s)<p>(.+?)</p>").expect("valid paragraph regex"));

    if let Some(found) = re.find(html_content) {
        return found.as_str().to_owned();
    }

    let mut words: Vec<&str> = html_content.split_whitespace().collect();
    let truncated = words.len() > SUMMARY_MAX_WORDS;
    words.truncate(SUMMARY_MAX_WORDS);
    if truncated {
        words.push("...");
    }

    format!("<p>{}</p>", words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic() {
        let html = render_markdown("# Title\n\nSome *emphasis*.", false);
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn test_render_table_extension() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |", false);
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_smart_punctuation() {
        let plain = render_markdown("\"quoted\"", false);
        assert!(plain.contains("\"quoted\""));

        let smart = render_markdown("\"quoted\"", true);
        assert!(smart.contains("\u{201c}quoted\u{201d}"));
    }

    #[test]
    fn test_first_paragraph_finds_p() {
        let html = "<h1>Head</h1><p>First one.</p><p>Second.</p>";
        assert_eq!(first_paragraph(html), "<p>First one.</p>");
    }

    #[test]
    fn test_first_paragraph_spans_lines() {
        let html = "<p>line one\nline two</p>";
        assert_eq!(first_paragraph(html), "<p>line one\nline two</p>");
    }

    #[test]
    fn test_first_paragraph_fallback_truncates() {
        let words: Vec<String> = (0..40).map(|i| format!("w{i}")).collect();
        let summary = first_paragraph(&words.join(" "));
        assert!(summary.starts_with("<p>w0 "));
        assert!(summary.ends_with("...</p>"));
        assert!(summary.contains("w29"));
        assert!(!summary.contains("w30 "));
    }

    #[test]
    fn test_first_paragraph_fallback_short_content() {
        assert_eq!(first_paragraph("just three words"), "<p>just three words</p>");
    }
}
