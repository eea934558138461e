//! Text extraction from raw sources.

use crate::model::ExtractedData;
use regex::Regex;
use resume_review_integration::RawSources;
use std::sync::LazyLock;

/// Upper bound on the reported token estimate.
pub const MAX_TOKENS: u32 = 16_000;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Replaces markup tags with spaces and collapses whitespace.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Roughly four characters per token, capped at [`MAX_TOKENS`].
#[must_use]
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.encode_utf16().count();
    let tokens = u32::try_from(chars.saturating_add(2) / 4).unwrap_or(u32::MAX);
    tokens.min(MAX_TOKENS)
}

/// Joins the non-empty sources into one text, LinkedIn markup stripped.
#[must_use]
pub fn extract(raw: &RawSources) -> ExtractedData {
    let linked_in = raw.linked_in_html.as_deref().map(strip_html);
    let text = [
        raw.resume_text.as_deref(),
        linked_in.as_deref(),
        raw.github_readme.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("\n\n");

    let tokens = estimate_tokens(&text);
    ExtractedData { text, tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_removes_tags_and_collapses_space() {
        assert_eq!(
            strip_html("<div><h1>Taylor</h1>\n  <p>Engineer</p></div>"),
            "Taylor Engineer"
        );
        assert_eq!(strip_html("a < b"), "a < b");
    }

    #[test]
    fn token_estimate_rounds_and_caps() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcde"), 1);
        assert_eq!(estimate_tokens("abcdef"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(100_000)), MAX_TOKENS);
    }

    #[test]
    fn joins_present_sources_in_order() {
        let raw = RawSources {
            resume_text: Some("Resume".to_string()),
            linked_in_html: Some("<p>LinkedIn</p>".to_string()),
            github_readme: None,
        };
        let extracted = extract(&raw);
        assert_eq!(extracted.text, "Resume\n\nLinkedIn");
        assert_eq!(extracted.tokens, 4);
    }

    #[test]
    fn empty_sources_extract_nothing() {
        let raw = RawSources {
            resume_text: Some(String::new()),
            ..RawSources::default()
        };
        let extracted = extract(&raw);
        assert_eq!(extracted.text, "");
        assert_eq!(extracted.tokens, 0);
    }
}
