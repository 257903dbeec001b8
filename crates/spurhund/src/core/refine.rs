//! Textual sub-format detection.
//!
//! Once a payload has been judged text-like, [`refine_text`] decodes a bounded
//! prefix and walks an ordered rule chain. The first rule that fires decides the
//! type; later rules are only reached through fall-through. In particular, input
//! that starts like JSON but does not parse continues down the chain.
//!
//! The JSON rule checks brackets on the lower-cased text but parses the original
//! text. Both forms only differ in letter case, so the result is the same for
//! every real payload.

use crate::core::mime::{
    CSV_MIME_TYPE, HTML_MIME_TYPE, JAVASCRIPT_MIME_TYPE, JSON_MIME_TYPE, PLAIN_TEXT_MIME_TYPE, SOURCE_CODE_MIME_TYPE,
    XML_MIME_TYPE,
};

/// Maximum number of leading bytes decoded for rule matching.
pub const REFINE_SAMPLE_SIZE: usize = 1024;

/// Number of leading non-empty lines the delimiter rule inspects.
const CSV_PROBE_LINES: usize = 5;

/// Decoded sample shared by all rules.
#[derive(Debug, Clone)]
pub struct TextSample {
    pub original: String,
    pub lowered: String,
}

impl TextSample {
    pub fn decode(bytes: &[u8]) -> Self {
        let prefix = &bytes[..bytes.len().min(REFINE_SAMPLE_SIZE)];
        let original = String::from_utf8_lossy(prefix).into_owned();
        let lowered = original.to_lowercase();
        Self { original, lowered }
    }

    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|needle| self.lowered.contains(needle))
    }
}

/// One step of the rule chain.
#[derive(Debug, Clone, Copy)]
pub struct TextRule {
    pub name: &'static str,
    pub mime_type: &'static str,
    pub predicate: fn(&TextSample) -> bool,
}

fn is_xml(sample: &TextSample) -> bool {
    sample.contains_any(&["<?xml", "<xml"])
}

fn is_html(sample: &TextSample) -> bool {
    sample.contains_any(&["<!doctype html", "<html"])
}

fn is_json(sample: &TextSample) -> bool {
    let trimmed = sample.lowered.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return false;
    }
    serde_json::from_str::<serde::de::IgnoredAny>(&sample.original).is_ok()
}

fn is_javascript(sample: &TextSample) -> bool {
    sample.contains_any(&["function", "var ", "const ", "let "])
}

fn is_source_code(sample: &TextSample) -> bool {
    sample.contains_any(&["#include", "int main", "public class"])
}

fn is_delimited(sample: &TextSample) -> bool {
    let mut probed = 0;
    for line in sample.lowered.lines().filter(|line| !line.trim().is_empty()).take(CSV_PROBE_LINES) {
        if !(line.contains(',') || line.contains(';')) {
            return false;
        }
        probed += 1;
    }
    probed > 0
}

/// The rule chain in evaluation order.
pub static TEXT_RULES: &[TextRule] = &[
    TextRule {
        name: "xml",
        mime_type: XML_MIME_TYPE,
        predicate: is_xml,
    },
    TextRule {
        name: "html",
        mime_type: HTML_MIME_TYPE,
        predicate: is_html,
    },
    TextRule {
        name: "json",
        mime_type: JSON_MIME_TYPE,
        predicate: is_json,
    },
    TextRule {
        name: "javascript",
        mime_type: JAVASCRIPT_MIME_TYPE,
        predicate: is_javascript,
    },
    TextRule {
        name: "source-code",
        mime_type: SOURCE_CODE_MIME_TYPE,
        predicate: is_source_code,
    },
    TextRule {
        name: "csv",
        mime_type: CSV_MIME_TYPE,
        predicate: is_delimited,
    },
];

/// Refine a text-like payload into a specific textual MIME type.
///
/// Falls back to `text/plain` when no rule fires.
///
/// ```rust
/// use spurhund::core::refine::refine_text;
///
/// assert_eq!(refine_text(br#"{"key":"value"}"#), "application/json");
/// assert_eq!(refine_text(b"{not json at all"), "text/plain");
/// assert_eq!(refine_text(b"<!DOCTYPE html><html></html>"), "text/html");
/// ```
pub fn refine_text(bytes: &[u8]) -> &'static str {
    let sample = TextSample::decode(bytes);
    TEXT_RULES
        .iter()
        .find(|rule| (rule.predicate)(&sample))
        .map(|rule| {
            tracing::trace!(rule = rule.name, "text rule matched");
            rule.mime_type
        })
        .unwrap_or(PLAIN_TEXT_MIME_TYPE)
}
