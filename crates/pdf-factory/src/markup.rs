//! Paragraph text escaping
//!
//! Paragraph text is stored escaped, the way markup-aware paragraph engines
//! expect it, and unescaped again when laid out. No tags are interpreted, so
//! `<b>` in the input appears literally in the document.

use std::borrow::Cow;

/// Escape `& < > " '`
pub fn escape(text: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(text)
}

/// Reverse [`escape`], decoding any HTML entity
pub fn unescape(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}
