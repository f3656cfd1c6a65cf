//! Parsing the HTML maker's output into a document.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref BACKTICK_FENCE: Regex =
        Regex::new(r"(?s)```(?:[A-Za-z]+)?\s*(.*?)```").expect("valid fence pattern");
    static ref QUOTE_FENCE: Regex =
        Regex::new(r"(?s)'''(?:[A-Za-z]+)?\s*(.*?)'''").expect("valid fence pattern");
    static ref LEADING_HTML_TOKEN: Regex =
        Regex::new(r"(?i)^\s*html\b\s*").expect("valid token pattern");
}

#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("generated HTML is empty")]
    Empty,
    #[error("generated text is not an HTML document (starts with {0:?})")]
    NotHtml(String),
}

/// Remove Markdown or triple-quote fences and a stray leading `html` token.
pub fn strip_code_fences(text: &str) -> String {
    let mut text = text.to_string();
    if let Some(inner) = BACKTICK_FENCE.captures(&text).and_then(|c| c.get(1)) {
        text = inner.as_str().to_string();
    }
    if let Some(inner) = QUOTE_FENCE.captures(&text).and_then(|c| c.get(1)) {
        text = inner.as_str().to_string();
    }
    LEADING_HTML_TOKEN.replace(&text, "").trim().to_string()
}

/// A complete HTML document, written to disk exactly as held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument(String);

impl HtmlDocument {
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let text = strip_code_fences(raw);
        if text.is_empty() {
            return Err(FormatError::Empty);
        }

        let head = text.get(..14).unwrap_or(&text).to_ascii_lowercase();
        if head.starts_with("<!doctype html") || head.starts_with("<html") {
            Ok(Self(text))
        } else {
            Err(FormatError::NotHtml(text.chars().take(40).collect()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
