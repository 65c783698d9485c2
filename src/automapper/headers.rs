//! Header normalization

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static NON_ALPHA_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\sa-z]+").unwrap());

/// Lower-case and collapse whitespace runs into single spaces
pub fn to_lowercase_form(value: &str) -> String {
    WHITESPACE_REGEX
        .replace_all(&value.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Lowercase form restricted to letters and single spaces
pub fn to_stripped_form(value: &str) -> String {
    let lowercase = to_lowercase_form(value);
    let letters = NON_ALPHA_REGEX.replace_all(&lowercase, "");
    WHITESPACE_REGEX
        .replace_all(&letters, " ")
        .trim()
        .to_string()
}

/// Stripped form without spaces
pub fn to_final_form(value: &str) -> String {
    to_stripped_form(value).replace(' ', "")
}

/// A header with its precomputed comparison forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderEntry {
    pub original: String,
    pub lowercase: String,
    pub stripped: String,
    #[serde(rename = "final")]
    pub final_form: String,
    /// Excluded from further matching once set
    #[serde(skip)]
    pub is_mapped: bool,
}

impl HeaderEntry {
    pub fn new(original: impl Into<String>) -> Self {
        let original = original.into();
        let lowercase = to_lowercase_form(&original);
        let stripped = to_stripped_form(&original);
        let final_form = stripped.replace(' ', "");
        Self {
            original,
            lowercase,
            stripped,
            final_form,
            is_mapped: false,
        }
    }
}

/// Build the header table, keeping the first occurrence of duplicated headers
pub fn preprocess_headers<I, S>(headers: I) -> Vec<HeaderEntry>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut entries: Vec<HeaderEntry> = Vec::new();
    for header in headers {
        let header = header.into();
        if entries.iter().any(|entry| entry.original == header) {
            continue;
        }
        entries.push(HeaderEntry::new(header));
    }
    entries
}
