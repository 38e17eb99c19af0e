//! Attribute rules within a tag specification.

use regex::Regex;
use serde::Deserialize;

/// One rule for one attribute name within a [`TagSpec`](crate::TagSpec).
///
/// An attribute passes only if every configured constraint is satisfied.
/// Absence of a non-mandatory attribute is always valid.
#[derive(Debug, Clone, Default)]
pub struct AttrSpec {
    /// The attribute must be present on the element.
    pub mandatory: bool,
    /// Exact allowed values. Empty means any value.
    pub value_enum: Vec<String>,
    /// Compare against `value_enum` case-insensitively.
    pub value_casei: bool,
    /// Whole-value pattern, case-sensitive.
    pub value_regex: Option<Regex>,
    /// Whole-value pattern, case-insensitive.
    pub value_regex_casei: Option<Regex>,
    /// Case-insensitive blacklist searched anywhere in the value.
    pub disallowed_value_regex: Option<Regex>,
    /// The value must be a URL acceptable under these rules.
    pub value_url: Option<UrlSpec>,
    /// At least one attribute of this group must be present.
    pub mandatory_anyof: Option<String>,
    /// Exactly one attribute of this group must be present.
    pub mandatory_oneof: Option<String>,
    /// Other attributes that must be present alongside this one.
    pub requires_presence_of: Vec<String>,
}

/// URL acceptance rules for an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlSpec {
    /// Lowercase schemes accepted for absolute URLs.
    pub allowed_protocols: Vec<String>,
    pub allow_relative: bool,
    pub allow_empty: bool,
}

impl Default for UrlSpec {
    fn default() -> Self {
        Self {
            allowed_protocols: vec!["http".into(), "https".into()],
            allow_relative: true,
            allow_empty: false,
        }
    }
}

/// Compile a whole-value pattern.
pub(crate) fn anchored(pattern: &str, casei: bool) -> Result<Regex, regex::Error> {
    if casei {
        Regex::new(&format!("(?i)^(?:{pattern})$"))
    } else {
        Regex::new(&format!("^(?:{pattern})$"))
    }
}

/// Compile a blacklist pattern, matched anywhere in the value.
pub(crate) fn search_casei(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i){pattern}"))
}
