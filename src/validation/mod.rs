//! Validation error records and the decision protocol that governs them.
//!
//! Every non-conformance found during a pass becomes a [`ValidationError`],
//! which is offered to a [`ValidationErrorCallback`] before anything is
//! mutated. The callback's answer decides whether the node or attribute is
//! actually removed.
//!
//! Two ready-made helpers sit on top of the protocol:
//!
//! - [`AcceptableErrors`] -- a callback that sanitizes only the errors a
//!   caller has declared acceptable.
//! - [`ValidationSummary`] -- counts of removed elements and attributes.

mod acceptance;
mod summary;

pub use acceptance::AcceptableErrors;
pub use summary::ValidationSummary;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static ASSET_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&])ver=[^&#]*").expect("valid regex"));

/// Kind of non-conformance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// Tag not permitted under any matching spec, or structurally disqualified.
    InvalidElement,
    /// Attribute not permitted, fails a value rule, or a mandatory one is missing.
    InvalidAttribute,
    /// A uniqueness constraint was violated.
    DuplicateElement,
    /// Non-markup instructions (`<?php ... ?>`) inside the document.
    InvalidProcessingInstruction,
}

impl ErrorCode {
    /// Wire name, e.g. `invalid_element`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidElement => "invalid_element",
            Self::InvalidAttribute => "invalid_attribute",
            Self::DuplicateElement => "duplicate_element",
            Self::InvalidProcessingInstruction => "invalid_processing_instruction",
        }
    }

    /// Reader-friendly title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::InvalidElement => "Invalid element",
            Self::InvalidAttribute => "Invalid attribute",
            Self::DuplicateElement => "Duplicate element",
            Self::InvalidProcessingInstruction => "Invalid processing instruction",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of the offending node, derived from its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    HtmlElementError,
    HtmlAttributeError,
    JsError,
    CssError,
}

impl ErrorType {
    /// Type of an error raised against an element named `node_name`.
    pub fn for_element(node_name: &str) -> Self {
        match node_name {
            "script" => Self::JsError,
            "style" => Self::CssError,
            _ => Self::HtmlElementError,
        }
    }

    /// Type of an error raised against an attribute named `attr_name`.
    /// Event handlers (`on` followed by word characters) are JS errors.
    pub fn for_attribute(attr_name: &str) -> Self {
        let is_handler = attr_name.strip_prefix("on").is_some_and(|rest| {
            !rest.is_empty() && rest.chars().all(|c| c.is_alphanumeric() || c == '_')
        });
        if is_handler {
            Self::JsError
        } else {
            Self::HtmlAttributeError
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HtmlElementError => "HTML (Element)",
            Self::HtmlAttributeError => "HTML (Attribute)",
            Self::JsError => "JS",
            Self::CssError => "CSS",
        })
    }
}

/// A record of one detected non-conformance.
///
/// Element errors carry `node_attributes`, attribute errors carry
/// `element_attributes` (the owning element's attributes when the error was
/// detected). Absent fields are omitted from the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: ErrorCode,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub node_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_attributes: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_attributes: Option<BTreeMap<String, String>>,
    /// Inline script source, or the body of a processing instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ValidationError {
    /// An error raised against a whole element.
    pub fn element(
        code: ErrorCode,
        node_name: impl Into<String>,
        parent_name: Option<String>,
        mut attributes: BTreeMap<String, String>,
    ) -> Self {
        let node_name = node_name.into();
        let versioned = match node_name.as_str() {
            "script" => Some("src"),
            "link" => Some("href"),
            _ => None,
        };
        if let Some(value) = versioned.and_then(|name| attributes.get_mut(name)) {
            *value = normalize_asset_version(value);
        }
        Self {
            code,
            error_type: ErrorType::for_element(&node_name),
            node_name,
            parent_name,
            node_attributes: Some(attributes),
            element_attributes: None,
            text: None,
        }
    }

    /// An error raised against one attribute of an element.
    pub fn attribute(
        code: ErrorCode,
        attr_name: impl Into<String>,
        parent_name: impl Into<String>,
        element_attributes: BTreeMap<String, String>,
    ) -> Self {
        let attr_name = attr_name.into();
        Self {
            code,
            error_type: ErrorType::for_attribute(&attr_name),
            node_name: attr_name,
            parent_name: Some(parent_name.into()),
            node_attributes: None,
            element_attributes: Some(element_attributes),
            text: None,
        }
    }

    /// An error raised against a processing instruction with the given target.
    pub fn processing_instruction(
        target: impl Into<String>,
        parent_name: Option<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            code: ErrorCode::InvalidProcessingInstruction,
            error_type: ErrorType::HtmlElementError,
            node_name: target.into(),
            parent_name,
            node_attributes: None,
            element_attributes: None,
            text: Some(body.into()),
        }
    }

    /// Attach inline text (e.g. an inline script body).
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Whether this record concerns an attribute rather than an element.
    pub fn is_attribute_error(&self) -> bool {
        self.element_attributes.is_some()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.title(), self.node_name)?;
        if let Some(parent) = &self.parent_name {
            write!(f, " (in <{parent}>)")?;
        }
        Ok(())
    }
}

/// Replace a `ver=` query value so records stay stable across asset releases.
fn normalize_asset_version(url: &str) -> String {
    ASSET_VERSION
        .replace_all(url, "${1}ver=__normalized__")
        .into_owned()
}

/// Decides whether a reported violation is actually sanitized.
///
/// Returning `true` lets the mutation proceed; `false` keeps the node or
/// attribute in place. Either way the error is recorded in the pass output.
///
/// Any `FnMut(&ValidationError) -> bool` closure is a callback.
pub trait ValidationErrorCallback {
    fn decide(&mut self, error: &ValidationError) -> bool;
}

impl<F> ValidationErrorCallback for F
where
    F: FnMut(&ValidationError) -> bool,
{
    fn decide(&mut self, error: &ValidationError) -> bool {
        self(error)
    }
}

/// The default callback: every violation is sanitized.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSanitize;

impl ValidationErrorCallback for AlwaysSanitize {
    fn decide(&mut self, _error: &ValidationError) -> bool {
        true
    }
}

/// A validation error together with the callback's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    #[serde(flatten)]
    pub error: ValidationError,
    /// Whether the offending node or attribute was removed.
    pub sanitized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn element_type_follows_tag_identity() {
        assert_eq!(ErrorType::for_element("script"), ErrorType::JsError);
        assert_eq!(ErrorType::for_element("style"), ErrorType::CssError);
        assert_eq!(ErrorType::for_element("blink"), ErrorType::HtmlElementError);
    }

    #[test]
    fn event_handlers_are_js_errors() {
        assert_eq!(ErrorType::for_attribute("onclick"), ErrorType::JsError);
        assert_eq!(ErrorType::for_attribute("on_load"), ErrorType::JsError);
        assert_eq!(ErrorType::for_attribute("on"), ErrorType::HtmlAttributeError);
        assert_eq!(ErrorType::for_attribute("on-x"), ErrorType::HtmlAttributeError);
        assert_eq!(ErrorType::for_attribute("style"), ErrorType::HtmlAttributeError);
    }

    #[test]
    fn script_src_version_is_normalized() {
        let err = ValidationError::element(
            ErrorCode::InvalidElement,
            "script",
            Some("body".into()),
            attrs(&[("src", "https://example.com/app.js?ver=5.2.1&x=1")]),
        );
        assert_eq!(
            err.node_attributes.unwrap()["src"],
            "https://example.com/app.js?ver=__normalized__&x=1"
        );
    }

    #[test]
    fn other_elements_keep_version_parameter() {
        let err = ValidationError::element(
            ErrorCode::InvalidElement,
            "img",
            None,
            attrs(&[("src", "/a.png?ver=3")]),
        );
        assert_eq!(err.node_attributes.unwrap()["src"], "/a.png?ver=3");
    }

    #[test]
    fn attribute_error_wire_shape() {
        let err = ValidationError::attribute(
            ErrorCode::InvalidAttribute,
            "onclick",
            "a",
            attrs(&[("href", "/x"), ("onclick", "f()")]),
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": "invalid_attribute",
                "type": "js_error",
                "node_name": "onclick",
                "parent_name": "a",
                "element_attributes": { "href": "/x", "onclick": "f()" }
            })
        );
    }

    #[test]
    fn reported_error_flattens_record() {
        let reported = ReportedError {
            error: ValidationError::processing_instruction("php", Some("body".into()), "echo 1;"),
            sanitized: true,
        };
        let json = serde_json::to_value(&reported).unwrap();
        assert_eq!(json["code"], "invalid_processing_instruction");
        assert_eq!(json["node_name"], "php");
        assert_eq!(json["sanitized"], true);
    }

    #[test]
    fn labels() {
        assert_eq!(ErrorCode::DuplicateElement.to_string(), "duplicate_element");
        assert_eq!(ErrorCode::InvalidElement.title(), "Invalid element");
        assert_eq!(ErrorType::HtmlAttributeError.to_string(), "HTML (Attribute)");
        assert_eq!(ErrorType::JsError.to_string(), "JS");
    }

    #[test]
    fn closures_are_callbacks() {
        let mut seen = 0;
        let mut callback = |_: &ValidationError| {
            seen += 1;
            false
        };
        let err =
            ValidationError::element(ErrorCode::InvalidElement, "blink", None, BTreeMap::new());
        assert!(!callback.decide(&err));
        assert!(AlwaysSanitize.decide(&err));
        assert_eq!(seen, 1);
    }
}
