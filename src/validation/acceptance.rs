//! Caller-declared policy for which validation errors may be sanitized.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{ErrorCode, ValidationError, ValidationErrorCallback};
use crate::error::Result;

/// Acceptance rule for one error code.
#[derive(Debug, Clone, PartialEq)]
enum Rule {
    /// Every error with the code is acceptable.
    All,
    /// Only errors whose serialized record contains one of these subsets.
    Matching(Vec<Value>),
}

/// A [`ValidationErrorCallback`] that sanitizes only acceptable errors.
///
/// Errors are matched by code. A code can be accepted outright, or only
/// for records that contain a sparse JSON subset, e.g. every
/// `invalid_attribute` error whose `node_name` is `onclick`. Errors that
/// match no rule get the fallback decision (`false` unless changed).
///
/// ```
/// use amp_sanitizer::{AcceptableErrors, ErrorCode};
/// use serde_json::json;
///
/// let policy = AcceptableErrors::new()
///     .accept_all(ErrorCode::InvalidElement)
///     .accept_matching(ErrorCode::InvalidAttribute, json!({ "node_name": "onclick" }));
/// # let _ = policy;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptableErrors {
    rules: BTreeMap<String, Rule>,
    fallback: bool,
}

impl AcceptableErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a policy of the form `{ "<code>": true | [subset, ...] }`.
    ///
    /// `false` entries are ignored; a code listed with an empty array accepts
    /// nothing.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, AcceptValue> = serde_json::from_str(json)?;
        let mut policy = Self::new();
        for (code, value) in raw {
            match value {
                AcceptValue::Flag(true) => {
                    policy.rules.insert(code, Rule::All);
                }
                AcceptValue::Flag(false) => {}
                AcceptValue::Subsets(subsets) => {
                    policy.rules.insert(code, Rule::Matching(subsets));
                }
            }
        }
        Ok(policy)
    }

    /// Accept every error with `code`.
    pub fn accept_all(mut self, code: ErrorCode) -> Self {
        self.rules.insert(code.as_str().to_string(), Rule::All);
        self
    }

    /// Accept errors with `code` whose record contains `subset`.
    pub fn accept_matching(mut self, code: ErrorCode, subset: Value) -> Self {
        let rule = self
            .rules
            .entry(code.as_str().to_string())
            .or_insert_with(|| Rule::Matching(Vec::new()));
        if let Rule::Matching(subsets) = rule {
            subsets.push(subset);
        }
        self
    }

    /// Decision for errors that match no rule.
    pub fn fallback(mut self, sanitize: bool) -> Self {
        self.fallback = sanitize;
        self
    }

    /// Whether `error` is covered by an acceptance rule.
    pub fn accepts(&self, error: &ValidationError) -> bool {
        match self.rules.get(error.code.as_str()) {
            None => false,
            Some(Rule::All) => true,
            Some(Rule::Matching(subsets)) => {
                let Ok(record) = serde_json::to_value(error) else {
                    return false;
                };
                subsets.iter().any(|subset| is_subset(subset, &record))
            }
        }
    }
}

impl ValidationErrorCallback for AcceptableErrors {
    fn decide(&mut self, error: &ValidationError) -> bool {
        self.accepts(error) || self.fallback
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum AcceptValue {
    Flag(bool),
    Subsets(Vec<Value>),
}

/// Recursive containment: every key of an object subset must be present with
/// a contained value; every item of an array subset must be contained in some
/// item of the superset array; scalars compare by equality.
fn is_subset(subset: &Value, superset: &Value) -> bool {
    match (subset, superset) {
        (Value::Object(sub), Value::Object(sup)) => sub
            .iter()
            .all(|(key, value)| sup.get(key).is_some_and(|other| is_subset(value, other))),
        (Value::Array(sub), Value::Array(sup)) => sub
            .iter()
            .all(|item| sup.iter().any(|other| is_subset(item, other))),
        _ => subset == superset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn onclick_error() -> ValidationError {
        ValidationError::attribute(
            ErrorCode::InvalidAttribute,
            "onclick",
            "a",
            [("onclick".to_string(), "f()".to_string())].into(),
        )
    }

    #[test]
    fn subset_matching_is_recursive() {
        let record = json!({
            "code": "invalid_attribute",
            "element_attributes": { "href": "/x", "onclick": "f()" }
        });
        assert!(is_subset(&json!({ "element_attributes": { "href": "/x" } }), &record));
        assert!(!is_subset(&json!({ "element_attributes": { "href": "/y" } }), &record));
        assert!(!is_subset(&json!({ "missing": 1 }), &record));
        assert!(is_subset(&json!({}), &record));
    }

    #[test]
    fn array_subsets() {
        assert!(is_subset(&json!([1, 3]), &json!([1, 2, 3])));
        assert!(!is_subset(&json!([4]), &json!([1, 2, 3])));
    }

    #[test]
    fn accept_all_by_code() {
        let mut policy = AcceptableErrors::new().accept_all(ErrorCode::InvalidAttribute);
        assert!(policy.decide(&onclick_error()));
    }

    #[test]
    fn unmatched_errors_use_fallback() {
        let mut strict = AcceptableErrors::new().accept_all(ErrorCode::InvalidElement);
        assert!(!strict.decide(&onclick_error()));
        let mut lenient = strict.clone().fallback(true);
        assert!(lenient.decide(&onclick_error()));
    }

    #[test]
    fn sparse_subset_rule() {
        let policy = AcceptableErrors::new()
            .accept_matching(ErrorCode::InvalidAttribute, json!({ "node_name": "style" }))
            .accept_matching(ErrorCode::InvalidAttribute, json!({ "parent_name": "a" }));
        assert!(policy.accepts(&onclick_error()));

        let narrow = AcceptableErrors::new()
            .accept_matching(ErrorCode::InvalidAttribute, json!({ "node_name": "style" }));
        assert!(!narrow.accepts(&onclick_error()));
    }

    #[test]
    fn parses_json_policy() {
        let policy = AcceptableErrors::from_json(
            r#"{ "invalid_element": true,
                 "duplicate_element": false,
                 "invalid_attribute": [ { "node_name": "onclick", "type": "js_error" } ] }"#,
        )
        .unwrap();
        assert!(policy.accepts(&onclick_error()));
        let duplicate = ValidationError::element(
            ErrorCode::DuplicateElement,
            "meta",
            Some("head".into()),
            BTreeMap::new(),
        );
        assert!(!policy.accepts(&duplicate));
    }

    #[test]
    fn rejects_malformed_policy() {
        assert!(AcceptableErrors::from_json(r#"{ "invalid_element": 3 }"#).is_err());
    }
}
