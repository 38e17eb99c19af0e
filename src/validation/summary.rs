//! Aggregate counts over a pass's validation errors.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{ErrorCode, ValidationError};

/// Removed elements and attributes, counted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub removed_elements: BTreeMap<String, usize>,
    pub removed_attributes: BTreeMap<String, usize>,
}

impl ValidationSummary {
    /// Count `invalid_element` and `invalid_attribute` errors. An
    /// `invalid_attribute` error raised against a whole element (a missing
    /// mandatory attribute) counts as a removed element.
    pub fn from_errors<'a>(errors: impl IntoIterator<Item = &'a ValidationError>) -> Self {
        let mut summary = Self::default();
        for error in errors {
            let bucket = match error.code {
                ErrorCode::InvalidAttribute if error.is_attribute_error() => {
                    &mut summary.removed_attributes
                }
                ErrorCode::InvalidElement | ErrorCode::InvalidAttribute => {
                    &mut summary.removed_elements
                }
                _ => continue,
            };
            *bucket.entry(error.node_name.clone()).or_default() += 1;
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.removed_elements.is_empty() && self.removed_attributes.is_empty()
    }
}
