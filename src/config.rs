//! Builder for configuring a [`TagAndAttributeSanitizer`].

use crate::sanitizer::TagAndAttributeSanitizer;
use crate::spec::Catalogue;
use crate::validation::{AlwaysSanitize, ValidationErrorCallback};

/// Builder for configuring a [`TagAndAttributeSanitizer`].
///
/// Provides a fluent API for the pass scope, dev mode, empty-parent pruning
/// and the validation error callback.
///
/// # Example
///
/// ```rust
/// use amp_sanitizer::{Catalogue, ErrorCode, SanitizerBuilder, ValidationError};
///
/// let sanitizer = SanitizerBuilder::new(Catalogue::builtin())
///     .use_document_element(true)
///     .remove_empty_parents(false)
///     .validation_error_callback(|error: &ValidationError| {
///         error.code != ErrorCode::DuplicateElement
///     })
///     .build();
/// # let _ = sanitizer;
/// ```
pub struct SanitizerBuilder<'a> {
    catalogue: &'a Catalogue,
    use_document_element: bool,
    dev_mode: bool,
    remove_empty_parents: bool,
    callback: Option<Box<dyn ValidationErrorCallback + 'a>>,
}

impl<'a> SanitizerBuilder<'a> {
    /// Create a new builder for `catalogue` with sensible defaults.
    ///
    /// Defaults: body subtree only, dev mode detected from the document,
    /// empty parents pruned, every violation sanitized.
    pub fn new(catalogue: &'a Catalogue) -> Self {
        Self {
            catalogue,
            use_document_element: false,
            dev_mode: false,
            remove_empty_parents: true,
            callback: None,
        }
    }

    /// Sanitize `<html>` and everything below it instead of just `<body>`.
    pub fn use_document_element(mut self, enabled: bool) -> Self {
        self.use_document_element = enabled;
        self
    }

    /// Force dev mode. Otherwise the document is in dev mode when its
    /// `<html>` element carries `data-ampdevmode`.
    pub fn dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    /// Prune ancestors left with no children and no attributes after an
    /// element is removed.
    pub fn remove_empty_parents(mut self, enabled: bool) -> Self {
        self.remove_empty_parents = enabled;
        self
    }

    /// Decide per violation whether it is sanitized.
    pub fn validation_error_callback(
        mut self,
        callback: impl ValidationErrorCallback + 'a,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Consume the builder and return the configured sanitizer.
    pub fn build(self) -> TagAndAttributeSanitizer<'a> {
        TagAndAttributeSanitizer {
            catalogue: self.catalogue,
            use_document_element: self.use_document_element,
            dev_mode: self.dev_mode,
            remove_empty_parents: self.remove_empty_parents,
            callback: self.callback.unwrap_or_else(|| Box::new(AlwaysSanitize)),
        }
    }
}
