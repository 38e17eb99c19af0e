//! # amp_sanitizer
//!
//! A tag-and-attribute whitelist sanitizer for AMP HTML.
//!
//! ## Overview
//!
//! `amp_sanitizer` walks a parsed HTML tree and keeps only what a rule
//! [`Catalogue`] permits. Each element is matched against the catalogue's
//! candidate specs for its tag name, checked for placement (parent, ancestors,
//! uniqueness) and has its attributes validated. Anything that does not
//! conform is reported as a [`ValidationError`] and, unless a
//! [`ValidationErrorCallback`] says otherwise, removed:
//!
//! - disallowed attributes are dropped one by one,
//! - disallowed elements are replaced by their children when their content is
//!   worth keeping, or deleted with their subtree otherwise,
//! - processing instructions are deleted.
//!
//! Running the sanitizer over its own output changes nothing and reports
//! nothing.
//!
//! ## Quick start
//!
//! ```rust
//! use amp_sanitizer::{Catalogue, ErrorCode, sanitize_fragment};
//!
//! let (html, output) = sanitize_fragment(
//!     r#"<a href="/x" style="color:red" onclick="f()">text</a>"#,
//!     Catalogue::builtin(),
//! );
//! assert_eq!(html, r#"<a href="/x">text</a>"#);
//! assert_eq!(
//!     output.error_codes(),
//!     vec![ErrorCode::InvalidAttribute, ErrorCode::InvalidAttribute]
//! );
//! ```
//!
//! For finer control (document scope, dev mode, a decision callback) use
//! [`TagAndAttributeSanitizer::builder`] with a tree from [`dom`].

pub mod config;
pub mod error;
pub mod sanitizer;
pub mod spec;
pub mod validation;

pub use config::SanitizerBuilder;
pub use error::{AmpSanitizerError, Result};
pub use sanitizer::{SanitizeOutput, ScriptRef, TagAndAttributeSanitizer, dom};
pub use spec::{
    AttrSpec, Catalogue, ChildTagSpec, DEV_MODE_ATTRIBUTE, DispatchKey, DispatchKind,
    ReferencePoint, TagSpec, UrlSpec,
};
pub use validation::{
    AcceptableErrors, AlwaysSanitize, ErrorCode, ErrorType, ReportedError, ValidationError,
    ValidationErrorCallback, ValidationSummary,
};

/// Sanitize an HTML fragment with default settings, returning the sanitized
/// markup and the pass output.
pub fn sanitize_fragment(fragment: &str, catalogue: &Catalogue) -> (String, SanitizeOutput) {
    let mut html = dom::parse_fragment(fragment);
    let output = TagAndAttributeSanitizer::builder(catalogue)
        .build()
        .sanitize(&mut html);
    (dom::fragment_html(&html), output)
}

/// Sanitize a complete document, `<html>` element included.
pub fn sanitize_document(document: &str, catalogue: &Catalogue) -> (String, SanitizeOutput) {
    let mut html = dom::parse_document(document);
    let output = TagAndAttributeSanitizer::builder(catalogue)
        .use_document_element(true)
        .build()
        .sanitize(&mut html);
    (dom::document_html(&html), output)
}
