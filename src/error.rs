//! Error types for the `amp_sanitizer` crate.
//!
//! Only loading a rule catalogue can fail. A sanitization pass never returns an
//! error: every non-conformance is reported as a
//! [`ValidationError`](crate::ValidationError) instead.

/// All errors that can occur while building or loading sanitizer inputs.
#[derive(Debug, thiserror::Error)]
pub enum AmpSanitizerError {
    /// The catalogue is structurally inconsistent.
    #[error("Catalogue error: {0}")]
    Catalogue(String),

    /// An attribute value pattern in the catalogue failed to compile.
    #[error("Invalid regex for <{tag}> attribute `{attr}`: {source}")]
    InvalidRegex {
        tag: String,
        attr: String,
        #[source]
        source: regex::Error,
    },

    /// The catalogue file could not be read.
    #[error("Catalogue I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The catalogue JSON could not be decoded.
    #[error("Catalogue JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// A type alias for `Result<T, AmpSanitizerError>`.
pub type Result<T> = std::result::Result<T, AmpSanitizerError>;
