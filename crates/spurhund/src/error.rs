//! Error types for Spurhund.
//!
//! All fallible operations return [`SpurhundError`]. Classification and release never
//! fail outward, so only ingestion, configuration loading and the spool backend
//! produce errors.
//!
//! # Error Handling Philosophy
//!
//! **System errors MUST always bubble up unchanged:**
//! - `SpurhundError::Io` (from `std::io::Error`) - spool directory and config file errors
//!
//! **Ingestion errors carry enough context to diagnose without retrying:**
//! - `Transport` - the remote fetch did not complete; carries the target and cause
//! - `EmptyResponse` - the fetch succeeded but returned zero bytes
//! - `MalformedInline` - a `data:` descriptor could not be parsed
//! - `Decoding` - an inline payload could not be turned into bytes
//! - `Rejected` - the target failed the allow-list before any request was made
//!
//! # Example
//!
//! ```rust
//! use spurhund::{SpurhundError, Result};
//!
//! fn require_comma(input: &str) -> Result<usize> {
//!     input
//!         .find(',')
//!         .ok_or_else(|| SpurhundError::malformed_inline(format!("missing ',' in {input}")))
//! }
//!
//! assert!(require_comma("data:text/plain").is_err());
//! ```
use thiserror::Error;

/// Result type alias using `SpurhundError`.
pub type Result<T> = std::result::Result<T, SpurhundError>;

/// Main error type for all Spurhund operations.
#[derive(Debug, Error)]
pub enum SpurhundError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch of '{target}' failed: {message}")]
    Transport {
        target: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Fetch of '{target}' returned no bytes")]
    EmptyResponse { target: String },

    #[error("Target '{target}' is not permitted by the allow-list")]
    Rejected { target: String },

    #[error("Malformed inline descriptor: {message}")]
    MalformedInline { message: String },

    #[error("Decoding error: {message}")]
    Decoding {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for SpurhundError {
    fn from(err: serde_json::Error) -> Self {
        SpurhundError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<base64::DecodeError> for SpurhundError {
    fn from(err: base64::DecodeError) -> Self {
        SpurhundError::Decoding {
            message: format!("invalid base64 payload: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl SpurhundError {
    error_constructor!(decoding, Decoding);
    error_constructor!(validation, Validation);

    /// Create a Transport error for `target`.
    pub fn transport<T: Into<String>, S: Into<String>>(target: T, message: S) -> Self {
        Self::Transport {
            target: target.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a Transport error for `target` that keeps the underlying cause.
    pub fn transport_with_source<T, S, E>(target: T, message: S, source: E) -> Self
    where
        T: Into<String>,
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            target: target.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a MalformedInline error.
    pub fn malformed_inline<S: Into<String>>(message: S) -> Self {
        Self::MalformedInline {
            message: message.into(),
        }
    }

    /// The source identifier this error refers to, when it has one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Transport { target, .. } | Self::EmptyResponse { target } | Self::Rejected { target } => {
                Some(target)
            }
            _ => None,
        }
    }
}
