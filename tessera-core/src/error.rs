//! Error types for the content model
//!
//! Every public operation reports failure through [`Error`]. The variants
//! follow the failure classes a caller has to tell apart: broken structure,
//! double initialisation, dangling ids, absent payloads, unknown formats and
//! cooperative cancellation.

use crate::factory::QualifiedName;
use thiserror::Error;

/// Errors produced by the content model
#[derive(Error, Debug)]
pub enum Error {
    /// Tree cycles, duplicate insertion or ids, out-of-range indices
    #[error("structural error: {0}")]
    Structural(String),

    /// Something that may only be set once was set again
    #[error("already initialized: {0}")]
    AlreadyInitialized(String),

    /// An id did not resolve, or a stack/mapping query came up empty
    #[error("not found: {0}")]
    NotFound(String),

    /// A referenced payload is absent or unreadable
    #[error("missing data for {id}: {reason}")]
    MissingData { id: String, reason: String },

    /// An entity kind that the registry cannot construct
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A long-running operation observed its cancel flag
    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("embedded payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Error::Structural(message.into())
    }

    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        Error::NotFound(what.to_string())
    }

    pub(crate) fn missing_data(id: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Error::MissingData {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(name: &QualifiedName) -> Self {
        Error::UnsupportedFormat(name.to_string())
    }

    /// Whether the document stays usable after this error
    ///
    /// Missing payloads, failed lookups and cancellation leave the graph
    /// untouched; the other variants abort whatever operation raised them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MissingData { .. } | Error::NotFound(_) | Error::Cancelled
        )
    }
}
