//! # Mapper Errors
//!
//! This module defines the error type shared by every layer of the mapper.
//! Serializer contract violations (missing keys, wrong shapes, identity
//! mismatches) are always fatal to the current call. A remote "not found" is
//! not an error on `find`; it only surfaces as [`MapperError::NotFound`] where
//! a value is mandatory, such as `reload`.

/// Convenience alias used throughout the crate.
pub type Result<T, E = MapperError> = std::result::Result<T, E>;

/// Errors that can occur while fetching, extracting or resolving entities.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("No key {key} in json response")]
    MissingKey { key: String },

    #[error("Key {key} should be {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("No id included in {key} json data")]
    MissingIdentifier { key: String },

    #[error("Tried to find {type_name} with id {expected}, but got {type_name} with id {actual}")]
    IdentityMismatch {
        type_name: String,
        expected: String,
        actual: String,
    },

    #[error("{type_name} not found: {id}")]
    NotFound { type_name: String, id: String },

    #[error("Transport failure during {operation} of {target} (status {status})")]
    TransportFailure {
        operation: &'static str,
        target: String,
        status: u16,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{type_name} has no field {field}")]
    UnknownField { type_name: String, field: String },

    #[error("{type_name} has no relationship {name}")]
    UnknownRelationship { type_name: String, name: String },

    #[error("No schema registered for type {0}")]
    UnknownType(String),

    #[error("Relationship {name} is not a {expected} relationship")]
    CardinalityMismatch { name: String, expected: &'static str },

    #[error("{0} is not persisted")]
    NotPersisted(String),

    #[error("{0} has no origin response")]
    MissingOrigin(String),

    #[error("No {kind} registered under {name}")]
    NotRegistered { kind: &'static str, name: String },

    #[error("No default format selected")]
    NoDefaultFormat,

    #[error("Invalid options for {kind}: {message}")]
    InvalidOptions { kind: String, message: String },

    #[error("Custom error: {0}")]
    Custom(String),
}

impl MapperError {
    /// True for the shape and identity violations raised by serializers.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload(_)
                | Self::MissingKey { .. }
                | Self::TypeMismatch { .. }
                | Self::MissingIdentifier { .. }
                | Self::IdentityMismatch { .. }
        )
    }
}
