//! Centralized error types for vectordb
//!
//! This module provides a unified error handling approach using thiserror.
//! Every fallible core operation returns [`Result`]; the HTTP facade maps
//! each variant to a status code and nothing is retried inside the core.

use thiserror::Error;

/// Main error type for vectordb operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    /// A referenced id does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Request is structurally invalid (missing field, value out of range)
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Embedding length differs from the library's fixed dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Search attempted on a library with no current index
    #[error("Library {library_id} is not indexed")]
    NotIndexed { library_id: String },

    /// Unknown value for index_type
    #[error("Unsupported index type: {value}")]
    UnsupportedIndexType { value: String },

    /// Concurrent structural operation in progress
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Unexpected condition: invariant violation, non-finite stored data
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VectorDbError {
    /// Create a not-found error for a library id
    pub fn library_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "library",
            id: id.to_string(),
        }
    }

    /// Create a not-found error for a document id
    pub fn document_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "document",
            id: id.to_string(),
        }
    }

    /// Create a not-found error for a chunk id
    pub fn chunk_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "chunk",
            id: id.to_string(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-indexed error
    pub fn not_indexed(library_id: impl ToString) -> Self {
        Self::NotIndexed {
            library_id: library_id.to_string(),
        }
    }

    /// Create an unsupported-index-type error
    pub fn unsupported_index_type(value: impl Into<String>) -> Self {
        Self::UnsupportedIndexType {
            value: value.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable kind, used in HTTP error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::NotIndexed { .. } => "not_indexed",
            Self::UnsupportedIndexType { .. } => "unsupported_index_type",
            Self::Conflict { .. } => "conflict",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for vectordb operations
pub type Result<T> = std::result::Result<T, VectorDbError>;
