//! Error types and result types for document store operations.
//!
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.
//! A record that does not exist is never an error: point lookups return `None`
//! and deletes of unknown ids are no-ops.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// A stored record could not be reconstructed as the requested attribute type.
    ///
    /// `path` names the offending location, e.g. `attributes` or
    /// `vehicles.attributes.quantity`.
    #[error("Decode error at `{path}`: {message}")]
    Decode { path: String, message: String },
    /// The attribute graph could not be structurally serialized.
    #[error("Encode error: {0}")]
    Encode(String),
    /// The underlying engine failed to read, write or delete.
    #[error("Store error: {0}")]
    Store(String),
    /// The index name collides with the reserved index keyword.
    #[error("Invalid index name: {0}")]
    InvalidIndexName(String),
    /// The named source does not exist in the engine.
    #[error("Source not found: {0}")]
    SourceNotFound(String),
}

impl DocumentStoreError {
    /// Creates a decode error for the given path.
    pub fn decode(path: impl Into<String>, message: impl ToString) -> Self {
        DocumentStoreError::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Returns the same error with `prefix.` prepended to a decode path.
    ///
    /// Other variants are returned unchanged.
    pub fn within(self, prefix: &str) -> Self {
        match self {
            DocumentStoreError::Decode { path, message } => DocumentStoreError::Decode {
                path: format!("{prefix}.{path}"),
                message,
            },
            other => other,
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Encode(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Encode(err.to_string())
    }
}

/// A single element of a multi-document operation that did not apply.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// Identifier of the element, or its position when no id could be read.
    pub id: String,
    /// Why the element was skipped.
    pub error: DocumentStoreError,
}

/// Outcome of a multi-document operation run inside one batch.
///
/// Elements are independent: a failed element is recorded here and the
/// remaining elements still apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Ids written or deleted, in the order they were issued.
    pub applied: Vec<String>,
    /// Elements skipped because of a per-element failure.
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    /// Returns `true` when every element applied.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn applied(&mut self, id: impl Into<String>) {
        self.applied.push(id.into());
    }

    pub(crate) fn failed(&mut self, id: impl Into<String>, error: DocumentStoreError) {
        self.failed.push(BatchFailure { id: id.into(), error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bson_errors_are_encode_errors() {
        let err: DocumentStoreError = bson::serialize_to_bson(&u64::MAX).unwrap_err().into();

        assert!(matches!(err, DocumentStoreError::Encode(_)));
    }

    #[test]
    fn test_within_prefixes_only_decode_paths() {
        assert_eq!(
            DocumentStoreError::decode("attributes", "bad").within("vehicles"),
            DocumentStoreError::decode("vehicles.attributes", "bad")
        );
        assert_eq!(
            DocumentStoreError::Store("down".into()).within("vehicles"),
            DocumentStoreError::Store("down".into())
        );
    }
}
