use searchcake_http::EsError;
use thiserror::Error;

use crate::OperationKind;

#[derive(Debug, Error)]
pub enum BulkError {
    #[error("A {0} operation requires a document.")]
    /// An index or create operation was staged without a document.
    MissingDocument(OperationKind),

    #[error("A delete operation requires a document id.")]
    /// A delete operation was staged without an id.
    MissingId,

    #[error("Expected a {expected} operation, got {got}.")]
    /// The operation was staged through the wrong entry point.
    UnexpectedKind {
        expected: &'static str,
        got: OperationKind,
    },

    #[error("Failed to serialize operation: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bulk request failed: {0}")]
    /// The bulk request itself failed, the flushed operations are not retried.
    Request(#[from] EsError),
}

impl From<BulkError> for EsError {
    fn from(error: BulkError) -> Self {
        match error {
            BulkError::Request(e) => e,
            BulkError::Serialization(e) => EsError::Serialization(e),
            other => EsError::InvalidParameter(other.to_string()),
        }
    }
}
