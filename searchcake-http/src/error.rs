use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
/// The error returned by every operation issued through a connection.
pub enum EsError {
    #[error("No server is available to handle the request.")]
    /// Every server in the pool is either unknown or currently marked dead.
    NoServerAvailable,

    #[error("Transport error: {0}")]
    /// The connection was refused, interrupted or returned a malformed response.
    Transport(String),

    #[error("The request did not complete within the timeout ({0:?}).")]
    /// The request exceeded the connection level timeout.
    Timeout(Duration),

    #[error("Invalid server address: {0:?}")]
    InvalidAddress(String),

    #[error("Invalid parameter: {0}")]
    /// A caller supplied argument was rejected before any request was made.
    InvalidParameter(String),

    #[error("Failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    /// The search engine processed the request and reported an error.
    Engine(#[from] EngineError),
}

impl EsError {
    pub(crate) fn transport(e: impl Display) -> Self {
        Self::Transport(e.to_string())
    }

    /// The decoded search engine error, if this is one.
    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            Self::Engine(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the failure happened at the network level.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        self.engine().map(EngineError::is_not_found).unwrap_or(false)
    }

    pub fn is_already_exists(&self) -> bool {
        self.engine()
            .map(EngineError::is_already_exists)
            .unwrap_or(false)
    }

    pub fn is_index_missing(&self) -> bool {
        self.engine()
            .map(EngineError::is_index_missing)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} (status {status}): {message}")]
/// An error reported by the search engine in a `{status, error}` response body.
pub struct EngineError {
    /// The classified kind of the error.
    pub kind: EngineErrorKind,
    /// The display message for the error.
    pub message: String,
    /// The HTTP status code of the response.
    pub status: u16,
    /// The full decoded response body.
    pub body: Value,
}

impl EngineError {
    pub fn new(
        kind: EngineErrorKind,
        message: impl Into<String>,
        status: u16,
        body: Value,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
            body,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == EngineErrorKind::NotFound
    }

    /// Returns true for both the generic and index specific already exists errors.
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self.kind,
            EngineErrorKind::AlreadyExists | EngineErrorKind::IndexAlreadyExists
        )
    }

    pub fn is_index_missing(&self) -> bool {
        self.kind == EngineErrorKind::IndexMissing
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
/// The kind of error reported by the search engine.
pub enum EngineErrorKind {
    IllegalArgument,
    IndexMissing,
    NotFound,
    AlreadyExists,
    IndexAlreadyExists,
    SearchPhaseExecution,
    ReplicationShardOperationFailed,
    ClusterBlock,
    MapperParsing,
    /// The error could not be matched to a more specific kind.
    Generic,
}

impl EngineErrorKind {
    /// Looks up the kind from the exception class name the engine reports.
    pub fn from_class_name(name: &str) -> Option<Self> {
        let kind = match name {
            "ElasticSearchIllegalArgumentException" => Self::IllegalArgument,
            "IndexMissingException" => Self::IndexMissing,
            "NotFoundException" => Self::NotFound,
            "AlreadyExistsException" => Self::AlreadyExists,
            "IndexAlreadyExistsException" => Self::IndexAlreadyExists,
            "SearchPhaseExecutionException" => Self::SearchPhaseExecution,
            "ReplicationShardOperationFailedException" => {
                Self::ReplicationShardOperationFailed
            },
            "ClusterBlockException" => Self::ClusterBlock,
            "MapperParsingException" => Self::MapperParsing,
            "ElasticSearchException" => Self::Generic,
            _ => return None,
        };

        Some(kind)
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            Self::IllegalArgument => "ElasticSearchIllegalArgumentException",
            Self::IndexMissing => "IndexMissingException",
            Self::NotFound => "NotFoundException",
            Self::AlreadyExists => "AlreadyExistsException",
            Self::IndexAlreadyExists => "IndexAlreadyExistsException",
            Self::SearchPhaseExecution => "SearchPhaseExecutionException",
            Self::ReplicationShardOperationFailed => {
                "ReplicationShardOperationFailedException"
            },
            Self::ClusterBlock => "ClusterBlockException",
            Self::MapperParsing => "MapperParsingException",
            Self::Generic => "ElasticSearchException",
        }
    }
}

impl Display for EngineErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.class_name())
    }
}

static TRAILING_PATTERNS: &[(&str, EngineErrorKind)] = &[
    ("] missing", EngineErrorKind::NotFound),
    ("] Already exists", EngineErrorKind::AlreadyExists),
];

/// Maps a decoded response into either the successful body or a typed engine error.
///
/// Any status below `400` is a success. Otherwise the `error` field of the body
/// is inspected, a leading `ClassName[...]` segment selects the error kind and
/// failing that a known trailing pattern does. Everything else is reported as
/// [EngineErrorKind::Generic].
pub fn classify(status: u16, body: Value) -> Result<Value, EngineError> {
    if status < 400 {
        return Ok(body);
    }

    let is_ok = body.get("ok").map(is_truthy).unwrap_or(false);
    if status == 404 && is_ok {
        return Err(EngineError::new(
            EngineErrorKind::NotFound,
            "Item not found",
            status,
            body,
        ));
    }

    let error = match body.as_object().and_then(|obj| obj.get("error")) {
        None => {
            return Err(EngineError::new(
                EngineErrorKind::Generic,
                "Unknown exception type",
                status,
                body,
            ))
        },
        Some(Value::String(error)) => error.clone(),
        Some(other) => other.to_string(),
    };

    if let Some((class_name, rest)) = error.split_once('[') {
        if let Some(kind) = EngineErrorKind::from_class_name(class_name) {
            let message = rest.trim_end_matches(']');
            return Err(EngineError::new(kind, message, status, body));
        }
    }

    for (pattern, kind) in TRAILING_PATTERNS {
        if error.ends_with(pattern) {
            return Err(EngineError::new(*kind, error, status, body));
        }
    }

    Err(EngineError::new(
        EngineErrorKind::Generic,
        error,
        status,
        body,
    ))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn classify_err(status: u16, body: Value) -> EngineError {
        classify(status, body).expect_err("Response should be classified as an error")
    }

    #[test]
    fn test_success_statuses() {
        let body = json!({"ok": true, "_id": "1"});
        assert_eq!(classify(200, body.clone()).unwrap(), body);
        assert_eq!(classify(201, body.clone()).unwrap(), body);
        assert_eq!(classify(399, Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_leading_class_name() {
        let err = classify_err(
            404,
            json!({"status": 404, "error": "IndexMissingException[[tweets] missing]"}),
        );
        assert_eq!(err.kind, EngineErrorKind::IndexMissing);
        assert_eq!(err.message, "[tweets] missing");
        assert_eq!(err.status, 404);

        let err = classify_err(
            400,
            json!({"status": 400, "error": "IndexAlreadyExistsException[[tweets] Already exists]"}),
        );
        assert_eq!(err.kind, EngineErrorKind::IndexAlreadyExists);
        assert!(err.is_already_exists());
        assert_eq!(err.message, "[tweets] Already exists");
    }

    #[test]
    fn test_trailing_patterns() {
        let err = classify_err(
            404,
            json!({"error": "[tweets][1] missing"}),
        );
        assert_eq!(err.kind, EngineErrorKind::NotFound);
        assert_eq!(err.message, "[tweets][1] missing");

        let err = classify_err(
            409,
            json!({"error": "Unknown[[tweets] Already exists"}),
        );
        assert_eq!(err.kind, EngineErrorKind::AlreadyExists);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_with_ok_body() {
        let body = json!({"ok": true, "found": false});
        let err = classify_err(404, body.clone());
        assert_eq!(err.kind, EngineErrorKind::NotFound);
        assert_eq!(err.message, "Item not found");
        assert_eq!(err.body, body);
    }

    #[test]
    fn test_unknown_shapes() {
        let err = classify_err(500, json!(["not", "an", "object"]));
        assert_eq!(err.kind, EngineErrorKind::Generic);
        assert_eq!(err.message, "Unknown exception type");

        let err = classify_err(500, json!({"status": 500}));
        assert_eq!(err.kind, EngineErrorKind::Generic);

        let err = classify_err(503, json!({"error": "something bad happened"}));
        assert_eq!(err.kind, EngineErrorKind::Generic);
        assert_eq!(err.message, "something bad happened");
        assert_eq!(err.status, 503);

        let err = classify_err(400, json!({"error": {"type": "parsing_exception"}}));
        assert_eq!(err.kind, EngineErrorKind::Generic);
        assert_eq!(err.message, r#"{"type":"parsing_exception"}"#);
    }

    #[test]
    fn test_class_names_round_trip() {
        for kind in [
            EngineErrorKind::IllegalArgument,
            EngineErrorKind::IndexMissing,
            EngineErrorKind::NotFound,
            EngineErrorKind::AlreadyExists,
            EngineErrorKind::IndexAlreadyExists,
            EngineErrorKind::SearchPhaseExecution,
            EngineErrorKind::ReplicationShardOperationFailed,
            EngineErrorKind::ClusterBlock,
            EngineErrorKind::MapperParsing,
            EngineErrorKind::Generic,
        ] {
            assert_eq!(EngineErrorKind::from_class_name(kind.class_name()), Some(kind));
        }
    }
}
