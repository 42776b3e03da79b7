use std::fmt::Display;

use async_trait::async_trait;
use http::Method;
use serde_json::Value;

use crate::EsError;

#[async_trait]
/// The contract every connection implementation must satisfy.
///
/// This is the only surface the higher level client operations are permitted
/// to use: adding servers, executing a request and closing the connection.
pub trait Connection: Send + Sync + 'static {
    /// Adds a single server to the server pool.
    ///
    /// Returns `true` if the server was not already known, adding a known
    /// server is a no-op.
    fn add_server(&self, server: &str) -> Result<bool, EsError>;

    /// Performs `method` on `path` against one server of the pool.
    ///
    /// The body is encoded as JSON (or sent verbatim for raw bodies) and
    /// the parameters are appended to the path as a query string. The decoded
    /// response body is returned for any status below `400`, anything else is
    /// classified into an [EsError].
    ///
    /// A failed request is never retried against a different server and never
    /// marks the server as dead, that is left to the caller.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        params: Option<&Params>,
    ) -> Result<Value, EsError>;

    /// Closes the connection, any further requests will fail.
    async fn close(&self);
}

#[derive(Debug, Clone, PartialEq)]
/// The body of a request.
pub enum RequestBody {
    /// A JSON document, serialized before sending.
    Json(Value),
    /// A pre-serialized body sent as is, e.g. newline delimited bulk commands.
    Raw(String),
}

impl RequestBody {
    pub(crate) fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => "application/json",
            Self::Raw(_) => "application/x-ndjson",
        }
    }

    pub(crate) fn into_bytes(self) -> Result<Vec<u8>, EsError> {
        match self {
            Self::Json(value) => Ok(serde_json::to_vec(&value)?),
            Self::Raw(raw) => Ok(raw.into_bytes()),
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// An ordered set of query string parameters.
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, returning the updated set.
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a parameter, replacing any existing value with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Display) {
        let key = key.into();
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == &key) {
            Some(existing) => existing.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the parameters as a percent encoded query string.
    pub fn to_query_string(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_query_string() {
        let params = Params::new()
            .with("refresh", true)
            .with("wait_for_status", "green")
            .with("q", "name:bob & co");
        assert_eq!(
            params.to_query_string(),
            "refresh=true&wait_for_status=green&q=name%3Abob%20%26%20co",
        );
    }

    #[test]
    fn test_insert_replaces() {
        let mut params = Params::from_iter([("level", "cluster")]);
        params.insert("level", "shards");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("level"), Some("shards"));
    }

    #[test]
    fn test_body_encoding() {
        let body = RequestBody::from(json!({"text": "hello"}));
        assert_eq!(body.content_type(), "application/json");
        assert_eq!(body.into_bytes().unwrap(), br#"{"text":"hello"}"#.to_vec());

        let body = RequestBody::Raw("line-1\nline-2\n".to_string());
        assert_eq!(body.content_type(), "application/x-ndjson");
        assert_eq!(body.into_bytes().unwrap(), b"line-1\nline-2\n".to_vec());
    }
}
