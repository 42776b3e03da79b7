//! In-memory helpers for testing code built on top of a [Connection].

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use http::Method;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::{Connection, EngineError, EsError, Params, RequestBody};

#[derive(Debug, Clone, PartialEq)]
/// A request which was executed against a [RecordingConnection].
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<RequestBody>,
    pub params: Option<Params>,
}

impl RecordedRequest {
    /// The raw body, if the request was sent with one.
    pub fn raw_body(&self) -> Option<&str> {
        match self.body.as_ref()? {
            RequestBody::Raw(raw) => Some(raw.as_str()),
            RequestBody::Json(_) => None,
        }
    }

    /// The JSON body, if the request was sent with one.
    pub fn json_body(&self) -> Option<&Value> {
        match self.body.as_ref()? {
            RequestBody::Json(value) => Some(value),
            RequestBody::Raw(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
/// A scripted reply for a [RecordingConnection].
pub enum MockReply {
    Ok(Value),
    Engine(EngineError),
    Transport(String),
}

impl MockReply {
    fn into_result(self) -> Result<Value, EsError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Engine(e) => Err(EsError::Engine(e)),
            Self::Transport(msg) => Err(EsError::Transport(msg)),
        }
    }
}

#[derive(Default)]
/// A [Connection] which records every request and replies from a script.
///
/// Replies are looked up by path first, then taken from the reply queue, and
/// finally default to `{"ok": true}`.
pub struct RecordingConnection {
    servers: Mutex<Vec<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
    routes: Mutex<BTreeMap<String, MockReply>>,
    queue: Mutex<VecDeque<MockReply>>,
    closed: AtomicBool,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always reply to requests for `path` with `reply`.
    pub fn route(&self, path: impl Into<String>, reply: MockReply) {
        self.routes.lock().insert(path.into(), reply);
    }

    /// Reply to the next un-routed request with `reply`.
    pub fn push_reply(&self, reply: MockReply) {
        self.queue.lock().push_back(reply);
    }

    /// All requests executed so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// All requests executed so far against the given path.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|req| req.path == path)
            .cloned()
            .collect()
    }

    /// The servers which have been added to the connection.
    pub fn servers(&self) -> Vec<String> {
        self.servers.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    fn add_server(&self, server: &str) -> Result<bool, EsError> {
        let mut servers = self.servers.lock();
        if servers.iter().any(|s| s == server) {
            return Ok(false);
        }
        servers.push(server.to_string());
        Ok(true)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        params: Option<&Params>,
    ) -> Result<Value, EsError> {
        self.requests.lock().push(RecordedRequest {
            method,
            path: path.to_string(),
            body,
            params: params.cloned(),
        });

        let routed = self.routes.lock().get(path).cloned();
        if let Some(reply) = routed {
            return reply.into_result();
        }

        let queued = self.queue.lock().pop_front();
        match queued {
            Some(reply) => reply.into_result(),
            None => Ok(json!({"ok": true})),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}
