mod utils;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{Method, Request};
use hyper::client::HttpConnector;
use hyper::{Body, Client};
use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    classify,
    Address,
    Clock,
    Connection,
    EsError,
    Params,
    RequestBody,
    ServerPool,
    ServerSnapshot,
    SystemClock,
};

/// The default cooldown applied to a server after it is marked as dead.
pub const DEFAULT_RETRY_TIME: Duration = Duration::from_secs(10);
pub static DEFAULT_SERVER: &str = "127.0.0.1:9200";

#[derive(Debug, Clone)]
/// Configuration for the connection to the cluster.
pub struct ConnectionConfig {
    /// The initial set of servers to send requests to.
    ///
    /// More servers may be learned later on via discovery.
    pub servers: Vec<String>,

    /// The maximum time a single request may take, including reading the response.
    ///
    /// No timeout is applied when this is `None`.
    pub timeout: Option<Duration>,

    /// The time a server is excluded from selection after being marked dead.
    pub retry_time: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            servers: vec![DEFAULT_SERVER.to_string()],
            timeout: None,
            retry_time: DEFAULT_RETRY_TIME,
        }
    }
}

impl ConnectionConfig {
    /// Creates a new connection config with the given seed servers.
    pub fn new(servers: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            servers: servers
                .into_iter()
                .map(|server| server.as_ref().to_string())
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_time(mut self, retry_time: Duration) -> Self {
        self.retry_time = retry_time;
        self
    }
}

/// A JSON over HTTP/1.1 connection to the cluster.
///
/// Each request is sent to a single server drawn at random from the pool.
pub struct HttpConnection {
    client: Client<HttpConnector, Body>,
    pool: Mutex<ServerPool>,
    timeout: Option<Duration>,
    closed: AtomicBool,
}

impl HttpConnection {
    /// Creates a new connection using the runtime clock.
    pub fn connect(cfg: ConnectionConfig) -> Result<Self, EsError> {
        Self::connect_with_clock(cfg, Arc::new(SystemClock))
    }

    /// Creates a new connection using the provided clock for server cooldowns.
    pub fn connect_with_clock(
        cfg: ConnectionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EsError> {
        let mut pool = ServerPool::new(cfg.retry_time, clock);
        for server in cfg.servers.iter() {
            pool.add(Address::new(server.as_str())?);
        }

        info!(
            servers = %cfg.servers.join(", "),
            timeout = ?cfg.timeout,
            retry_time = ?cfg.retry_time,
            "Created cluster connection."
        );

        Ok(Self {
            client: Client::new(),
            pool: Mutex::new(pool),
            timeout: cfg.timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Marks a server as dead, excluding it from selection for the retry time.
    ///
    /// Returns false if the server was not live.
    pub fn mark_dead(&self, server: &Address) -> bool {
        self.pool.lock().mark_dead(server)
    }

    /// A snapshot of the live and dead servers.
    pub fn servers(&self) -> ServerSnapshot {
        self.pool.lock().snapshot()
    }

    async fn send(&self, request: Request<Body>) -> Result<(u16, Value), EsError> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(EsError::transport)?;

        let status = response.status().as_u16();
        let body = utils::read_body(response.into_body())
            .await
            .map_err(EsError::transport)?;

        Ok((status, utils::decode_json(&body)?))
    }
}

#[async_trait]
impl Connection for HttpConnection {
    fn add_server(&self, server: &str) -> Result<bool, EsError> {
        let addr = Address::new(server)?;
        Ok(self.pool.lock().add(addr))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        params: Option<&Params>,
    ) -> Result<Value, EsError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(EsError::Transport("connection closed".to_string()));
        }

        let server = self.pool.lock().select()?;
        let uri = utils::build_uri(&server, path, params)?;

        trace!(server = %server, method = %method, uri = %uri, "Dispatching request.");

        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            None => Body::empty(),
            Some(body) => {
                builder = builder.header(CONTENT_TYPE, body.content_type());
                Body::from(body.into_bytes()?)
            },
        };
        let request = builder.body(body).map_err(EsError::transport)?;

        let (status, value) = match self.timeout {
            None => self.send(request).await?,
            Some(timeout) => tokio::time::timeout(timeout, self.send(request))
                .await
                .map_err(|_| EsError::Timeout(timeout))??,
        };

        classify(status, value).map_err(|e| {
            debug!(server = %server, status = status, error = %e, "Request failed.");
            EsError::Engine(e)
        })
    }

    async fn close(&self) {
        info!("Closing cluster connection.");
        self.closed.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    #[test]
    fn test_connect_seeds_pool() {
        let cfg = ConnectionConfig::new(["a:9200", "b:9200", "a:9200"]);
        let connection = HttpConnection::connect_with_clock(cfg, Arc::new(ManualClock::new()))
            .expect("Create connection.");

        let snapshot = connection.servers();
        assert_eq!(snapshot.live.len(), 2);
        assert!(snapshot.dead.is_empty());
    }

    #[test]
    fn test_connect_rejects_empty_server() {
        let cfg = ConnectionConfig::new(["a:9200", ""]);
        let result = HttpConnection::connect_with_clock(cfg, Arc::new(ManualClock::new()));
        assert!(matches!(result, Err(EsError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_no_server_available_without_network() {
        let cfg = ConnectionConfig::new(Vec::<String>::new());
        let connection = HttpConnection::connect_with_clock(cfg, Arc::new(ManualClock::new()))
            .expect("Create connection.");

        let result = connection.execute(Method::GET, "/", None, None).await;
        assert!(matches!(result, Err(EsError::NoServerAvailable)));
    }

    #[tokio::test]
    async fn test_add_and_mark_dead() {
        let clock = ManualClock::new();
        let cfg = ConnectionConfig::new(["a:9200"]);
        let connection = HttpConnection::connect_with_clock(cfg, Arc::new(clock.clone()))
            .expect("Create connection.");

        assert!(connection.add_server("b:9200").unwrap());
        assert!(!connection.add_server("b:9200").unwrap());
        assert!(connection.add_server(" ").is_err());

        let a = Address::new("a:9200").unwrap();
        assert!(connection.mark_dead(&a));

        let snapshot = connection.servers();
        assert_eq!(snapshot.live, vec![Address::new("b:9200").unwrap()]);
        assert_eq!(snapshot.dead, vec![a]);
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_requests() {
        let connection = HttpConnection::connect(ConnectionConfig::default())
            .expect("Create connection.");
        connection.close().await;

        let result = connection.execute(Method::GET, "/", None, None).await;
        assert!(matches!(result, Err(EsError::Transport(_))));
    }
}
