use std::convert::Infallible;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, StatusCode};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
/// A request received by the [MockSearchServer].
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl ReceivedRequest {
    /// Decodes the request body as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone)]
struct Route {
    method: String,
    path: String,
    status: u16,
    body: Value,
    delay: Option<Duration>,
}

#[derive(Default)]
struct MockState {
    routes: RwLock<Vec<Route>>,
    requests: Mutex<Vec<ReceivedRequest>>,
}

impl MockState {
    fn find_route(&self, method: &str, path: &str) -> Option<Route> {
        self.routes
            .read()
            .iter()
            .rev()
            .find(|route| route.method == method && route.path == path)
            .cloned()
    }
}

/// A scripted search engine node speaking JSON over HTTP/1.1.
///
/// Routes are matched on method and path, the most recently added route wins.
/// Unknown routes reply `200 {"ok": true}`. Every request is recorded.
pub struct MockSearchServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockSearchServer {
    /// Binds to a free local port and starts serving requests.
    pub async fn start() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let state = Arc::new(MockState::default());
        let service_state = state.clone();
        let make_service = make_service_fn(move |_| {
            let state = service_state.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    handle_request(req, state.clone())
                }))
            }
        });

        let server = hyper::Server::from_tcp(listener)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
            .serve(make_service);

        let handle = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::error!(error = ?e, "Mock server failed to handle requests.");
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    #[inline]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The `host:port` address of the server.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Replies to `method path` with the given status and JSON body.
    pub fn route(&self, method: &str, path: &str, status: u16, body: Value) {
        self.add_route(method, path, status, body, None);
    }

    /// Replies to `method path` after waiting for `delay`.
    pub fn route_with_delay(
        &self,
        method: &str,
        path: &str,
        delay: Duration,
        body: Value,
    ) {
        self.add_route(method, path, 200, body, Some(delay));
    }

    fn add_route(
        &self,
        method: &str,
        path: &str,
        status: u16,
        body: Value,
        delay: Option<Duration>,
    ) {
        self.state.routes.write().push(Route {
            method: method.to_uppercase(),
            path: path.to_string(),
            status,
            body,
            delay,
        });
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.state.requests.lock().clone()
    }

    /// All requests received so far for the given path.
    pub fn requests_to(&self, path: &str) -> Vec<ReceivedRequest> {
        self.requests()
            .into_iter()
            .filter(|req| req.path == path)
            .collect()
    }

    /// Stops the server.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for MockSearchServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(
    req: Request<Body>,
    state: Arc<MockState>,
) -> Result<Response<Body>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = hyper::body::to_bytes(body).await.unwrap_or_default();

    let received = ReceivedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(ToString::to_string),
        content_type: parts
            .headers
            .get(hyper::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let route = state.find_route(&received.method, &received.path);
    state.requests.lock().push(received);

    let (status, body) = match route {
        None => (200, json!({"ok": true})),
        Some(route) => {
            if let Some(delay) = route.delay {
                tokio::time::sleep(delay).await;
            }
            (route.status, route.body)
        },
    };

    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() =
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    Ok(response)
}
