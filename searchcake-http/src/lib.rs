//! # Searchcake HTTP
//! The connection layer used by the searchcake client.
//!
//! A [Connection] owns a [ServerPool] of cluster node addresses and dispatches
//! JSON requests to one randomly selected, healthy node. Errors reported by the
//! search engine are decoded and classified into an [EsError].
//!
//! ```rust,ignore
//! use searchcake_http::{Connection, ConnectionConfig, HttpConnection, Method};
//!
//! let connection = HttpConnection::connect(ConnectionConfig::new(["127.0.0.1:9200"]))?;
//! let health = connection
//!     .execute(Method::GET, "/_cluster/health", None, None)
//!     .await?;
//! ```

#[macro_use]
extern crate tracing;

mod address;
mod clock;
mod connection;
mod error;
mod net;
mod pool;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use address::Address;
pub use async_trait::async_trait;
#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use connection::{Connection, Params, RequestBody};
pub use error::{classify, EngineError, EngineErrorKind, EsError};
pub use http::Method;
pub use net::{ConnectionConfig, HttpConnection, DEFAULT_RETRY_TIME};
pub use pool::{ServerPool, ServerSnapshot};
pub use serde_json::Value;
