//! # Searchcake
//! An asynchronous, cluster aware client for HTTP document search engines.
//!
//! This is a convenience package which brings the sub-crates together behind a
//! single [Client]:
//!
//! - `searchcake_http` - The connection, server pool with dead server tracking and error classification.
//! - `searchcake_node` - Continuous discovery of the cluster members.
//! - `searchcake_bulk` - Batching of index and delete operations into bulk requests.
//!
//! ```rust,ignore
//! use searchcake::{ClientBuilder, PendingOperation};
//! use serde_json::json;
//!
//! let client = ClientBuilder::new(["127.0.0.1:9200"])
//!     .with_bulk_size(100)
//!     .connect()
//!     .await?;
//!
//! client
//!     .bulk_index(PendingOperation::index("tweets", "tweet", json!({"text": "hello"})))
//!     .await?;
//! client.refresh(&["tweets"]).await?;
//!
//! let hits = client
//!     .search(json!({"query": {"match_all": {}}}), &["tweets"], &[])
//!     .await?;
//! ```

#[macro_use]
extern crate tracing;

mod builder;
mod client;
mod options;
mod utils;

pub use builder::{ClientBuilder, ClientConfig, DEFAULT_INDEX, DEFAULT_REFRESH_WAIT};
pub use client::Client;
pub use options::{
    AliasAction,
    AliasCommand,
    ClusterStateFilters,
    HealthLevel,
    HealthOptions,
    HealthStatus,
    IndexInfo,
    OptimizeOptions,
    ServerInfo,
    DEFAULT_HEALTH_TIMEOUT,
};
pub use searchcake_bulk::{BulkStatistics, OperationKind, PendingOperation};
#[cfg(feature = "test-utils")]
pub use searchcake_http::ManualClock;
pub use searchcake_http::{
    Clock,
    Connection,
    ConnectionConfig,
    EngineError,
    EngineErrorKind,
    EsError,
    HttpConnection,
    Method,
    Params,
    RequestBody,
    ServerSnapshot,
    SystemClock,
    Value,
};
pub use searchcake_node::DiscoveryStatistics;
pub use utils::make_path;
pub use {searchcake_bulk as bulk, searchcake_http as http, searchcake_node as node};
