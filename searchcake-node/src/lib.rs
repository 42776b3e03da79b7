//! # Searchcake Node
//! Cluster membership discovery.
//!
//! The [DiscoveryLoop] periodically asks the cluster for its member list and
//! feeds every advertised HTTP address into the connection's server pool, so
//! requests spread over nodes which were never part of the initial config.

#[macro_use]
extern crate tracing;

mod discovery;
mod error;
mod nodes;
mod statistics;

pub use discovery::{
    DiscoveryHandle,
    DiscoveryLoop,
    DEFAULT_DISCOVERY_INTERVAL,
    NODES_PATH,
};
pub use error::DiscoveryError;
pub use nodes::{parse_http_address, ClusterNodes, NodeInfo};
pub use statistics::DiscoveryStatistics;
