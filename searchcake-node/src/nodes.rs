use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
/// The response of the cluster node list endpoint.
pub struct ClusterNodes {
    pub cluster_name: String,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeInfo>,
}

impl ClusterNodes {
    /// The `host:port` HTTP address of every node which advertises one.
    pub fn http_addresses(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .values()
            .filter_map(|node| node.http_address.as_deref())
            .filter_map(parse_http_address)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
/// A single member of the cluster.
pub struct NodeInfo {
    #[serde(default)]
    pub name: Option<String>,
    /// The advertised HTTP address, formatted as `inet[/host:port]`.
    ///
    /// Nodes which do not serve HTTP omit this.
    #[serde(default)]
    pub http_address: Option<String>,
}

/// Extracts the `host:port` part of an advertised node address.
///
/// Addresses are advertised wrapped as `inet[/host:port]`, optionally with a
/// hostname before the slash (`inet[node-1/10.0.0.5:9200]`), in which case the
/// resolved address after the slash is used. Unwrapped addresses are returned
/// as is.
pub fn parse_http_address(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let inner = raw
        .strip_prefix("inet[")
        .and_then(|addr| addr.strip_suffix(']'))
        .unwrap_or(raw);

    let addr = match inner.rsplit_once('/') {
        Some((_, addr)) => addr,
        None => inner,
    };

    if addr.is_empty() {
        None
    } else {
        Some(addr)
    }
}
