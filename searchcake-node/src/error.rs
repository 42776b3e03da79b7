use searchcake_http::EsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to request the cluster node list: {0}")]
    /// The node list request itself failed.
    Request(#[from] EsError),

    #[error("The cluster node list could not be decoded: {0}")]
    /// The node list did not have the expected `{cluster_name, nodes}` shape.
    InvalidResponse(#[from] serde_json::Error),
}
