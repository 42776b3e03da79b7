use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use searchcake_http::{Clock, Connection, Method};
use tokio::task::JoinHandle;

use crate::{ClusterNodes, DiscoveryError, DiscoveryStatistics};

pub const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(300);
pub static NODES_PATH: &str = "/_cluster/nodes";

/// Learns the cluster's membership from the cluster itself.
///
/// Each tick requests the node list through the connection and adds the HTTP
/// address of every member to the connection's server pool. A failing tick
/// leaves the pool untouched and never stops future ticks.
///
/// This is cheap to clone.
pub struct DiscoveryLoop<C: Connection> {
    connection: Arc<C>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    cluster_name: Arc<RwLock<Option<String>>>,
    statistics: DiscoveryStatistics,
}

impl<C: Connection> Clone for DiscoveryLoop<C> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            clock: self.clock.clone(),
            interval: self.interval,
            cluster_name: self.cluster_name.clone(),
            statistics: self.statistics.clone(),
        }
    }
}

impl<C: Connection> DiscoveryLoop<C> {
    /// Creates a new discovery loop which ticks every `interval` once started.
    pub fn new(connection: Arc<C>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            connection,
            clock,
            interval,
            cluster_name: Arc::new(RwLock::new(None)),
            statistics: DiscoveryStatistics::default(),
        }
    }

    #[inline]
    /// The name of the cluster, once it has been learned.
    pub fn cluster_name(&self) -> Option<String> {
        self.cluster_name.read().clone()
    }

    #[inline]
    /// Gets the live discovery statistics.
    pub fn statistics(&self) -> DiscoveryStatistics {
        self.statistics.clone()
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Requests the cluster node list, recording the cluster name.
    pub async fn fetch_nodes(&self) -> Result<ClusterNodes, DiscoveryError> {
        let body = self
            .connection
            .execute(Method::GET, NODES_PATH, None, None)
            .await?;
        let nodes: ClusterNodes = serde_json::from_value(body)?;

        *self.cluster_name.write() = Some(nodes.cluster_name.clone());

        Ok(nodes)
    }

    /// Learns only the cluster name, without changing the server pool.
    ///
    /// This is what a client which has discovery disabled does once at start up.
    pub async fn fetch_cluster_name(&self) -> Result<String, DiscoveryError> {
        let nodes = self.fetch_nodes().await?;
        Ok(nodes.cluster_name)
    }

    /// Runs a single round of discovery.
    ///
    /// Returns the number of servers which were new to the server pool.
    pub async fn tick(&self) -> Result<usize, DiscoveryError> {
        let result = self.fetch_nodes().await;
        self.statistics.num_ticks.fetch_add(1, Ordering::Relaxed);

        let nodes = result.map_err(|e| {
            self.statistics
                .num_failed_ticks
                .fetch_add(1, Ordering::Relaxed);
            e
        })?;

        let mut num_added = 0;
        for addr in nodes.http_addresses() {
            match self.connection.add_server(addr) {
                Ok(true) => num_added += 1,
                Ok(false) => {},
                Err(e) => {
                    warn!(error = ?e, server = addr, "Ignoring invalid node address.");
                },
            }
        }

        self.statistics
            .num_servers_added
            .fetch_add(num_added as u64, Ordering::Relaxed);

        debug!(
            cluster_name = %nodes.cluster_name,
            num_nodes = nodes.nodes.len(),
            num_added = num_added,
            "Discovery tick complete."
        );

        Ok(num_added)
    }

    /// Starts running discovery in the background.
    ///
    /// The first tick runs immediately, each following tick runs `interval`
    /// after the previous one completed.
    pub fn start(self) -> DiscoveryHandle {
        let kill_switch = Arc::new(AtomicBool::new(false));
        let cluster_name = self.cluster_name.clone();
        let statistics = self.statistics.clone();

        let task = tokio::spawn(run_discovery_loop(self, kill_switch.clone()));

        DiscoveryHandle {
            kill_switch,
            cluster_name,
            statistics,
            task: Arc::new(task),
        }
    }
}

#[derive(Clone)]
/// A handle to the running discovery loop.
///
/// This handle is cheap to clone.
pub struct DiscoveryHandle {
    kill_switch: Arc<AtomicBool>,
    cluster_name: Arc<RwLock<Option<String>>>,
    statistics: DiscoveryStatistics,
    task: Arc<JoinHandle<()>>,
}

impl DiscoveryHandle {
    /// Stops the discovery loop.
    pub fn kill(&self) {
        self.kill_switch.store(true, Ordering::Relaxed);
        self.task.abort();
    }

    /// Returns true once the loop has stopped running.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    #[inline]
    /// The name of the cluster, once it has been learned.
    pub fn cluster_name(&self) -> Option<String> {
        self.cluster_name.read().clone()
    }

    #[inline]
    /// Gets the live discovery statistics.
    pub fn statistics(&self) -> DiscoveryStatistics {
        self.statistics.clone()
    }
}

async fn run_discovery_loop<C: Connection>(
    discovery: DiscoveryLoop<C>,
    kill_switch: Arc<AtomicBool>,
) {
    info!(interval = ?discovery.interval, "Cluster discovery is running.");

    loop {
        if kill_switch.load(Ordering::Relaxed) {
            break;
        }

        if let Err(e) = discovery.tick().await {
            error!(
                error = ?e,
                "Failed to discover cluster nodes. The server pool is left unchanged until the next tick.",
            );
        }

        discovery.clock.sleep(discovery.interval).await;
    }

    debug!("Cluster discovery has stopped.");
}
