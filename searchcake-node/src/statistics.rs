use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live metrics around the discovery loop.
pub struct DiscoveryStatistics(Arc<DiscoveryStatisticsInner>);

impl Deref for DiscoveryStatistics {
    type Target = DiscoveryStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct DiscoveryStatisticsInner {
    /// The number of discovery ticks which have completed, successful or not.
    pub(crate) num_ticks: Counter,
    /// The number of discovery ticks which failed to fetch the node list.
    pub(crate) num_failed_ticks: Counter,
    /// The number of servers discovery added which the pool did not know yet.
    pub(crate) num_servers_added: Counter,
}

impl DiscoveryStatisticsInner {
    /// The number of discovery ticks which have completed, successful or not.
    pub fn num_ticks(&self) -> u64 {
        self.num_ticks.load(Ordering::Relaxed)
    }

    /// The number of discovery ticks which failed to fetch the node list.
    pub fn num_failed_ticks(&self) -> u64 {
        self.num_failed_ticks.load(Ordering::Relaxed)
    }

    /// The number of servers discovery added which the pool did not know yet.
    pub fn num_servers_added(&self) -> u64 {
        self.num_servers_added.load(Ordering::Relaxed)
    }
}
