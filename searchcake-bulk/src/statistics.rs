use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live metrics around the bulk buffer.
pub struct BulkStatistics(Arc<BulkStatisticsInner>);

impl Deref for BulkStatistics {
    type Target = BulkStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct BulkStatisticsInner {
    pub(crate) num_staged: Counter,
    pub(crate) num_flushes: Counter,
    pub(crate) num_failed_flushes: Counter,
    pub(crate) num_operations_sent: Counter,
}

impl BulkStatisticsInner {
    /// The number of operations staged into the buffer.
    pub fn num_staged(&self) -> u64 {
        self.num_staged.load(Ordering::Relaxed)
    }

    /// The number of bulk requests sent, successful or not.
    pub fn num_flushes(&self) -> u64 {
        self.num_flushes.load(Ordering::Relaxed)
    }

    /// The number of bulk requests which failed.
    ///
    /// The operations of a failed flush are dropped.
    pub fn num_failed_flushes(&self) -> u64 {
        self.num_failed_flushes.load(Ordering::Relaxed)
    }

    /// The number of operations which were part of a bulk request.
    pub fn num_operations_sent(&self) -> u64 {
        self.num_operations_sent.load(Ordering::Relaxed)
    }
}
