use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use searchcake_http::{Connection, Method, RequestBody, Value};

use crate::{BulkError, BulkStatistics, OperationKind, PendingOperation};

pub const DEFAULT_BULK_SIZE: usize = 400;
pub static BULK_PATH: &str = "/_bulk";

#[derive(Default)]
struct BufferState {
    lines: Vec<String>,
    num_operations: usize,
}

/// Accumulates document mutations and sends them as `_bulk` requests.
///
/// Staging never sends anything by itself, a request is only made by
/// [BulkBuffer::flush_if_full] once `bulk_size` operations are buffered,
/// or by [BulkBuffer::force_flush].
///
/// The buffer is captured and reset before the request is sent, operations
/// staged while a flush is in flight go into the next batch.
///
/// Every mutation bumps a dirty generation. A refresh only covers the
/// mutations made before it started, so it marks the buffer refreshed up to
/// the generation it observed and later writes keep the buffer dirty.
pub struct BulkBuffer<C: Connection> {
    connection: Arc<C>,
    bulk_size: usize,
    state: Mutex<BufferState>,
    dirty_generation: AtomicU64,
    refreshed_generation: AtomicU64,
    statistics: BulkStatistics,
}

impl<C: Connection> BulkBuffer<C> {
    /// Creates a new, empty buffer flushing every `bulk_size` operations.
    pub fn new(connection: Arc<C>, bulk_size: usize) -> Self {
        Self {
            connection,
            bulk_size,
            state: Mutex::new(BufferState::default()),
            dirty_generation: AtomicU64::new(0),
            refreshed_generation: AtomicU64::new(0),
            statistics: BulkStatistics::default(),
        }
    }

    #[inline]
    pub fn bulk_size(&self) -> usize {
        self.bulk_size
    }

    #[inline]
    /// The number of operations currently buffered.
    pub fn len(&self) -> usize {
        self.state.lock().num_operations
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    /// Gets the live bulk statistics.
    pub fn statistics(&self) -> BulkStatistics {
        self.statistics.clone()
    }

    /// Returns false once a write has been staged and not yet refreshed.
    pub fn is_refreshed(&self) -> bool {
        self.refreshed_generation.load(Ordering::Acquire)
            >= self.dirty_generation.load(Ordering::Acquire)
    }

    #[inline]
    /// The generation of the latest mutation.
    pub fn dirty_generation(&self) -> u64 {
        self.dirty_generation.load(Ordering::Acquire)
    }

    /// Marks all writes made so far as visible to searches.
    pub fn mark_refreshed(&self) {
        self.mark_refreshed_if(self.dirty_generation());
    }

    /// Marks the writes up to and including `generation` as visible to searches.
    ///
    /// Mutations made after `generation` was observed keep the buffer dirty.
    pub fn mark_refreshed_if(&self, generation: u64) {
        self.refreshed_generation.fetch_max(generation, Ordering::AcqRel);
    }

    /// Marks the index as having writes which are not yet visible to searches.
    pub fn mark_dirty(&self) {
        self.dirty_generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Stages an index or create operation.
    pub fn stage_index(&self, op: PendingOperation) -> Result<(), BulkError> {
        if op.kind == OperationKind::Delete {
            return Err(BulkError::UnexpectedKind {
                expected: "index or create",
                got: op.kind,
            });
        }
        self.stage(op)
    }

    /// Stages a delete operation.
    pub fn stage_delete(&self, op: PendingOperation) -> Result<(), BulkError> {
        if op.kind != OperationKind::Delete {
            return Err(BulkError::UnexpectedKind {
                expected: "delete",
                got: op.kind,
            });
        }
        self.stage(op)
    }

    fn stage(&self, op: PendingOperation) -> Result<(), BulkError> {
        let lines = op.to_lines()?;

        {
            let mut state = self.state.lock();
            state.lines.extend(lines);
            state.num_operations += 1;
        }

        self.mark_dirty();
        self.statistics.num_staged.fetch_add(1, Ordering::Relaxed);

        trace!(
            kind = %op.kind,
            index = %op.index,
            doc_type = %op.doc_type,
            "Staged bulk operation."
        );

        Ok(())
    }

    /// Flushes the buffer if it holds at least `bulk_size` operations, or if `forced`.
    ///
    /// Returns the decoded bulk response if a request was sent.
    pub async fn flush_if_full(&self, forced: bool) -> Result<Option<Value>, BulkError> {
        if !forced && self.len() < self.bulk_size {
            return Ok(None);
        }
        self.force_flush().await
    }

    /// Sends every buffered operation as a single `_bulk` request.
    ///
    /// An empty buffer sends nothing and returns `None`. The response is
    /// returned as is, per item failures are left for the caller to inspect.
    pub async fn force_flush(&self) -> Result<Option<Value>, BulkError> {
        let (lines, num_operations) = {
            let mut state = self.state.lock();
            let taken = mem::take(&mut *state);
            (taken.lines, taken.num_operations)
        };

        if lines.is_empty() {
            return Ok(None);
        }

        let mut body = lines.join("\n");
        body.push('\n');

        self.statistics.num_flushes.fetch_add(1, Ordering::Relaxed);
        self.statistics
            .num_operations_sent
            .fetch_add(num_operations as u64, Ordering::Relaxed);

        debug!(num_operations = num_operations, "Flushing bulk buffer.");

        let result = self
            .connection
            .execute(Method::POST, BULK_PATH, Some(RequestBody::Raw(body)), None)
            .await;

        match result {
            Ok(response) => Ok(Some(response)),
            Err(e) => {
                self.statistics
                    .num_failed_flushes
                    .fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = ?e,
                    num_operations = num_operations,
                    "Bulk request failed, the flushed operations have been dropped.",
                );
                Err(BulkError::Request(e))
            },
        }
    }
}
