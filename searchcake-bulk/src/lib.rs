//! # Searchcake Bulk
//! Client side batching of document mutations.
//!
//! Index, create and delete operations are staged into a [BulkBuffer] and sent
//! to the cluster as a single newline delimited `_bulk` request once the
//! buffer holds enough operations, or when a flush is forced.
//!
//! ```rust,ignore
//! use searchcake_bulk::{BulkBuffer, PendingOperation, DEFAULT_BULK_SIZE};
//!
//! let buffer = BulkBuffer::new(connection, DEFAULT_BULK_SIZE);
//! buffer.stage_index(PendingOperation::index("tweets", "tweet", doc))?;
//! buffer.flush_if_full(false).await?;
//! ```

#[macro_use]
extern crate tracing;

mod buffer;
mod error;
mod operation;
mod statistics;

pub use buffer::{BulkBuffer, BULK_PATH, DEFAULT_BULK_SIZE};
pub use error::BulkError;
pub use operation::{OperationKind, PendingOperation};
pub use statistics::BulkStatistics;
