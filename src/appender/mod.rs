//! Per-metric chunk write path
//!
//! Every active metric owns a [`ChunkStore`] holding its current and previous
//! chunk. Samples are encoded into the chunks as they arrive and only the
//! unflushed tail of each chunk is sent to the store as a partial update.

use std::sync::Arc;

use crate::chunkenc::{self, ChunkEncoder, XorChunk};
use crate::client::{self, StoreClient};
use crate::partition::{self, PartitionResolver};

mod cache;
mod chunk_buffer;
mod delta;
mod metric;
mod pending;
mod requests;
mod store;

#[cfg(test)]
mod tests;

pub use cache::{FlushReport, MetricsCache};
pub use chunk_buffer::ChunkBuffer;
pub use delta::{chunk_delta_clauses, metric_init_clauses};
pub use metric::{Label, Metric, METRIC_NAME_LABEL};
pub use pending::{PendingQueue, PendingSample};
pub use requests::{Correlation, RequestKind, RequestMap};
pub use store::{AppendOutcome, ChunkStore, StoreState};

/// Samples up to 59 minutes behind the newest one may still go to the previous chunk
pub const LATE_WINDOW_MS: i64 = 59 * 60 * 1000;

/// Size of a chunk column in 64-bit words
pub const MAX_ARRAY_SIZE: usize = 1024;

pub const MAX_TIME_ATTR: &str = "_maxtime";
pub const META_ATTR: &str = "_meta";
pub const NAME_ATTR: &str = "_name";
pub const LSET_ATTR: &str = "_lset";
pub const VALUE_COLUMN_PREFIX: &str = "v";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] client::Error),
    #[error("Append at {timestamp} blocked: flush of the previous chunk is in flight")]
    Backpressure { timestamp: i64 },
    #[error("Encoding error: {0}")]
    Encoding(#[from] chunkenc::Error),
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),
    #[error("Partition error: {0}")]
    Partition(#[from] partition::Error),
}

/// Order in which samples queued during restoration are re-applied
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplayOrder {
    #[default]
    Arrival,
    /// Stable sort by timestamp, ties keep arrival order
    Timestamp,
}

#[derive(Clone, Debug)]
pub struct AppenderConfig {
    pub path: String,
    /// Skip reading the persisted state and overwrite whatever is stored
    pub override_old: bool,
    pub late_window_ms: i64,
    pub max_array_size: usize,
    pub replay_order: ReplayOrder,
}

impl Default for AppenderConfig {
    fn default() -> Self {
        Self {
            path: "metrics".to_string(),
            override_old: false,
            late_window_ms: LATE_WINDOW_MS,
            max_array_size: MAX_ARRAY_SIZE,
            replay_order: ReplayOrder::Arrival,
        }
    }
}

/// Collaborators shared by all chunk stores of a process
#[derive(Clone)]
pub struct AppenderContext {
    pub config: AppenderConfig,
    pub partitions: Arc<dyn PartitionResolver>,
    pub client: Arc<dyn StoreClient>,
    pub requests: RequestMap,
}

impl AppenderContext {
    pub fn new(
        config: AppenderConfig,
        partitions: Arc<dyn PartitionResolver>,
        client: Arc<dyn StoreClient>,
    ) -> Self {
        Self {
            config,
            partitions,
            client,
            requests: RequestMap::default(),
        }
    }

    pub fn new_encoder(&self) -> Box<dyn ChunkEncoder> {
        Box::new(XorChunk::new(self.config.max_array_size * 8))
    }
}
