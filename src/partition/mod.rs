//! Time to partition and chunk mapping

use std::sync::Arc;

mod manager;

#[cfg(test)]
mod tests;

pub use manager::PartitionManager;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid partition config: {0}")]
    InvalidConfig(String),
}

/// Length of a partition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionGranularity {
    Minute,
    Hour,
    Day,
    /// Arbitrary length in milliseconds, partitions are keyed by their start time
    Custom(i64),
}

impl PartitionGranularity {
    pub fn millis(&self) -> i64 {
        match self {
            PartitionGranularity::Minute => 60 * 1000,
            PartitionGranularity::Hour => 60 * 60 * 1000,
            PartitionGranularity::Day => 24 * 60 * 60 * 1000,
            PartitionGranularity::Custom(ms) => *ms,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PartitionConfig {
    pub granularity: PartitionGranularity,
    pub chunk_interval_ms: i64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            granularity: PartitionGranularity::Day,
            chunk_interval_ms: 60 * 60 * 1000,
        }
    }
}

/// A time bounded storage unit, holding a fixed number of chunks per metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    id: i64,
    start: i64,
    end: i64,
    chunk_interval: i64,
    path: String,
}

impl Partition {
    pub fn new(id: i64, start: i64, end: i64, chunk_interval: i64, path: String) -> Self {
        Self {
            id,
            start,
            end,
            chunk_interval,
            path,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn start_time(&self) -> i64 {
        self.start
    }

    /// Exclusive upper bound
    pub fn end_time(&self) -> i64 {
        self.end
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn contains(&self, t: i64) -> bool {
        t >= self.start && t < self.end
    }

    /// Start of the chunk holding `t`, aligned to the partition start
    pub fn chunk_min_time(&self, t: i64) -> i64 {
        self.start + (t - self.start).div_euclid(self.chunk_interval) * self.chunk_interval
    }

    /// A chunk whose end is past `i64::MAX` is open ended
    pub fn in_chunk_range(&self, chunk_min: i64, t: i64) -> bool {
        t >= chunk_min
            && chunk_min
                .checked_add(self.chunk_interval)
                .is_none_or(|end| t < end)
    }

    pub fn is_ahead_of_chunk(&self, chunk_min: i64, t: i64) -> bool {
        chunk_min
            .checked_add(self.chunk_interval)
            .is_some_and(|end| t >= end)
    }

    pub fn chunk_index(&self, chunk_min: i64) -> usize {
        ((chunk_min - self.start) / self.chunk_interval) as usize
    }

    pub fn column_for_chunk(&self, prefix: &str, index: usize) -> String {
        format!("_{}{}", prefix, index)
    }

    pub fn chunks_per_partition(&self) -> usize {
        ((self.end - self.start) / self.chunk_interval) as usize
    }
}

/// Resolves the partitions owning sample times
pub trait PartitionResolver: Send + Sync {
    fn partition_for_time(&self, t: i64) -> Arc<Partition>;

    /// Partition for a sample that is ahead of a chunk in `current`
    fn next_partition(&self, current: &Arc<Partition>, t: i64) -> Arc<Partition> {
        if current.contains(t) {
            Arc::clone(current)
        } else {
            self.partition_for_time(t)
        }
    }
}
