use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{Error, Partition, PartitionConfig, PartitionGranularity, PartitionResolver};

/// Creates partitions on demand and keeps them for the process lifetime
pub struct PartitionManager {
    base_path: String,
    config: PartitionConfig,
    partitions: Mutex<BTreeMap<i64, Arc<Partition>>>,
}

impl PartitionManager {
    pub fn new(base_path: impl Into<String>, config: PartitionConfig) -> Result<Self, Error> {
        let length = config.granularity.millis();
        if length <= 0 {
            return Err(Error::InvalidConfig(format!("partition length {} ms", length)));
        }
        if config.chunk_interval_ms <= 0 || length % config.chunk_interval_ms != 0 {
            return Err(Error::InvalidConfig(format!(
                "chunk interval {} ms does not divide partition length {} ms",
                config.chunk_interval_ms, length
            )));
        }

        Ok(Self {
            base_path: base_path.into(),
            config,
            partitions: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    pub fn partitions(&self) -> Vec<Arc<Partition>> {
        self.partitions.lock().values().cloned().collect()
    }

    fn partition_path(&self, start: i64) -> String {
        let key = match DateTime::<Utc>::from_timestamp_millis(start) {
            Some(dt) => match self.config.granularity {
                PartitionGranularity::Minute => dt.format("%Y-%m-%dT%H:%M").to_string(),
                PartitionGranularity::Hour => dt.format("%Y-%m-%dT%H").to_string(),
                PartitionGranularity::Day => dt.format("%Y-%m-%d").to_string(),
                PartitionGranularity::Custom(_) => start.to_string(),
            },
            None => start.to_string(),
        };
        format!("{}/{}", self.base_path, key)
    }
}

impl PartitionResolver for PartitionManager {
    fn partition_for_time(&self, t: i64) -> Arc<Partition> {
        let length = self.config.granularity.millis();
        let id = t.div_euclid(length);

        let mut partitions = self.partitions.lock();
        let partition = partitions.entry(id).or_insert_with(|| {
            // clamped at the ends of the i64 range
            let start = t.saturating_sub(t.rem_euclid(length));
            Arc::new(Partition::new(
                id,
                start,
                start.saturating_add(length),
                self.config.chunk_interval_ms,
                self.partition_path(start),
            ))
        });
        Arc::clone(partition)
    }
}
