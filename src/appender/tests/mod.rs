pub mod metric;

use super::*;
use crate::client::{IssuedRequest, MemoryStore, Response};
use crate::partition::{PartitionConfig, PartitionGranularity, PartitionManager};

pub struct Harness {
    pub ctx: AppenderContext,
    pub client: Arc<MemoryStore>,
    pub partitions: Arc<PartitionManager>,
    pub metric: Metric,
}

pub fn test_metric() -> Metric {
    Metric::new(vec![Label::new("host", "a"), Label::new("__name__", "cpu")]).unwrap()
}

pub fn harness_with(partition_ms: i64, chunk_ms: i64, config: AppenderConfig) -> Harness {
    let client = Arc::new(MemoryStore::new());
    let partitions = Arc::new(
        PartitionManager::new(
            config.path.clone(),
            PartitionConfig {
                granularity: PartitionGranularity::Custom(partition_ms),
                chunk_interval_ms: chunk_ms,
            },
        )
        .unwrap(),
    );
    let ctx = AppenderContext::new(config, partitions.clone(), client.clone());

    Harness {
        ctx,
        client,
        partitions,
        metric: test_metric(),
    }
}

pub fn harness(partition_ms: i64, chunk_ms: i64) -> Harness {
    harness_with(partition_ms, chunk_ms, AppenderConfig::default())
}

impl Harness {
    /// A store activated at `t` for a metric with nothing stored yet
    pub fn ready_store(&self, t: i64) -> ChunkStore {
        let mut store = ChunkStore::new();
        store.get_chunks_state(&self.ctx, &self.metric, t).unwrap();
        let response = self.single_response();
        store.process_get_resp(&self.metric, &response);
        assert_eq!(store.state(), StoreState::Ready);
        store
    }

    pub fn single_response(&self) -> Response {
        let mut responses = self.client.drain_responses();
        assert_eq!(responses.len(), 1);
        let response = responses.remove(0);
        assert!(self.ctx.requests.take(response.id).is_some());
        response
    }

    pub fn updates(&self) -> Vec<(String, String)> {
        self.client
            .issued()
            .into_iter()
            .filter_map(|r| match r {
                IssuedRequest::Update { path, expression, .. } => Some((path, expression)),
                IssuedRequest::Get { .. } => None,
            })
            .collect()
    }

    pub fn last_expression(&self) -> String {
        self.updates().pop().map(|(_, expr)| expr).unwrap_or_default()
    }
}
