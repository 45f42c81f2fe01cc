use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use log::{error, warn};

use crate::client::{Response, StoreClient};
use crate::partition::{PartitionConfig, PartitionManager};

use super::{
    AppendOutcome, AppenderConfig, AppenderContext, ChunkStore, Error, Label, Metric, RequestKind,
};

struct MetricState {
    metric: Metric,
    store: ChunkStore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub issued: usize,
    pub failed: usize,
}

/// Chunk stores of all active metrics, and the dispatch of their responses
pub struct MetricsCache {
    ctx: AppenderContext,
    metrics: HashMap<u64, MetricState>,
}

impl MetricsCache {
    pub fn new(
        config: AppenderConfig,
        partition_config: PartitionConfig,
        client: Arc<dyn StoreClient>,
    ) -> Result<Self, Error> {
        let partitions = PartitionManager::new(config.path.clone(), partition_config)?;
        Ok(Self::with_context(AppenderContext::new(config, Arc::new(partitions), client)))
    }

    pub fn with_context(ctx: AppenderContext) -> Self {
        Self {
            ctx,
            metrics: HashMap::new(),
        }
    }

    pub fn context(&self) -> &AppenderContext {
        &self.ctx
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn store(&self, metric_hash: u64) -> Option<&ChunkStore> {
        self.metrics.get(&metric_hash).map(|m| &m.store)
    }

    /// Appends a sample, activating the metric on first sight
    pub fn add(&mut self, labels: Vec<Label>, t: i64, v: f64) -> Result<AppendOutcome, Error> {
        let metric = Metric::new(labels)?;

        let state = match self.metrics.entry(metric.hash()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut store = ChunkStore::new();
                store.get_chunks_state(&self.ctx, &metric, t)?;
                entry.insert(MetricState { metric, store })
            }
        };

        state.store.append(&self.ctx, t, v)
    }

    /// Starts a flush round on every metric. A metric whose request cannot be
    /// issued is counted as failed and retried on the next round.
    pub fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        for state in self.metrics.values_mut() {
            match state.store.write_chunks(&self.ctx, &state.metric) {
                Ok(Some(_)) => report.issued += 1,
                Ok(None) => {}
                Err(e) => {
                    error!("Flush of {} failed: {}", state.metric.key(), e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Routes completed requests to their chunk stores. Returns how many
    /// responses matched an outstanding request.
    pub fn dispatch(&mut self, responses: impl IntoIterator<Item = Response>) -> usize {
        let mut handled = 0;
        for response in responses {
            let Some(correlation) = self.ctx.requests.take(response.id) else {
                warn!("Response for unknown request {}", response.id);
                continue;
            };
            let Some(state) = self.metrics.get_mut(&correlation.metric) else {
                warn!("Response {} for an inactive metric", response.id);
                continue;
            };

            match correlation.kind {
                RequestKind::GetState => {
                    state.store.process_get_resp(&state.metric, &response);
                    state.store.replay_pending(&self.ctx);
                }
                RequestKind::WriteChunks => match &response.outcome {
                    Ok(_) => state.store.process_write_resp(&self.ctx),
                    Err(e) => {
                        error!("Update of {} failed: {}", state.metric.key(), e);
                        state.store.process_write_failure(&self.ctx);
                    }
                },
            }
            handled += 1;
        }
        handled
    }

    pub fn updates_behind(&self) -> usize {
        self.metrics.values().map(|m| m.store.updates_behind()).sum()
    }
}
