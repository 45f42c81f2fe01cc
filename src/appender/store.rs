use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, error, warn};

use crate::client::{self, AttributeValue, RequestId, Response};
use crate::partition::Partition;

use super::delta::{chunk_delta_clauses, metric_init_clauses};
use super::{
    AppenderContext, ChunkBuffer, Correlation, Error, Metric, PendingQueue, RequestKind,
    MAX_TIME_ATTR, META_ATTR,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Init,
    /// Reading the persisted state of the metric
    FetchingState,
    Ready,
    /// An update request is in flight
    Flushing,
}

/// What [`ChunkStore::append`] did with a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Held until the persisted state is known
    Queued,
    Appended,
    /// Started a new current chunk
    Rotated,
    /// Went to the previous chunk within the late window
    AppendedLate,
    /// Too old for either chunk
    Dropped,
}

#[derive(Debug, Clone, Copy)]
struct FlushRound {
    request: RequestId,
    /// Partition whose item this round initializes
    initializes: Option<i64>,
}

/// Current and previous chunk of one metric, with the state machine that
/// restores, appends and flushes them
pub struct ChunkStore {
    state: StoreState,
    current: usize,
    initialized: BTreeSet<i64>,
    restored_max_time: Option<i64>,
    pending: PendingQueue,
    buffers: [ChunkBuffer; 2],
    round: Option<FlushRound>,
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore {
    pub fn new() -> Self {
        Self {
            state: StoreState::Init,
            current: 0,
            initialized: BTreeSet::new(),
            restored_max_time: None,
            pending: PendingQueue::default(),
            buffers: [ChunkBuffer::default(), ChunkBuffer::default()],
            round: None,
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == StoreState::Ready
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &ChunkBuffer {
        &self.buffers[self.current]
    }

    pub fn previous(&self) -> &ChunkBuffer {
        &self.buffers[self.current ^ 1]
    }

    pub fn buffer(&self, index: usize) -> &ChunkBuffer {
        &self.buffers[index]
    }

    /// Highest partition id whose item is already initialized in the store
    pub fn last_table_id(&self) -> Option<i64> {
        self.initialized.last().copied()
    }

    /// Whether the item of `partition_id` already holds the label columns and
    /// the meta array
    pub fn is_initialized(&self, partition_id: i64) -> bool {
        self.initialized.contains(&partition_id)
    }

    pub fn restored_max_time(&self) -> Option<i64> {
        self.restored_max_time
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    /// Samples not yet acknowledged by the store, queued ones included
    pub fn updates_behind(&self) -> usize {
        self.pending.len() + self.buffers.iter().map(|b| b.unflushed_samples()).sum::<usize>()
    }

    /// Binds the first chunk to the partition of `t` and starts reading the
    /// persisted state of the metric, unless configured to override it.
    pub fn get_chunks_state(
        &mut self,
        ctx: &AppenderContext,
        metric: &Metric,
        t: i64,
    ) -> Result<(), Error> {
        let partition = ctx.partitions.partition_for_time(t);
        self.buffers[0].initialize(Arc::clone(&partition), t, ctx.new_encoder());
        self.current = 0;

        if ctx.config.override_old {
            self.state = StoreState::Ready;
            return Ok(());
        }

        let path = metric.item_path(&partition);
        let id = ctx
            .client
            .get_item(&path, &[MAX_TIME_ATTR, META_ATTR])
            .map_err(|e| {
                error!("GetItem failed for {}: {}", metric.key(), e);
                e
            })?;

        debug!("GetItem name={} key={} reqid={}", metric.name(), metric.key(), id);
        ctx.requests.register(
            id,
            Correlation {
                metric: metric.hash(),
                kind: RequestKind::GetState,
            },
        );

        self.state = StoreState::FetchingState;
        Ok(())
    }

    /// Completes the state read. A failed read means nothing was stored yet.
    pub fn process_get_resp(&mut self, metric: &Metric, response: &Response) {
        self.state = StoreState::Ready;

        let item = match &response.outcome {
            Ok(Some(item)) => item,
            Ok(None) => return,
            Err(client::Error::NotFound(_)) => {
                debug!("No stored state for {}", metric.key());
                return;
            }
            Err(e) => {
                warn!("Reading stored state of {} failed, assuming none: {}", metric.key(), e);
                return;
            }
        };

        self.restored_max_time = match item.get(MAX_TIME_ATTR) {
            Some(AttributeValue::Int(t)) => Some(*t),
            _ => None,
        };
        debug!(
            "Got item name={} key={} maxt={:?}",
            metric.name(),
            metric.key(),
            self.restored_max_time
        );

        // The item exists, so its label columns and meta array do too
        if let Some(id) = self.current().partition().map(|p| p.id()) {
            self.initialized.insert(id);
        }
    }

    pub fn append(
        &mut self,
        ctx: &AppenderContext,
        t: i64,
        v: f64,
    ) -> Result<AppendOutcome, Error> {
        match self.state {
            StoreState::Init | StoreState::FetchingState => {
                self.pending.push(t, v);
                return Ok(AppendOutcome::Queued);
            }
            StoreState::Ready | StoreState::Flushing => {}
        }

        let cur = &mut self.buffers[self.current];
        if cur.in_range(t) {
            cur.append(t, v)?;
            return Ok(AppendOutcome::Appended);
        }

        if cur.is_ahead(t) {
            return self.rotate(ctx, t, v);
        }

        let lower = cur.last_timestamp().saturating_sub(ctx.config.late_window_ms);
        let prev = &mut self.buffers[self.current ^ 1];
        if prev.in_range(t) && t >= lower {
            prev.append(t, v)?;
            return Ok(AppendOutcome::AppendedLate);
        }

        warn!("Dropping sample at {}, older than the late window ({})", t, lower);
        Ok(AppendOutcome::Dropped)
    }

    fn rotate(&mut self, ctx: &AppenderContext, t: i64, v: f64) -> Result<AppendOutcome, Error> {
        let other = self.current ^ 1;
        if self.buffers[other].is_writing() {
            return Err(Error::Backpressure { timestamp: t });
        }

        let partition = match self.buffers[self.current].partition() {
            Some(current) => ctx.partitions.next_partition(current, t),
            None => ctx.partitions.partition_for_time(t),
        };

        let mut fresh = ChunkBuffer::new(partition, t, ctx.new_encoder());
        fresh.append(t, v)?;

        let evicted = self.buffers[other].unflushed_samples();
        if evicted > 0 {
            warn!("Rotating out a chunk with {} unflushed samples", evicted);
        }

        self.buffers[other] = fresh;
        self.current = other;
        Ok(AppendOutcome::Rotated)
    }

    /// Sends the unflushed part of the chunks of one partition as a single
    /// update. Returns the request id, or `None` when there was nothing to do.
    pub fn write_chunks(
        &mut self,
        ctx: &AppenderContext,
        metric: &Metric,
    ) -> Result<Option<RequestId>, Error> {
        match self.state {
            StoreState::FetchingState | StoreState::Flushing => return Ok(None),
            StoreState::Init | StoreState::Ready => {}
        }

        let mut target: Option<Arc<Partition>> = None;
        let mut selected = Vec::with_capacity(2);
        for idx in [self.current, self.current ^ 1] {
            let buffer = &self.buffers[idx];
            let Some(partition) = buffer.partition() else {
                continue;
            };
            if buffer.unflushed_samples() == 0 {
                continue;
            }

            match &target {
                // one partition per round, the other one waits for the next
                Some(chosen) if chosen.id() != partition.id() => continue,
                Some(_) => {}
                None => target = Some(Arc::clone(partition)),
            }
            selected.push(idx);
        }

        let Some(partition) = target else {
            return Ok(None);
        };

        // Oldest chunk first, so the last _maxtime assignment is the newest
        let mut clauses = Vec::new();
        for &idx in selected.iter().rev() {
            clauses.extend(chunk_delta_clauses(&self.buffers[idx], ctx.config.max_array_size));
        }

        // every partition has its own item, initialized by its first round
        let needs_init = !self.initialized.contains(&partition.id());
        if needs_init {
            let mut init = metric_init_clauses(metric, partition.chunks_per_partition());
            init.append(&mut clauses);
            clauses = init;
        }

        let expression = clauses.join("; ");
        let path = metric.item_path(&partition);
        let id = ctx.client.update_item(&path, &expression).map_err(|e| {
            error!("UpdateItem failed for {}: {}", metric.key(), e);
            e
        })?;

        debug!(
            "UpdateItem name={} key={} reqid={} expr={}",
            metric.name(),
            metric.key(),
            id,
            expression
        );

        for &idx in &selected {
            self.buffers[idx].begin_flush();
        }
        self.round = Some(FlushRound {
            request: id,
            initializes: needs_init.then_some(partition.id()),
        });
        if needs_init {
            self.initialized.insert(partition.id());
        }
        self.state = StoreState::Flushing;

        ctx.requests.register(
            id,
            Correlation {
                metric: metric.hash(),
                kind: RequestKind::WriteChunks,
            },
        );
        Ok(Some(id))
    }

    /// Acknowledges the in-flight update and re-applies queued samples
    pub fn process_write_resp(&mut self, ctx: &AppenderContext) {
        for buffer in &mut self.buffers {
            if buffer.is_writing() {
                if let Err(e) = buffer.complete_flush() {
                    error!("Failed to advance flush marker: {}", e);
                }
            }
        }

        self.round = None;
        self.state = StoreState::Ready;
        self.replay_pending(ctx);
    }

    /// Drops the in-flight marks of a failed update, so its data is sent again
    pub fn process_write_failure(&mut self, ctx: &AppenderContext) {
        for buffer in &mut self.buffers {
            buffer.abort_flush();
        }

        if let Some(round) = self.round.take() {
            debug!("Update {} failed, resending on the next round", round.request);
            if let Some(partition_id) = round.initializes {
                self.initialized.remove(&partition_id);
            }
        }
        self.state = StoreState::Ready;
        self.replay_pending(ctx);
    }

    /// Applies the samples queued during restoration. Returns how many were
    /// accepted into a chunk.
    pub fn replay_pending(&mut self, ctx: &AppenderContext) -> usize {
        let mut accepted = 0;
        for sample in self.pending.drain(ctx.config.replay_order) {
            match self.append(ctx, sample.t, sample.v) {
                Ok(AppendOutcome::Dropped) | Ok(AppendOutcome::Queued) => {}
                Ok(_) => accepted += 1,
                Err(e) => warn!("Failed to replay sample at {}: {}", sample.t, e),
            }
        }
        accepted
    }
}
