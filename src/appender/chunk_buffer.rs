use std::sync::Arc;

use crate::chunkenc::{self, ChunkEncoder, UnflushedRange};
use crate::partition::Partition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    marker: usize,
    samples: usize,
}

/// One in-progress chunk and how much of it has been persisted
#[derive(Default)]
pub struct ChunkBuffer {
    encoder: Option<Box<dyn ChunkEncoder>>,
    partition: Option<Arc<Partition>>,
    flushed_marker: usize,
    flushed_samples: usize,
    last_timestamp: i64,
    chunk_start: i64,
    in_flight: Option<InFlight>,
}

impl ChunkBuffer {
    /// A buffer bound to the chunk of `partition` that holds `t`
    pub fn new(partition: Arc<Partition>, t: i64, encoder: Box<dyn ChunkEncoder>) -> Self {
        Self {
            encoder: Some(encoder),
            chunk_start: partition.chunk_min_time(t),
            partition: Some(partition),
            flushed_marker: 0,
            flushed_samples: 0,
            last_timestamp: i64::MIN,
            in_flight: None,
        }
    }

    pub fn initialize(
        &mut self,
        partition: Arc<Partition>,
        t: i64,
        encoder: Box<dyn ChunkEncoder>,
    ) {
        *self = Self::new(partition, t, encoder);
    }

    pub fn partition(&self) -> Option<&Arc<Partition>> {
        self.partition.as_ref()
    }

    pub fn chunk_start(&self) -> i64 {
        self.chunk_start
    }

    pub fn last_timestamp(&self) -> i64 {
        self.last_timestamp
    }

    pub fn flushed_marker(&self) -> usize {
        self.flushed_marker
    }

    pub fn flushed_samples(&self) -> usize {
        self.flushed_samples
    }

    pub fn is_writing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_range(&self, t: i64) -> bool {
        self.partition
            .as_ref()
            .is_some_and(|p| p.in_chunk_range(self.chunk_start, t))
    }

    pub fn is_ahead(&self, t: i64) -> bool {
        self.partition
            .as_ref()
            .is_some_and(|p| p.is_ahead_of_chunk(self.chunk_start, t))
    }

    pub fn append(&mut self, t: i64, v: f64) -> Result<(), chunkenc::Error> {
        let encoder = self.encoder.as_mut().ok_or(chunkenc::Error::Unbound)?;
        encoder.append(t, v)?;
        if t > self.last_timestamp {
            self.last_timestamp = t;
        }
        Ok(())
    }

    pub fn sample_count(&self) -> usize {
        self.encoder.as_ref().map_or(0, |e| e.sample_count())
    }

    pub fn unflushed_samples(&self) -> usize {
        self.sample_count() - self.flushed_samples
    }

    pub fn unflushed_range(&self) -> Option<UnflushedRange<'_>> {
        self.encoder.as_ref().map(|e| e.unflushed_range())
    }

    pub fn samples(&self) -> Vec<(i64, f64)> {
        self.encoder.as_ref().map_or_else(Vec::new, |e| e.samples())
    }

    /// Marks the unflushed range as in flight and returns the marker the
    /// flush will advance to once acknowledged.
    ///
    /// The marker is the start of the last, possibly partial, word: that word
    /// can still grow and is sent again with the next flush.
    pub(crate) fn begin_flush(&mut self) -> usize {
        let end = self
            .unflushed_range()
            .map_or(self.flushed_marker, |r| r.offset + r.bytes.len());
        let marker = if end == 0 { 0 } else { ((end - 1) / 8) * 8 };

        self.in_flight = Some(InFlight {
            marker,
            samples: self.sample_count(),
        });
        marker
    }

    pub(crate) fn complete_flush(&mut self) -> Result<(), chunkenc::Error> {
        let Some(flight) = self.in_flight.take() else {
            return Ok(());
        };
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.advance_flushed(flight.marker)?;
        }
        self.flushed_marker = flight.marker;
        self.flushed_samples = flight.samples;
        Ok(())
    }

    pub(crate) fn abort_flush(&mut self) {
        self.in_flight = None;
    }
}
