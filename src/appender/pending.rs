use super::ReplayOrder;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSample {
    pub t: i64,
    pub v: f64,
}

/// Samples received before the persisted state of the metric is known
#[derive(Debug, Default)]
pub struct PendingQueue {
    samples: Vec<PendingSample>,
}

impl PendingQueue {
    pub fn push(&mut self, t: i64, v: f64) {
        self.samples.push(PendingSample { t, v });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingSample> {
        self.samples.iter()
    }

    /// Empties the queue, returning the samples in replay order
    pub fn drain(&mut self, order: ReplayOrder) -> Vec<PendingSample> {
        let mut samples = std::mem::take(&mut self.samples);
        if order == ReplayOrder::Timestamp {
            samples.sort_by_key(|s| s.t);
        }
        samples
    }
}
