use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    GetState,
    WriteChunks,
}

/// Which metric an outstanding request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correlation {
    pub metric: u64,
    pub kind: RequestKind,
}

/// Outstanding requests of all metrics, keyed by request id.
///
/// Cloning yields another handle to the same map.
#[derive(Clone, Default)]
pub struct RequestMap {
    inner: Arc<Mutex<HashMap<RequestId, Correlation>>>,
}

impl RequestMap {
    pub fn register(&self, id: RequestId, correlation: Correlation) {
        self.inner.lock().insert(id, correlation);
    }

    /// Removes and returns the entry for a completed request
    pub fn take(&self, id: RequestId) -> Option<Correlation> {
        self.inner.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
