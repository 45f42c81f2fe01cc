//! Asynchronous key-value store interface

use std::collections::HashMap;

mod memory;

#[cfg(test)]
mod tests;

pub use memory::{IssuedRequest, MemoryStore};

pub type RequestId = u64;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Str(String),
    IntArray(Vec<i64>),
}

pub type Item = HashMap<String, AttributeValue>;

/// Completion of a previously issued request
#[derive(Debug, Clone)]
pub struct Response {
    pub id: RequestId,
    /// The requested attributes for a get, `None` for an update
    pub outcome: Result<Option<Item>, Error>,
}

/// Issues requests without waiting for them. Completions are delivered out of
/// band as [`Response`]s carrying the returned request id.
pub trait StoreClient: Send + Sync {
    fn get_item(&self, path: &str, attributes: &[&str]) -> Result<RequestId, Error>;

    fn update_item(&self, path: &str, expression: &str) -> Result<RequestId, Error>;
}
