//! Chunked write path of a time-series engine on a remote key-value store

pub mod appender;
pub mod chunkenc;
pub mod client;
pub mod partition;
