//! Binary chunk encodings

mod bstream;
mod xor;

#[cfg(test)]
mod tests;

pub use xor::{XorChunk, XorIter};

/// Error type for chunk encoding
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Chunk full: capacity of {0} bytes reached")]
    ChunkFull(usize),
    #[error("Invalid flush marker: {0}")]
    InvalidMarker(String),
    #[error("No encoder bound to the chunk")]
    Unbound,
}

/// The part of an encoded chunk that has not been persisted yet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnflushedRange<'a> {
    /// Encoder specific metadata word, stored next to the chunk
    pub meta: u64,
    /// Byte offset of `bytes` within the chunk, always 8-byte aligned
    pub offset: usize,
    pub bytes: &'a [u8],
}

/// An append-only encoder for a single chunk of (timestamp, value) samples.
///
/// The encoder keeps track of how much of its byte buffer has already been
/// persisted, so that only the tail has to be shipped on the next flush.
pub trait ChunkEncoder: Send {
    fn append(&mut self, t: i64, v: f64) -> Result<(), Error>;

    fn sample_count(&self) -> usize;

    fn unflushed_range(&self) -> UnflushedRange<'_>;

    /// Moves the persisted offset forward. `marker` must be 8-byte aligned.
    fn advance_flushed(&mut self, marker: usize) -> Result<(), Error>;

    /// Decodes all samples in append order
    fn samples(&self) -> Vec<(i64, f64)>;
}

/// Packs bytes into little-endian 64-bit words, zero padding the last one
pub fn to_words(bytes: &[u8]) -> Vec<u64> {
    bytes
        .chunks(8)
        .map(|word| {
            let mut buf = [0u8; 8];
            buf[..word.len()].copy_from_slice(word);
            u64::from_le_bytes(buf)
        })
        .collect()
}
