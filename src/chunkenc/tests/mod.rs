use super::*;
use tsz::stream::{Read, Write};

fn chunk_with(samples: &[(i64, f64)]) -> XorChunk {
    let mut chunk = XorChunk::new(8192);
    for &(t, v) in samples {
        chunk.append(t, v).unwrap();
    }
    chunk
}

#[test]
fn test_decode_irregular_series() {
    let samples = vec![
        (1_000, 1.0),
        (2_000, 1.0),
        (3_000, 1.5),
        (3_050, -2.25),
        (9_999, 1e12),
        (10_000, 1e12),
        (1_000_000, 0.0),
        (999_990, f64::MAX),
    ];
    let chunk = chunk_with(&samples);

    assert_eq!(chunk.sample_count(), samples.len());
    assert_eq!(chunk.iter().collect::<Vec<_>>(), samples);
}

#[test]
fn test_first_sample_is_stored_raw() {
    let chunk = chunk_with(&[(10, 1.0)]);
    let range = chunk.unflushed_range();

    assert_eq!(range.offset, 0);
    assert_eq!(range.bytes.len(), 16);
    assert_eq!(&range.bytes[..8], &10i64.to_be_bytes());
    assert_eq!(range.meta, (1 << 32) | 128);
}

#[test]
fn test_regular_interval_compresses() {
    let samples: Vec<(i64, f64)> = (0..100).map(|i| (i * 10_000, 42.0)).collect();
    let chunk = chunk_with(&samples);

    // raw first sample, one wide delta, then two bits per steady sample
    assert_eq!(chunk.bytes().len(), (128 + 69 + 98 * 2 + 7) / 8);
    assert_eq!(chunk.iter().count(), 100);
}

#[test]
fn test_unflushed_range_after_advance() {
    let mut chunk = chunk_with(&[(10, 1.0), (20, 2.0)]);
    let total = chunk.bytes().len();

    chunk.advance_flushed(8).unwrap();
    let range = chunk.unflushed_range();
    assert_eq!(range.offset, 8);
    assert_eq!(range.bytes.len(), total - 8);
    assert_eq!(chunk.flushed(), 8);
}

#[test]
fn test_advance_rejects_bad_marker() {
    let mut chunk = chunk_with(&[(10, 1.0)]);

    assert!(matches!(chunk.advance_flushed(3), Err(Error::InvalidMarker(_))));
    assert!(matches!(chunk.advance_flushed(64), Err(Error::InvalidMarker(_))));
    assert_eq!(chunk.flushed(), 0);
}

#[test]
fn test_chunk_full() {
    let mut chunk = XorChunk::new(36);
    chunk.append(1, 1.0).unwrap();
    chunk.append(2, 2.0).unwrap();

    let result = chunk.append(3, 3.0);
    assert!(matches!(result, Err(Error::ChunkFull(36))));
    assert_eq!(chunk.sample_count(), 2);
}

#[test]
fn test_to_words_pads_tail() {
    let words = to_words(&[1, 0, 0, 0, 0, 0, 0, 0, 0xff, 0x01]);
    assert_eq!(words, vec![1, 0x01ff]);
    assert!(to_words(&[]).is_empty());
}

#[test]
fn test_bit_stream_stops_at_bit_length() {
    let mut writer = bstream::BitWriter::default();
    writer.write_bits(0b101, 3);
    writer.write_byte(0xff);
    assert_eq!(writer.bit_len(), 11);
    assert_eq!(writer.bytes(), &[0b1011_1111, 0b1110_0000]);

    let mut reader = bstream::BitReader::new(writer.bytes(), writer.bit_len());
    assert_eq!(reader.peak_bits(3).ok(), Some(0b101));
    assert_eq!(reader.read_bits(11).ok(), Some(0b101_1111_1111));
    assert!(reader.read_bit().is_err());
}
