use tsz::Bit;
use tsz::stream::{Read, Write};

use super::bstream::{BitReader, BitWriter};
use super::{ChunkEncoder, Error, UnflushedRange};

// Worst case encoded size of one sample: 4+64 bits of timestamp, 2+5+6+64 bits of value
const MAX_SAMPLE_BYTES: usize = 19;

/// Gorilla style chunk: delta-of-delta timestamps and XOR compressed values
#[derive(Debug, Clone)]
pub struct XorChunk {
    stream: BitWriter,
    capacity: usize,
    samples: usize,
    flushed: usize,
    t: i64,
    t_delta: i64,
    v: u64,
    leading: Option<u32>,
    trailing: u32,
}

impl XorChunk {
    /// Creates an empty chunk holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            stream: BitWriter::with_capacity(capacity),
            capacity,
            samples: 0,
            flushed: 0,
            t: 0,
            t_delta: 0,
            v: 0,
            leading: None,
            trailing: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        self.stream.bytes()
    }

    pub fn flushed(&self) -> usize {
        self.flushed
    }

    pub fn iter(&self) -> XorIter<'_> {
        XorIter {
            reader: BitReader::new(self.stream.bytes(), self.stream.bit_len()),
            remaining: self.samples,
            read: 0,
            t: 0,
            t_delta: 0,
            v: 0,
            leading: 0,
            trailing: 0,
        }
    }

    fn write_timestamp(&mut self, t: i64) {
        let delta = t.wrapping_sub(self.t);
        let dod = delta.wrapping_sub(self.t_delta);

        match dod {
            0 => self.stream.write_bit(Bit::Zero),
            -63..=64 => {
                self.stream.write_bits(0b10, 2);
                self.stream.write_bits(dod as u64, 7);
            }
            -255..=256 => {
                self.stream.write_bits(0b110, 3);
                self.stream.write_bits(dod as u64, 9);
            }
            -2047..=2048 => {
                self.stream.write_bits(0b1110, 4);
                self.stream.write_bits(dod as u64, 12);
            }
            _ => {
                self.stream.write_bits(0b1111, 4);
                self.stream.write_bits(dod as u64, 64);
            }
        }

        self.t = t;
        self.t_delta = delta;
    }

    fn write_value(&mut self, v: f64) {
        let bits = v.to_bits();
        let xor = bits ^ self.v;
        self.v = bits;

        if xor == 0 {
            self.stream.write_bit(Bit::Zero);
            return;
        }
        self.stream.write_bit(Bit::One);

        let leading = xor.leading_zeros().min(31);
        let trailing = xor.trailing_zeros();

        match self.leading {
            Some(prev_leading) if leading >= prev_leading && trailing >= self.trailing => {
                self.stream.write_bit(Bit::Zero);
                let sigbits = 64 - prev_leading - self.trailing;
                self.stream.write_bits(xor >> self.trailing, sigbits);
            }
            _ => {
                self.leading = Some(leading);
                self.trailing = trailing;
                let sigbits = 64 - leading - trailing;

                self.stream.write_bit(Bit::One);
                self.stream.write_bits(u64::from(leading), 5);
                // 64 significant bits wrap to 0 in the 6 bit field
                self.stream.write_bits(u64::from(sigbits & 0x3f), 6);
                self.stream.write_bits(xor >> trailing, sigbits);
            }
        }
    }
}

impl ChunkEncoder for XorChunk {
    fn append(&mut self, t: i64, v: f64) -> Result<(), Error> {
        if self.stream.bytes().len() + MAX_SAMPLE_BYTES > self.capacity {
            return Err(Error::ChunkFull(self.capacity));
        }

        if self.samples == 0 {
            self.stream.write_bits(t as u64, 64);
            self.stream.write_bits(v.to_bits(), 64);
            self.t = t;
            self.v = v.to_bits();
        } else {
            self.write_timestamp(t);
            self.write_value(v);
        }

        self.samples += 1;
        Ok(())
    }

    fn sample_count(&self) -> usize {
        self.samples
    }

    fn unflushed_range(&self) -> UnflushedRange<'_> {
        UnflushedRange {
            meta: ((self.samples as u64) << 32) | self.stream.bit_len() as u64,
            offset: self.flushed,
            bytes: &self.stream.bytes()[self.flushed..],
        }
    }

    fn advance_flushed(&mut self, marker: usize) -> Result<(), Error> {
        if marker % 8 != 0 || marker > self.stream.bytes().len() {
            return Err(Error::InvalidMarker(format!(
                "{} (chunk length {})",
                marker,
                self.stream.bytes().len()
            )));
        }
        self.flushed = marker;
        Ok(())
    }

    fn samples(&self) -> Vec<(i64, f64)> {
        self.iter().collect()
    }
}

/// Decodes the samples of a [`XorChunk`] in append order
pub struct XorIter<'a> {
    reader: BitReader<'a>,
    remaining: usize,
    read: usize,
    t: i64,
    t_delta: i64,
    v: u64,
    leading: u32,
    trailing: u32,
}

impl XorIter<'_> {
    fn read_dod(&mut self) -> Option<i64> {
        let mut prefix = 0;
        while prefix < 4 && matches!(self.reader.read_bit().ok()?, Bit::One) {
            prefix += 1;
        }

        let nbits = match prefix {
            0 => return Some(0),
            1 => 7,
            2 => 9,
            3 => 12,
            _ => return Some(self.reader.read_bits(64).ok()? as i64),
        };

        let mut bits = self.reader.read_bits(nbits).ok()? as i64;
        if bits > 1 << (nbits - 1) {
            bits -= 1 << nbits;
        }
        Some(bits)
    }

    fn read_value(&mut self) -> Option<u64> {
        if let Bit::Zero = self.reader.read_bit().ok()? {
            return Some(self.v);
        }

        if let Bit::One = self.reader.read_bit().ok()? {
            self.leading = self.reader.read_bits(5).ok()? as u32;
            let mut sigbits = self.reader.read_bits(6).ok()? as u32;
            if sigbits == 0 {
                sigbits = 64;
            }
            self.trailing = 64 - self.leading - sigbits;
        }

        let sigbits = 64 - self.leading - self.trailing;
        let xor = self.reader.read_bits(sigbits).ok()? << self.trailing;
        Some(self.v ^ xor)
    }
}

impl Iterator for XorIter<'_> {
    type Item = (i64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.read >= self.remaining {
            return None;
        }

        if self.read == 0 {
            self.t = self.reader.read_bits(64).ok()? as i64;
            self.v = self.reader.read_bits(64).ok()?;
        } else {
            let dod = self.read_dod()?;
            self.t_delta = self.t_delta.wrapping_add(dod);
            self.t = self.t.wrapping_add(self.t_delta);
            self.v = self.read_value()?;
        }

        self.read += 1;
        Some((self.t, f64::from_bits(self.v)))
    }
}
