use tsz::Bit;
use tsz::stream::{Error as TszError, Read as TszRead, Write as TszWrite};

/// Bit level writer, most significant bit first.
///
/// Unlike `tsz::stream::BufferedWriter` the written bytes stay readable
/// while the stream grows, so a chunk can hand out its unflushed tail.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit_len: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }
}

impl TszWrite for BitWriter {
    fn write_bit(&mut self, bit: Bit) {
        if self.bit_len % 8 == 0 {
            self.bytes.push(0);
        }
        if let Bit::One = bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    fn write_byte(&mut self, byte: u8) {
        self.write_bits(u64::from(byte), 8);
    }

    fn write_bits(&mut self, bits: u64, num: u32) {
        for i in (0..num.min(64)).rev() {
            self.write_bit(if (bits >> i) & 1 == 1 { Bit::One } else { Bit::Zero });
        }
    }

    fn close(self) -> Box<[u8]> {
        self.bytes.into_boxed_slice()
    }
}

/// Reads back a [`BitWriter`] stream without copying, bounded by its bit length
pub struct BitReader<'a> {
    bytes: &'a [u8],
    bit_len: usize,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8], bit_len: usize) -> Self {
        Self {
            bytes,
            bit_len,
            pos: 0,
        }
    }
}

impl TszRead for BitReader<'_> {
    fn read_bit(&mut self) -> Result<Bit, TszError> {
        if self.pos >= self.bit_len || self.pos / 8 >= self.bytes.len() {
            return Err(TszError::EOF);
        }
        let byte = self.bytes[self.pos / 8];
        self.pos += 1;

        if byte & (0x80 >> ((self.pos - 1) % 8)) == 0 {
            Ok(Bit::Zero)
        } else {
            Ok(Bit::One)
        }
    }

    fn read_byte(&mut self) -> Result<u8, TszError> {
        self.read_bits(8).map(|bits| bits as u8)
    }

    fn read_bits(&mut self, num: u32) -> Result<u64, TszError> {
        let mut bits = 0u64;
        for _ in 0..num.min(64) {
            bits = (bits << 1) | self.read_bit()?.to_u64();
        }
        Ok(bits)
    }

    fn peak_bits(&mut self, num: u32) -> Result<u64, TszError> {
        let saved = self.pos;
        let bits = self.read_bits(num);
        self.pos = saved;
        bits
    }
}
