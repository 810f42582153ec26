use std::fmt::Display;

use clap::ValueEnum;

/// How an MSB-first bit stream is laid out in a byte buffer.
///
/// The logical stream is always the same; the layouts only differ in where logical byte `i`
/// lives in memory. A big-endian host sees `Bytes` and `Words32Swapped` as identical; on a
/// little-endian host the 32-bit word layout needs every word byte swapped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StreamLayout {
    /// A plain byte stream, first byte holding the first 8 bits.
    Bytes,
    /// A sequence of 32-bit words, each stored little-endian.
    Words32Swapped,
    /// A sequence of 64-bit words, each stored little-endian. This is what the raw output words
    /// of [`BitStream64`](super::BitStream64) look like in the memory of a little-endian host.
    #[default]
    Words64,
}

impl StreamLayout {
    /// Maps a logical byte index to its address in a buffer with this layout.
    #[inline(always)]
    pub fn address(&self, index: usize) -> usize {
        match self {
            StreamLayout::Bytes => index,
            StreamLayout::Words32Swapped => index ^ 3,
            StreamLayout::Words64 => index ^ 7,
        }
    }

    /// Serializes 64-bit MSB-first stream words into a byte buffer with this layout.
    pub fn to_bytes(&self, words: &[u64]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(words.len() * 8);
        for word in words {
            match self {
                StreamLayout::Bytes => bytes.extend_from_slice(&word.to_be_bytes()),
                StreamLayout::Words32Swapped => {
                    bytes.extend_from_slice(&((word >> 32) as u32).to_le_bytes());
                    bytes.extend_from_slice(&(*word as u32).to_le_bytes());
                }
                StreamLayout::Words64 => bytes.extend_from_slice(&word.to_le_bytes()),
            }
        }
        bytes
    }
}

impl Display for StreamLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamLayout::Bytes => write!(f, "{:<15}", "Bytes"),
            StreamLayout::Words32Swapped => write!(f, "{:<15}", "Words32Swapped"),
            StreamLayout::Words64 => write!(f, "{:<15}", "Words64"),
        }
    }
}

/// A cursor reading an MSB-first bit stream out of a byte buffer.
///
/// Reads past the end of the buffer return zero bits. The arithmetic decoder primes its code
/// value with more bits than the encoder may have written for short streams, so this is
/// relied upon.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    layout: StreamLayout,
    /// Index of the next bit to read.
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader positioned on bit `bit_offset` of the logical stream.
    pub fn new(bytes: &'a [u8], layout: StreamLayout, bit_offset: usize) -> Self {
        Self {
            bytes,
            layout,
            pos: bit_offset,
        }
    }

    #[inline(always)]
    fn byte(&self, index: usize) -> u8 {
        self.bytes
            .get(self.layout.address(index))
            .copied()
            .unwrap_or(0)
    }

    /// Reads a single bit.
    #[inline(always)]
    pub fn read_bit(&mut self) -> u32 {
        let byte = self.byte(self.pos >> 3);
        let bit = (byte >> (7 - (self.pos & 7))) & 1;
        self.pos += 1;
        bit as u32
    }

    /// Reads `nbits` bits, at most 64, returning them right justified.
    pub fn read_bits(&mut self, nbits: u32) -> u64 {
        assert!(nbits <= u64::BITS, "can't read more than 64 bits at once");
        let mut value = 0_u64;
        let mut left = nbits;

        // head: finish the current byte
        while left > 0 && self.pos & 7 != 0 {
            value = (value << 1) | self.read_bit() as u64;
            left -= 1;
        }
        // body: whole bytes
        while left >= 8 {
            value = (value << 8) | self.byte(self.pos >> 3) as u64;
            self.pos += 8;
            left -= 8;
        }
        // tail
        while left > 0 {
            value = (value << 1) | self.read_bit() as u64;
            left -= 1;
        }
        value
    }

    /// Index of the next bit to read.
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: [u64; 2] = [0x0123_4567_89AB_CDEF, 0xF0E1_D2C3_B4A5_9687];

    #[test]
    fn all_layouts_read_the_same_stream() {
        for layout in [
            StreamLayout::Bytes,
            StreamLayout::Words32Swapped,
            StreamLayout::Words64,
        ] {
            let bytes = layout.to_bytes(&WORDS);
            let mut reader = BitReader::new(&bytes, layout, 0);
            assert_eq!(reader.read_bits(4), 0x0, "{layout}");
            assert_eq!(reader.read_bits(12), 0x123, "{layout}");
            assert_eq!(reader.read_bits(64), 0x4567_89AB_CDEF_F0E1, "{layout}");
            assert_eq!(reader.read_bit(), 1, "{layout}");
            assert_eq!(reader.position(), 81);
        }
    }

    #[test]
    fn words32_swapped_is_byte_swapped_bytes() {
        let bytes = StreamLayout::Words32Swapped.to_bytes(&WORDS[..1]);
        assert_eq!(bytes, vec![0x67, 0x45, 0x23, 0x01, 0xEF, 0xCD, 0xAB, 0x89]);
    }

    #[test]
    fn reading_past_the_end_yields_zeros() {
        let bytes = StreamLayout::Bytes.to_bytes(&[u64::MAX]);
        let mut reader = BitReader::new(&bytes, StreamLayout::Bytes, 60);
        assert_eq!(reader.read_bits(12), 0xF00);
    }
}
