use crate::bitstream::BitReader;
use crate::codec::scaling::{range, scale_hi, scale_lo, scale_m1};
use crate::codec::table::{CumulativeTable, LookupStrategy};
use crate::codec::{CV_MAX, CV_NBITS, HALF, Q1, Q3};
use crate::CodeValue;

/// The arithmetic decoder, mirroring the state of the encoders bit by bit.
///
/// The code value window is primed with [`CV_NBITS`] bits on creation; every renormalization
/// step shifts one more bit in.
#[derive(Clone, Debug)]
pub struct ArithmeticDecoder<'a> {
    reader: BitReader<'a>,
    lo: CodeValue,
    hi: CodeValue,
    value: CodeValue,

    /// Position of the first coded bit.
    start: usize,
}

impl<'a> ArithmeticDecoder<'a> {
    /// Creates a decoder reading the coded bits at the current position of `reader`.
    pub fn new(mut reader: BitReader<'a>) -> Self {
        let start = reader.position();
        let value = reader.read_bits(CV_NBITS) as CodeValue;
        Self {
            reader,
            lo: 0,
            hi: CV_MAX,
            value,
            start,
        }
    }

    /// Decodes the next bin.
    #[inline(always)]
    pub fn decode(&mut self, table: &CumulativeTable, strategy: LookupStrategy) -> usize {
        let range = range(self.lo, self.hi);
        let cum = scale_m1(self.lo, range, self.value);
        let bin = table.lookup(cum, strategy);

        self.hi = scale_hi(self.lo, range, table.upper(bin));
        self.lo = scale_lo(self.lo, range, table.lower(bin));

        loop {
            if self.hi < HALF {
                // nothing to remove
            } else if self.lo >= HALF {
                self.lo -= HALF;
                self.hi -= HALF;
                self.value -= HALF;
            } else if self.lo >= Q1 && self.hi < Q3 {
                self.lo -= Q1;
                self.hi -= Q1;
                self.value -= Q1;
            } else {
                break;
            }
            self.lo = (self.lo << 1) & CV_MAX;
            self.hi = ((self.hi << 1) | 1) & CV_MAX;
            self.value = ((self.value << 1) | self.reader.read_bit()) & CV_MAX;
        }
        bin
    }

    /// The number of coded bits the encoder produced for the bins decoded so far, which is
    /// where the stream of the next channel starts.
    pub fn finish(&self) -> usize {
        self.reader.position() - self.start - CV_NBITS as usize + 2
    }
}
