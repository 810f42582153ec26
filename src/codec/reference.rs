//! The textbook bit-at-a-time arithmetic encoder.
//!
//! It is slow, but its renormalization loop is the direct statement of the coding rules, so it
//! is what the self-check falls back to when the production encoder produces an undecodable
//! stream. Both encoders emit the same bits.

use crate::bitstream::BitStream64;
use crate::codec::encoder::emit;
use crate::codec::scaling::{range, scale_hi, scale_lo};
use crate::codec::table::CumulativeTable;
use crate::codec::{CV_MAX, HALF, Q1, Q3};
use crate::traits::coder::IntervalEncode;
use crate::CodeValue;

#[derive(Clone, Debug)]
pub struct ReferenceEncoder {
    lo: CodeValue,
    hi: CodeValue,
    pending: usize,
    nbits: usize,
}

impl Default for ReferenceEncoder {
    fn default() -> Self {
        Self {
            lo: 0,
            hi: CV_MAX,
            pending: 0,
            nbits: 0,
        }
    }
}

impl ReferenceEncoder {
    fn emit_bit(&mut self, bit: u64, out: &mut BitStream64) {
        emit(out, bit, self.pending, 0, 0);
        self.nbits += 1 + self.pending;
        self.pending = 0;
    }
}

impl IntervalEncode for ReferenceEncoder {
    fn encode(&mut self, bin: usize, table: &CumulativeTable, out: &mut BitStream64) {
        let range = range(self.lo, self.hi);
        self.hi = scale_hi(self.lo, range, table.upper(bin));
        self.lo = scale_lo(self.lo, range, table.lower(bin));

        loop {
            if self.hi < HALF {
                self.emit_bit(0, out);
            } else if self.lo >= HALF {
                self.emit_bit(1, out);
                self.lo -= HALF;
                self.hi -= HALF;
            } else if self.lo >= Q1 && self.hi < Q3 {
                self.pending += 1;
                self.lo -= Q1;
                self.hi -= Q1;
            } else {
                break;
            }
            self.lo = (self.lo << 1) & CV_MAX;
            self.hi = ((self.hi << 1) | 1) & CV_MAX;
        }
    }

    fn finish(&mut self, out: &mut BitStream64) -> usize {
        self.pending += 1;
        let bit = if self.lo < Q1 { 0 } else { 1 };
        self.emit_bit(bit, out);
        self.nbits
    }
}
