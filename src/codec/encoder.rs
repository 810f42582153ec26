use crate::bitstream::BitStream64;
use crate::codec::scaling::{range, scale_hi, scale_lo};
use crate::codec::table::CumulativeTable;
use crate::codec::{CV_MAX, CV_NBITS, HALF, Q1};
use crate::traits::coder::IntervalEncode;
use crate::utils::bits::{clo12, clz12, low_mask};
use crate::CodeValue;

/// Mask of the code value bits below the most significant one.
const LOW_MASK: CodeValue = CV_MAX >> 1;

/// The production arithmetic encoder.
///
/// Instead of renormalizing one bit at a time, each symbol is renormalized in a single step:
/// the bits `lo` and `hi` have in common are known and can be emitted right away, while the
/// run of bits following them where `lo` reads 1 and `hi` reads 0 is an underflow that stays
/// pending until the next shared bit resolves its value.
#[derive(Clone, Debug)]
pub struct ArithmeticEncoder {
    lo: CodeValue,
    hi: CodeValue,

    /// Number of underflow bits waiting for the next resolved bit.
    pending: usize,

    /// Bits emitted so far.
    nbits: usize,
}

impl Default for ArithmeticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArithmeticEncoder {
    pub fn new() -> Self {
        Self {
            lo: 0,
            hi: CV_MAX,
            pending: 0,
            nbits: 0,
        }
    }

    #[inline(always)]
    fn renormalize(&mut self, out: &mut BitStream64) {
        let nsame = clz12(self.lo ^ self.hi);
        let mpending = clo12(((self.lo & !self.hi) << (nsame + 1)) & CV_MAX);

        if nsame > 0 {
            let same = (self.lo >> (CV_NBITS - nsame)) as u64;
            let rest = nsame - 1;
            let first = same >> rest;
            emit(out, first, self.pending, same & low_mask(rest), rest);
            self.nbits += nsame as usize + self.pending;
            self.pending = mpending as usize;
        } else {
            self.pending += mpending as usize;
        }

        let nreduce = nsame + mpending;
        self.lo = (self.lo << nreduce) & LOW_MASK;
        self.hi = (((self.hi << nreduce) | low_mask(nreduce) as CodeValue) & LOW_MASK) | HALF;
    }
}

/// Emits `first`, then `pending` copies of its complement, then the `nrest` bits of `rest`.
/// Short sequences are packed into a single insertion.
#[inline(always)]
pub(crate) fn emit(out: &mut BitStream64, first: u64, pending: usize, rest: u64, nrest: u32) {
    let total = 1 + pending + nrest as usize;
    if total <= u64::BITS as usize {
        let run = if first == 0 { low_mask(pending as u32) } else { 0 };
        let bits = (first << (pending + nrest as usize)) | (run << nrest) | rest;
        out.insert(bits, total as u32);
    } else {
        out.insert(first, 1);
        out.insert_run(first == 0, pending);
        out.insert(rest, nrest);
    }
}

impl IntervalEncode for ArithmeticEncoder {
    #[inline(always)]
    fn encode(&mut self, bin: usize, table: &CumulativeTable, out: &mut BitStream64) {
        let range = range(self.lo, self.hi);
        self.hi = scale_hi(self.lo, range, table.upper(bin));
        self.lo = scale_lo(self.lo, range, table.lower(bin));
        self.renormalize(out);
    }

    fn finish(&mut self, out: &mut BitStream64) -> usize {
        self.pending += 1;
        let bit = ((self.lo & Q1) != 0) as u64;
        emit(out, bit, self.pending, 0, 0);
        self.nbits += 1 + self.pending;
        self.pending = 0;
        self.nbits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_composes_runs() {
        let mut out = BitStream64::new();
        emit(&mut out, 0, 3, 0b10, 2);
        emit(&mut out, 1, 2, 0, 0);
        let (words, nbits) = out.into_words();
        assert_eq!(nbits, 9);
        assert_eq!(words[0] >> 55, 0b011110_100);
    }

    #[test]
    fn emit_handles_long_runs() {
        let mut out = BitStream64::new();
        emit(&mut out, 1, 100, 0b1, 1);
        let (words, nbits) = out.into_words();
        assert_eq!(nbits, 102);
        assert_eq!(words[0], 1 << 63);
        assert_eq!(words[1], 1 << 26);
    }

    #[test]
    fn identical_bounds_flush_the_whole_code_value() {
        let mut enc = ArithmeticEncoder::new();
        let mut out = BitStream64::new();
        enc.lo = 0xA5A;
        enc.hi = 0xA5A;
        enc.renormalize(&mut out);
        assert_eq!((enc.lo, enc.hi), (0, CV_MAX));
        let (words, nbits) = out.into_words();
        assert_eq!(nbits, 12);
        assert_eq!(words[0] >> 52, 0xA5A);
    }
}
