//! Fixed-point mapping of a cumulative-count interval onto the current code value range.
//!
//! Both the encoder and the decoder go through these two functions, so they must stay
//! bit-identical between the two sides. Cumulative counts have [`NORM_NBITS`] fractional bits;
//! the count `NORM_ONE` (1.0) can't be stored in a table and is represented by 0, which is only
//! meaningful as an upper edge.

use super::{CV_MAX, NORM_NBITS};
use crate::CodeValue;

/// Number of values in `[lo, hi]`. Needs one bit more than a code value.
#[inline(always)]
pub fn range(lo: CodeValue, hi: CodeValue) -> u32 {
    hi - lo + 1
}

/// Lower edge of the sub-range covering the cumulative count `freq`:
/// `lo + floor(range * freq / 2^N)`.
#[inline(always)]
pub fn scale_lo(lo: CodeValue, range: u32, freq: u32) -> CodeValue {
    ((range * freq + (lo << NORM_NBITS)) >> NORM_NBITS) & CV_MAX
}

/// Inclusive upper edge of the sub-range ending at the cumulative count `freq`:
/// `lo - 1 + floor(range * freq / 2^N)`.
///
/// A `freq` of 0 stands for 1.0 and maps to the top of the current range.
#[inline(always)]
pub fn scale_hi(lo: CodeValue, range: u32, freq: u32) -> CodeValue {
    if freq == 0 {
        return (lo + range - 1) & CV_MAX;
    }
    // `range * freq` is at least 2^N whenever a symbol can be coded, the subtraction of the
    // borrowed 1 never underflows
    ((range * freq + (lo << NORM_NBITS) - (1 << NORM_NBITS)) >> NORM_NBITS) & CV_MAX
}

/// Inverse of the scaling used by the decoder: the cumulative count the code value `value`
/// falls in, `floor(((value - lo + 1) * 2^N - 1) / range)`.
#[inline(always)]
pub fn scale_m1(lo: CodeValue, range: u32, value: CodeValue) -> u32 {
    (((value - lo + 1) << NORM_NBITS) - 1) / range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NORM_ONE;

    #[test]
    fn full_range_maps_onto_itself() {
        let r = range(0, CV_MAX);
        assert_eq!(r, 4096);
        assert_eq!(scale_lo(0, r, 0), 0);
        assert_eq!(scale_hi(0, r, 0), CV_MAX);
        assert_eq!(scale_hi(0, r, NORM_ONE), CV_MAX);
        assert_eq!(scale_lo(0, r, 512), 2048);
        assert_eq!(scale_hi(0, r, 512), 2047);
    }

    #[test]
    fn sub_ranges_tile_the_range() {
        let (lo, hi) = (0x123, 0xDEF);
        let r = range(lo, hi);
        for freq in 1..NORM_ONE {
            // the interval ending at freq is immediately followed by the one starting at freq
            assert_eq!(scale_hi(lo, r, freq) + 1, scale_lo(lo, r, freq));
        }
        assert_eq!(scale_hi(lo, r, 0), hi);
    }

    #[test]
    fn inverse_scaling_finds_the_interval() {
        let (lo, hi) = (0x200, 0xA00);
        let r = range(lo, hi);
        for value in lo..=hi {
            let cum = scale_m1(lo, r, value);
            assert!(cum < NORM_ONE);
            assert!(scale_lo(lo, r, cum) <= value);
            assert!(value <= scale_hi(lo, r, cum + 1));
        }
    }
}
