//! The entropy coding engine: symbol mapping, adaptive histograms, fixed-point range scaling
//! and the paired arithmetic encoder/decoder working on a 12-bit code value.

pub mod channel;
pub mod decoder;
pub mod encoder;
pub mod entropy_table;
pub mod histogram;
pub mod reference;
pub mod scaling;
pub mod table;
pub mod verify;

use crate::{Adc, CodeValue, Symbol, ADC_MASK};

/// Width, in bits, of the arithmetic coder's code value.
pub const CV_NBITS: u32 = 12;

/// The full code value range.
pub const CV_MAX: CodeValue = (1 << CV_NBITS) - 1;

/// First quarter boundary of the code value range.
pub const Q1: CodeValue = 1 << (CV_NBITS - 2);

/// Half of the code value range.
pub const HALF: CodeValue = 2 * Q1;

/// Third quarter boundary of the code value range.
pub const Q3: CodeValue = 3 * Q1;

/// Number of fractional bits of the cumulative tables. Cumulative counts are expressed in units
/// of `1 / 2^NORM_NBITS`.
pub const NORM_NBITS: u32 = CV_NBITS - 2;

/// The fixed-point representation of 1.0. It is one more than what a [`Freq`](crate::Freq)
/// table entry can hold, so a table entry equal to it is stored as 0.
pub const NORM_ONE: u32 = 1 << NORM_NBITS;

/// Maps the difference between the current and the previous sample of a channel to a symbol.
///
/// The difference is doubled and tagged with a low 1 bit; negative values are folded so that
/// `0 -> 1`, `+1 -> 3`, `-1 -> 2`, `-2 -> 4` and so on. 0 is never produced and the result
/// fits in [`SYMBOL_NBITS`](crate::SYMBOL_NBITS).
#[inline(always)]
pub fn symbol(cur: Adc, prv: Adc) -> Symbol {
    let diff = ((cur as i32 - prv as i32) << 1) | 1;
    if diff < 0 {
        (-diff + 1) as Symbol
    } else {
        diff as Symbol
    }
}

/// Inverts [`symbol`]: recovers the current sample from its symbol and the previous sample.
#[inline(always)]
pub fn unsymbol(sym: Symbol, prv: Adc) -> Adc {
    let magnitude = (sym >> 1) as i32;
    let diff = if sym & 1 == 1 { magnitude } else { -magnitude };
    ((prv as i32 + diff) as u32 & ADC_MASK) as Adc
}

/// Converts the samples of a channel into its symbol buffer: the first sample is kept verbatim
/// as the seed, every other sample becomes the symbol of its difference with the previous one.
pub fn symbols_from_adcs(adcs: &[Adc]) -> Vec<Symbol> {
    let mut syms = Vec::with_capacity(adcs.len());
    if let Some(first) = adcs.first() {
        syms.push(*first);
        syms.extend(adcs.windows(2).map(|pair| symbol(pair[1], pair[0])));
    }
    syms
}

/// Inverts [`symbols_from_adcs`].
pub fn adcs_from_symbols(syms: &[Symbol]) -> Vec<Adc> {
    let mut adcs = Vec::with_capacity(syms.len());
    if let Some(first) = syms.first() {
        let mut prv = *first;
        adcs.push(prv);
        for sym in &syms[1..] {
            prv = unsymbol(*sym, prv);
            adcs.push(prv);
        }
    }
    adcs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_fold_the_sign() {
        assert_eq!(symbol(100, 100), 1);
        assert_eq!(symbol(101, 100), 3);
        assert_eq!(symbol(99, 100), 2);
        assert_eq!(symbol(98, 100), 4);
        assert_eq!(symbol(0xFFF, 0), 0x1FFF);
        assert_eq!(symbol(0, 0xFFF), 0x1FFE);
    }

    #[test]
    fn symbols_invert() {
        for (cur, prv) in [(0, 0), (0xFFF, 0), (0, 0xFFF), (0x800, 0x7FF), (12, 4000)] {
            assert_eq!(unsymbol(symbol(cur, prv), prv), cur);
        }
    }

    #[test]
    fn seed_is_kept_verbatim() {
        let adcs = vec![0xF00, 0xF00, 0xF01, 0xEFF];
        let syms = symbols_from_adcs(&adcs);
        assert_eq!(syms, vec![0xF00, 1, 3, 4]);
        assert_eq!(adcs_from_symbols(&syms), adcs);
    }
}
