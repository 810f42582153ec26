//! Small bit-twiddling helpers shared by the coder and the stream formats.

/// Number of bits needed to represent `value`, that is the position of its most significant
/// set bit plus one. `bitlen(0) == 0`.
#[inline(always)]
pub fn bitlen(value: u64) -> u32 {
    u64::BITS - value.leading_zeros()
}

/// Count of leading zeros of a 12-bit value.
#[inline(always)]
pub fn clz12(value: u32) -> u32 {
    (value & 0xFFF).leading_zeros() - (u32::BITS - 12)
}

/// Count of leading ones of a 12-bit value.
#[inline(always)]
pub fn clo12(value: u32) -> u32 {
    clz12(!value & 0xFFF)
}

/// A mask of the `nbits` least significant bits. Valid for `nbits` up to 64.
#[inline(always)]
pub fn low_mask(nbits: u32) -> u64 {
    if nbits >= u64::BITS {
        u64::MAX
    } else {
        (1_u64 << nbits) - 1
    }
}

/// Extracts the bit field `[lsb + nbits - 1 : lsb]` from `word`.
#[inline(always)]
pub fn field(word: u64, lsb: u32, nbits: u32) -> u64 {
    (word >> lsb) & low_mask(nbits)
}
