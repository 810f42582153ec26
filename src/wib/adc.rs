//! Unpacking of the 12-bit ADCs of a frame.
//!
//! The 12 data words of a cold-data link are a sequence of 16 groups of 48 bits, each holding
//! four ADCs with their nibbles interleaved.

use crate::utils::bits::field;
use crate::wib::{LINK_NCHANNELS, LINK_NDATA, LINK_OFFSETS, NLINKS};
use crate::{Adc, MODULE_NCHANNELS};

/// Number of 48-bit groups in the data of a link.
const NGROUPS: usize = 16;

/// Splits three data words into their four 48-bit groups.
#[inline(always)]
fn groups(a0: u64, a1: u64, a2: u64) -> [u64; 4] {
    [
        field(a0, 0, 48),
        field(a1, 0, 32) << 16 | field(a0, 48, 16),
        field(a2, 0, 16) << 32 | field(a1, 32, 32),
        field(a2, 16, 48),
    ]
}

/// Unpacks the four ADCs of a group.
#[inline(always)]
fn unpack(g: u64) -> [Adc; 4] {
    [
        (field(g, 16, 4) << 8 | field(g, 0, 8)) as Adc,
        (field(g, 24, 4) << 8 | field(g, 8, 8)) as Adc,
        (field(g, 32, 8) << 4 | field(g, 20, 4)) as Adc,
        (field(g, 40, 8) << 4 | field(g, 28, 4)) as Adc,
    ]
}

/// Packs four ADCs into a group.
#[inline(always)]
pub(crate) fn pack(adcs: [Adc; 4]) -> u64 {
    let a = adcs.map(|adc| adc as u64 & 0xFFF);
    (a[0] & 0xFF)
        | (a[1] & 0xFF) << 8
        | (a[0] >> 8) << 16
        | (a[2] & 0xF) << 20
        | (a[1] >> 8) << 24
        | (a[3] & 0xF) << 28
        | (a[2] >> 4) << 32
        | (a[3] >> 4) << 40
}

/// Packs the 64 ADCs of a link into its 12 data words.
pub(crate) fn pack_link(adcs: &[Adc]) -> [u64; LINK_NDATA] {
    let mut words = [0; LINK_NDATA];
    for (k, chunk) in adcs.chunks(16).take(LINK_NDATA / 3).enumerate() {
        let g = [0, 1, 2, 3].map(|j| pack([0, 1, 2, 3].map(|i| chunk[4 * j + i])));
        words[3 * k] = g[0] | (g[1] & 0xFFFF) << 48;
        words[3 * k + 1] = g[1] >> 16 | (g[2] & 0xFFFF_FFFF) << 32;
        words[3 * k + 2] = g[2] >> 32 | g[3] << 16;
    }
    words
}

/// Extracts the 128 ADCs of a frame, link 0 first.
pub fn extract_adcs(frame: &[u64]) -> [Adc; MODULE_NCHANNELS] {
    let mut adcs = [0; MODULE_NCHANNELS];
    for link in 0..NLINKS {
        let data = &frame[LINK_OFFSETS[link] + 2..][..LINK_NDATA];
        let out = &mut adcs[link * LINK_NCHANNELS..][..LINK_NCHANNELS];
        for k in 0..NGROUPS / 4 {
            let g = groups(data[3 * k], data[3 * k + 1], data[3 * k + 2]);
            for (j, group) in g.iter().enumerate() {
                out[16 * k + 4 * j..][..4].copy_from_slice(&unpack(*group));
            }
        }
    }
    adcs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibbles_are_interleaved() {
        let g = pack([0xABC, 0xDEF, 0x123, 0x456]);
        assert_eq!(g, 0x4512_6D3A_EFBC);
        assert_eq!(unpack(g), [0xABC, 0xDEF, 0x123, 0x456]);
    }

    #[test]
    fn links_round_trip() {
        let adcs = (0..LINK_NCHANNELS as u16).map(|i| i * 61 % 4096).collect::<Vec<_>>();
        let words = pack_link(&adcs);
        let mut frame = [0_u64; 30];
        frame[4..16].copy_from_slice(&words);
        frame[18..30].copy_from_slice(&words);
        let extracted = extract_adcs(&frame);
        assert_eq!(&extracted[..64], &adcs[..]);
        assert_eq!(&extracted[64..], &adcs[..]);
    }
}
