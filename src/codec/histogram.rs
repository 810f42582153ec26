use std::fmt::Display;

use anyhow::{bail, Result};
use mem_dbg::{MemDbg, MemSize};

use crate::codec::entropy_table::scaled_entropy;
use crate::codec::table::CumulativeTable;
use crate::utils::bits::bitlen;
use crate::utils::entropy;
use crate::{Symbol, MAX_SYMBOL, PACKET_NSAMPLES};

/// The bin counts the histogram can be sized with.
pub const VALID_NBINS: [usize; 3] = [32, 64, 128];

/// The bin used as escape interval for the symbols that don't fit in the histogram.
pub const ESCAPE_BIN: usize = 0;

/// Where a symbol goes in a histogram with `nbins` bins: its bin and, for escaped symbols, the
/// overflow payload that must be sent verbatim.
#[inline(always)]
pub fn classify(sym: Symbol, nbins: usize) -> (usize, Option<Symbol>) {
    let sym = sym as usize;
    if sym < nbins {
        (sym, None)
    } else {
        (ESCAPE_BIN, Some((sym - nbins) as Symbol))
    }
}

/// The adaptive model of one channel: how many times each symbol occurred in the current packet.
///
/// Bins are never zeroed. A bin that wasn't touched since the last [`clear`](Self::clear) reads
/// as 0, so that clearing costs the same no matter the number of bins.
#[derive(Clone, Debug, MemDbg, MemSize)]
pub struct Histogram {
    bins: Vec<u16>,

    /// Bit `i` is set once bin `i` has been incremented in the current packet.
    touched: u128,

    /// The highest bin holding at least 1, 2 and 4 counts respectively.
    last_gt0: usize,
    last_gt1: usize,
    last_gt2: usize,

    max_count: u16,

    /// Smallest and biggest overflow payload of the escaped symbols.
    ovr_min: Symbol,
    ovr_max: Symbol,

    /// Bits needed by the biggest overflow payload.
    nobits: u32,

    /// Number of symbols bumped since the last clear.
    total: usize,
}

impl Histogram {
    /// Creates an empty histogram with `nbins` bins.
    pub fn new(nbins: usize) -> Result<Self> {
        if !VALID_NBINS.contains(&nbins) {
            bail!("Invalid number of bins {}: must be one of {:?}", nbins, VALID_NBINS);
        }
        let mut hist = Self {
            bins: vec![0; nbins],
            touched: 0,
            last_gt0: 0,
            last_gt1: 0,
            last_gt2: 0,
            max_count: 0,
            ovr_min: 0,
            ovr_max: 0,
            nobits: 0,
            total: 0,
        };
        hist.clear();
        Ok(hist)
    }

    /// Logically empties the histogram.
    pub fn clear(&mut self) {
        self.touched = 0;
        self.last_gt0 = 0;
        self.last_gt1 = 0;
        self.last_gt2 = 0;
        self.max_count = 0;
        self.ovr_min = MAX_SYMBOL;
        self.ovr_max = 0;
        self.nobits = 0;
        self.total = 0;
    }

    /// Accounts for one occurrence of `sym`.
    pub fn bump(&mut self, sym: Symbol) -> Result<()> {
        if sym > MAX_SYMBOL {
            bail!("Symbol {:#x} is wider than {} bits", sym, crate::SYMBOL_NBITS);
        }
        if self.total >= PACKET_NSAMPLES - 1 {
            bail!(
                "Histogram is full: a packet holds at most {} symbols",
                PACKET_NSAMPLES - 1
            );
        }

        let (bin, overflow) = classify(sym, self.nbins());
        if let Some(ovr) = overflow {
            self.ovr_min = self.ovr_min.min(ovr);
            self.ovr_max = self.ovr_max.max(ovr);
            self.nobits = bitlen(self.ovr_max as u64);
        }

        let cnt = self.count(bin);
        if bin > self.last_gt0 {
            self.last_gt0 = bin;
        }
        if cnt >= 1 && bin > self.last_gt1 {
            self.last_gt1 = bin;
        }
        if cnt >= 3 && bin > self.last_gt2 {
            self.last_gt2 = bin;
        }

        let cnt = cnt + 1;
        self.bins[bin] = cnt;
        self.touched |= 1_u128 << bin;
        self.max_count = self.max_count.max(cnt);
        self.total += 1;
        Ok(())
    }

    #[inline(always)]
    pub fn nbins(&self) -> usize {
        self.bins.len()
    }

    /// `log2` of the number of bins.
    #[inline(always)]
    pub fn nbits(&self) -> u32 {
        self.nbins().trailing_zeros()
    }

    /// The count of `bin`, taking care of untouched bins.
    #[inline(always)]
    pub fn count(&self, bin: usize) -> u16 {
        if self.touched & (1_u128 << bin) != 0 {
            self.bins[bin]
        } else {
            0
        }
    }

    /// The counts of all the bins.
    pub fn counts(&self) -> Vec<u16> {
        (0..self.nbins()).map(|bin| self.count(bin)).collect()
    }

    /// Number of symbols that didn't fit the histogram and were escaped.
    #[inline(always)]
    pub fn overflow_count(&self) -> usize {
        self.count(ESCAPE_BIN) as usize
    }

    /// Smallest and biggest overflow payloads, if anything overflowed.
    pub fn overflow_range(&self) -> Option<(Symbol, Symbol)> {
        if self.overflow_count() == 0 {
            None
        } else {
            Some((self.ovr_min, self.ovr_max))
        }
    }

    /// Width of the overflow payload fields.
    #[inline(always)]
    pub fn nobits(&self) -> u32 {
        self.nobits
    }

    #[inline(always)]
    pub fn max_count(&self) -> u16 {
        self.max_count
    }

    #[inline(always)]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Highest occupied bin.
    #[inline(always)]
    pub fn last_gt0(&self) -> usize {
        self.last_gt0
    }

    /// Highest bin with more than one count.
    #[inline(always)]
    pub fn last_gt1(&self) -> usize {
        self.last_gt1
    }

    /// Highest bin with more than three counts.
    #[inline(always)]
    pub fn last_gt2(&self) -> usize {
        self.last_gt2
    }

    /// Number of bins up to and including the highest occupied one.
    #[inline(always)]
    pub fn nsymbols(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            self.last_gt0 + 1
        }
    }

    /// Integrates the histogram into the cumulative table used to code its symbols and estimates,
    /// from the precomputed entropy table, the number of bits the coded stream will take.
    ///
    /// Only the bins up to the highest occupied one are visited.
    pub fn integrate_and_size(&self) -> Result<(CumulativeTable, u32)> {
        let nbins = self.nbins();
        let occupied = (0..self.nsymbols())
            .map(|bin| self.count(bin))
            .collect::<Vec<_>>();
        let esize = occupied
            .iter()
            .map(|cnt| scaled_entropy(*cnt as usize, nbins))
            .sum::<u32>();
        let esize = (esize >> self.nbits()) + 1 + self.overflow_count() as u32 * self.nobits;
        let table = CumulativeTable::integrate(&occupied, nbins)?;
        Ok((table, esize))
    }

    /// Size in bits of an ideal entropy coding of the bumped symbols, overflow payloads included.
    pub fn entropy_bits(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let counts = self.counts().into_iter().map(u32::from).collect::<Vec<_>>();
        entropy(&counts, self.total as f64) * self.total as f64
            + (self.overflow_count() as u32 * self.nobits) as f64
    }
}

impl Display for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "last gt2:gt1:gt0 {}:{}:{} max {} overflow {} ({} bits)",
            self.last_gt2,
            self.last_gt1,
            self.last_gt0,
            self.max_count,
            self.overflow_count(),
            self.nobits
        )?;
        for (row, counts) in self.counts().chunks(32).enumerate() {
            write!(f, "{:02x}:", row * 32)?;
            for (col, cnt) in counts.iter().enumerate() {
                let sep = if col % 16 == 0 {
                    ':'
                } else if col % 8 == 0 {
                    '.'
                } else {
                    ' '
                };
                write!(f, "{}{:03x}", sep, cnt)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_sizes() {
        assert!(Histogram::new(16).is_err());
        assert!(Histogram::new(48).is_err());
        assert!(Histogram::new(128).is_ok());
    }

    #[test]
    fn escaped_symbols_go_to_bin_zero() {
        let mut hist = Histogram::new(32).unwrap();
        hist.bump(1).unwrap();
        hist.bump(40).unwrap();
        hist.bump(33).unwrap();
        assert_eq!(hist.overflow_count(), 2);
        assert_eq!(hist.overflow_range(), Some((1, 8)));
        assert_eq!(hist.nobits(), 4);
        assert_eq!(hist.count(1), 1);
    }

    #[test]
    fn trackers_follow_pre_increment_counts() {
        let mut hist = Histogram::new(32).unwrap();
        for _ in 0..4 {
            hist.bump(3).unwrap();
        }
        hist.bump(7).unwrap();
        hist.bump(7).unwrap();
        hist.bump(9).unwrap();
        assert_eq!(hist.last_gt0(), 9);
        assert_eq!(hist.last_gt1(), 7);
        assert_eq!(hist.last_gt2(), 3);
        assert_eq!(hist.max_count(), 4);
    }

    #[test]
    fn integration_stops_at_the_highest_occupied_bin() {
        let mut hist = Histogram::new(128).unwrap();
        assert_eq!(hist.nsymbols(), 0);
        hist.bump(100).unwrap();
        hist.bump(9).unwrap();
        hist.bump(1).unwrap();
        hist.bump(1000).unwrap();
        assert_eq!(hist.nsymbols(), 101);

        let (table, _) = hist.integrate_and_size().unwrap();
        let full = CumulativeTable::from_counts(&hist.counts()).unwrap();
        assert_eq!(table.nsymbols(), full.nsymbols());
        assert_eq!(table.nbins(), 128);
        for bin in 0..=128 {
            assert_eq!(table[bin], full[bin], "bin {}", bin);
        }

        hist.clear();
        hist.bump(0x1FFF).unwrap();
        assert_eq!(hist.nsymbols(), 1);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut hist = Histogram::new(64).unwrap();
        hist.bump(5).unwrap();
        hist.bump(500).unwrap();
        hist.clear();
        assert_eq!(hist.counts(), vec![0; 64]);
        assert_eq!(hist.overflow_range(), None);
        assert_eq!(hist.total(), 0);
        hist.bump(5).unwrap();
        assert_eq!(hist.count(5), 1);
    }

    #[test]
    fn too_many_symbols_are_rejected() {
        let mut hist = Histogram::new(32).unwrap();
        for _ in 0..PACKET_NSAMPLES - 1 {
            hist.bump(1).unwrap();
        }
        assert!(hist.bump(1).is_err());
        assert!(hist.bump(MAX_SYMBOL + 1).is_err());
    }

    #[test]
    fn size_estimate_tracks_entropy() {
        let mut hist = Histogram::new(32).unwrap();
        for idx in 0..PACKET_NSAMPLES - 1 {
            hist.bump([1, 2, 3, 4][idx % 4]).unwrap();
        }
        let (_, esize) = hist.integrate_and_size().unwrap();
        let exact = hist.entropy_bits();
        assert!((esize as f64 - exact).abs() < 8.0, "{} vs {}", esize, exact);
    }
}
