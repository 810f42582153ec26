use std::fmt::Display;
use std::ops::Index;

use anyhow::{bail, Result};
use mem_dbg::{MemDbg, MemSize};

use crate::codec::NORM_ONE;
use crate::Freq;

/// How the decoder searches the cumulative table for the interval holding a code value.
///
/// All the strategies return the same bin; they only differ in speed depending on the shape of
/// the distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LookupStrategy {
    /// Binary search over the occupied bins.
    Binary,
    /// Linear scan upward from the first bin. Fast when the small differences dominate, which is
    /// the common case.
    #[default]
    Bottom,
    /// Linear scan downward from the highest occupied bin.
    Top,
}

impl LookupStrategy {
    /// The number of lookup strategies.
    pub const STRATEGIES: usize = 3;
}

impl Display for LookupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupStrategy::Binary => write!(f, "{:<15}", "Binary"),
            LookupStrategy::Bottom => write!(f, "{:<15}", "Bottom"),
            LookupStrategy::Top => write!(f, "{:<15}", "Top"),
        }
    }
}

impl From<usize> for LookupStrategy {
    fn from(value: usize) -> Self {
        match value {
            0 => LookupStrategy::Binary,
            1 => LookupStrategy::Bottom,
            2 => LookupStrategy::Top,
            _ => panic!("Invalid lookup strategy"),
        }
    }
}

/// The integrated histogram of a channel: the probability model driving both the encoder and
/// the decoder.
///
/// Entry `i` is the cumulative count of the bins below `i`, in units of `1 / NORM_ONE`. Bin `i`
/// owns the interval `[self[i], self[i + 1])`. From the highest occupied bin on every entry is
/// 0, which stands for 1.0: the last interval always extends to full scale.
#[derive(Clone, Debug, MemDbg, MemSize)]
pub struct CumulativeTable {
    bounds: Vec<Freq>,

    /// Number of bins up to and including the highest occupied one.
    nsymbols: usize,
}

impl CumulativeTable {
    /// Integrates a vector of bin counts. The counts must sum to less than `NORM_ONE`.
    pub fn from_counts(counts: &[u16]) -> Result<Self> {
        let nsymbols = counts
            .iter()
            .rposition(|cnt| *cnt > 0)
            .map_or(0, |last| last + 1);
        Self::integrate(&counts[..nsymbols], counts.len())
    }

    /// Integrates the counts of the bins of a `nbins` histogram up to its highest occupied one.
    /// The bins after `occupied` are known to be empty and are not looked at.
    pub fn integrate(occupied: &[u16], nbins: usize) -> Result<Self> {
        if occupied.len() > nbins {
            bail!("{} occupied bins in a histogram of {}", occupied.len(), nbins);
        }
        let total = occupied.iter().map(|cnt| *cnt as u32).sum::<u32>();
        if total >= NORM_ONE {
            bail!("Histogram total {} doesn't fit a {} table", total, NORM_ONE);
        }

        let mut bounds = vec![0; nbins + 1];
        let mut cum = 0;
        for (bin, cnt) in occupied.iter().enumerate() {
            bounds[bin] = cum;
            cum += cnt;
        }
        Ok(Self {
            bounds,
            nsymbols: occupied.len(),
        })
    }

    /// Number of bins of the histogram this table comes from.
    #[inline(always)]
    pub fn nbins(&self) -> usize {
        self.bounds.len() - 1
    }

    #[inline(always)]
    pub fn nsymbols(&self) -> usize {
        self.nsymbols
    }

    /// Lower edge of the interval of `bin`.
    #[inline(always)]
    pub fn lower(&self, bin: usize) -> u32 {
        self.bounds[bin] as u32
    }

    /// Upper edge of the interval of `bin`, 0 meaning full scale.
    #[inline(always)]
    pub fn upper(&self, bin: usize) -> u32 {
        self.bounds[bin + 1] as u32
    }

    /// Whether the table codes every symbol into zero bits, that is it holds a single interval
    /// spanning the whole range.
    pub fn is_flat(&self) -> bool {
        self.bounds.iter().all(|bound| *bound == 0)
    }

    /// Finds the bin whose interval holds the cumulative count `cum`: the biggest bin below
    /// [`nsymbols`](Self::nsymbols) whose lower edge is not above `cum`.
    #[inline(always)]
    pub fn lookup(&self, cum: u32, strategy: LookupStrategy) -> usize {
        match strategy {
            LookupStrategy::Binary => self.lookup_binary(cum),
            LookupStrategy::Bottom => self.lookup_bottom(cum),
            LookupStrategy::Top => self.lookup_top(cum),
        }
    }

    fn lookup_binary(&self, cum: u32) -> usize {
        // bounds[0] is always 0, so the partition point is at least 1
        let occupied = &self.bounds[..self.nsymbols];
        occupied.partition_point(|bound| *bound as u32 <= cum).max(1) - 1
    }

    fn lookup_bottom(&self, cum: u32) -> usize {
        let mut bin = 0;
        while bin + 1 < self.nsymbols && self.bounds[bin + 1] as u32 <= cum {
            bin += 1;
        }
        bin
    }

    fn lookup_top(&self, cum: u32) -> usize {
        (1..self.nsymbols)
            .rev()
            .find(|bin| self.bounds[*bin] as u32 <= cum)
            .unwrap_or(0)
    }
}

impl Index<usize> for CumulativeTable {
    type Output = Freq;

    #[inline(always)]
    fn index(&self, bin: usize) -> &Self::Output {
        &self.bounds[bin]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CumulativeTable {
        let mut counts = vec![0_u16; 32];
        counts[0] = 3;
        counts[1] = 500;
        counts[2] = 200;
        counts[3] = 200;
        counts[5] = 100;
        counts[9] = 20;
        CumulativeTable::from_counts(&counts).unwrap()
    }

    #[test]
    fn integration_is_exclusive_and_saturates() {
        let table = table();
        assert_eq!(table.nsymbols(), 10);
        assert_eq!(table[0], 0);
        assert_eq!(table[1], 3);
        assert_eq!(table[2], 503);
        assert_eq!(table[4], 903);
        assert_eq!(table[5], 903);
        assert_eq!(table[9], 1003);
        assert_eq!(table.upper(9), 0);
        assert_eq!(table[32], 0);
    }

    #[test]
    fn constant_channel_is_flat() {
        let mut counts = vec![0_u16; 64];
        counts[1] = 1023;
        let table = CumulativeTable::from_counts(&counts).unwrap();
        assert!(table.is_flat());
        assert_eq!(table.nsymbols(), 2);
        assert_eq!(table.lookup(0, LookupStrategy::Binary), 1);
        assert_eq!(table.lookup(1023, LookupStrategy::Top), 1);
    }

    #[test]
    fn integrating_the_occupied_bins_only() {
        let counts = [3_u16, 500, 200, 200, 0, 100, 0, 0, 0, 20];
        let table = CumulativeTable::integrate(&counts, 32).unwrap();
        assert_eq!(table.nsymbols(), 10);
        assert_eq!(table.nbins(), 32);
        for bin in 0..=32 {
            assert_eq!(table[bin], self::table()[bin]);
        }
        assert!(CumulativeTable::integrate(&[1; 33], 32).is_err());
        assert_eq!(CumulativeTable::integrate(&[], 64).unwrap().nsymbols(), 0);
    }

    #[test]
    fn overfull_histograms_are_rejected() {
        let mut counts = vec![0_u16; 32];
        counts[1] = 1024;
        assert!(CumulativeTable::from_counts(&counts).is_err());
    }

    #[test]
    fn strategies_agree() {
        let table = table();
        for cum in 0..NORM_ONE {
            let expected = table.lookup(cum, LookupStrategy::Top);
            for strategy in 0..LookupStrategy::STRATEGIES {
                assert_eq!(
                    table.lookup(cum, LookupStrategy::from(strategy)),
                    expected,
                    "{} at {}",
                    LookupStrategy::from(strategy),
                    cum
                );
            }
        }
        assert_eq!(table.lookup(2, LookupStrategy::Bottom), 0);
        assert_eq!(table.lookup(903, LookupStrategy::Bottom), 5);
        assert_eq!(table.lookup(1023, LookupStrategy::Binary), 9);
    }
}
