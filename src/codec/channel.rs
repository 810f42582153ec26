//! The self-contained bit string of one channel: a small header, the bin counts the decoder
//! rebuilds the model from, the verbatim payloads of the escaped symbols and, last, the
//! arithmetic-coded bins.

use anyhow::{bail, Result};
use mem_dbg::{MemDbg, MemSize};

use crate::bitstream::{BitReader, BitStream64};
use crate::codec::decoder::ArithmeticDecoder;
use crate::codec::histogram::{classify, Histogram, ESCAPE_BIN, VALID_NBINS};
use crate::codec::table::{CumulativeTable, LookupStrategy};
use crate::codec::{symbols_from_adcs, unsymbol};
use crate::traits::coder::IntervalEncode;
use crate::utils::bits::bitlen;
use crate::{Adc, Symbol, ADC_MASK, ADC_NBITS, PACKET_NSAMPLES};

/// Version of the channel format.
pub const CHANNEL_FORMAT: u64 = 0;

const FORMAT_NBITS: u32 = 4;
const NBINS_NBITS: u32 = 8;
const MBITS_NBITS: u32 = 4;
const NOBITS_NBITS: u32 = 4;

/// Number of bits of the channel header.
pub const HEADER_NBITS: usize =
    (FORMAT_NBITS + NBINS_NBITS + MBITS_NBITS + ADC_NBITS as u32 + NOBITS_NBITS) as usize;

/// The compressed representation of one channel of a packet.
#[derive(Clone, Debug, MemDbg, MemSize)]
pub struct EncodedChannel {
    pub bits: BitStream64,

    /// Total length in bits.
    pub nbits: usize,

    /// Bits taken by the header, the bin counts and the overflow payloads.
    pub table_bits: usize,

    /// The size of the coded bins as estimated by the histogram.
    pub esize: u32,
}

impl EncodedChannel {
    /// Bits taken by the arithmetic-coded bins.
    pub fn coded_bits(&self) -> usize {
        self.nbits - self.table_bits
    }
}

/// A channel recovered from its bit string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedChannel {
    pub adcs: Vec<Adc>,

    /// Bits read, which always match the [`EncodedChannel::nbits`] they were written with.
    pub nbits: usize,
}

/// Width of a bin count field, given how many symbols are still unaccounted for.
#[inline(always)]
fn count_width(mbits: u32, left: usize) -> u32 {
    mbits.min(bitlen(left as u64))
}

/// Encodes a channel whose symbols have already been accounted for in `hist`.
///
/// `syms` holds the seed sample followed by the symbols of the differences.
pub fn encode_channel<E: IntervalEncode>(syms: &[Symbol], hist: &Histogram) -> Result<EncodedChannel> {
    let Some((seed, diffs)) = syms.split_first() else {
        bail!("Can't encode an empty channel");
    };
    if syms.len() > PACKET_NSAMPLES {
        bail!("A channel holds at most {} samples, got {}", PACKET_NSAMPLES, syms.len());
    }
    if *seed as u32 > ADC_MASK {
        bail!("Seed sample {:#x} is wider than {} bits", seed, ADC_NBITS);
    }
    if hist.total() != diffs.len() {
        bail!(
            "Histogram accounts for {} symbols but the channel has {}",
            hist.total(),
            diffs.len()
        );
    }

    let nbins = hist.nbins();
    let nobits = hist.nobits();
    let mbits = bitlen(hist.max_count() as u64);
    let (table, esize) = hist.integrate_and_size()?;

    let mut out = BitStream64::with_capacity((esize as usize + HEADER_NBITS) / 64 + 2);
    out.insert(CHANNEL_FORMAT, FORMAT_NBITS);
    out.insert(nbins as u64 - 1, NBINS_NBITS);
    out.insert(mbits as u64, MBITS_NBITS);
    out.insert(*seed as u64, ADC_NBITS as u32);
    out.insert(nobits as u64, NOBITS_NBITS);

    let mut left = diffs.len();
    for cnt in hist.counts() {
        out.insert(cnt as u64, count_width(mbits, left));
        left -= cnt as usize;
    }

    for sym in diffs {
        if let (_, Some(ovr)) = classify(*sym, nbins) {
            out.insert(ovr as u64, nobits);
        }
    }
    let table_bits = out.len();

    if !diffs.is_empty() {
        let mut enc = E::default();
        for sym in diffs {
            enc.encode(classify(*sym, nbins).0, &table, &mut out);
        }
        enc.finish(&mut out);
    }

    Ok(EncodedChannel {
        nbits: out.len(),
        bits: out,
        table_bits,
        esize,
    })
}

/// Builds the histogram of `adcs` and encodes them.
pub fn encode_adcs<E: IntervalEncode>(adcs: &[Adc], nbins: usize) -> Result<EncodedChannel> {
    let syms = symbols_from_adcs(adcs);
    let mut hist = Histogram::new(nbins)?;
    for sym in syms.iter().skip(1) {
        hist.bump(*sym)?;
    }
    encode_channel::<E>(&syms, &hist)
}

/// Decodes the `nsamples` samples of the channel starting at the position of `reader`.
pub fn decode_channel(
    mut reader: BitReader,
    nsamples: usize,
    strategy: LookupStrategy,
) -> Result<DecodedChannel> {
    if nsamples == 0 || nsamples > PACKET_NSAMPLES {
        bail!("Invalid number of samples {}", nsamples);
    }
    let start = reader.position();

    let format = reader.read_bits(FORMAT_NBITS);
    if format != CHANNEL_FORMAT {
        bail!("Unknown channel format {}", format);
    }
    let nbins = reader.read_bits(NBINS_NBITS) as usize + 1;
    if !VALID_NBINS.contains(&nbins) {
        bail!("Invalid number of bins {}", nbins);
    }
    let mbits = reader.read_bits(MBITS_NBITS) as u32;
    let seed = reader.read_bits(ADC_NBITS as u32) as Adc;
    let nobits = reader.read_bits(NOBITS_NBITS) as u32;

    let mut left = nsamples - 1;
    let mut counts = Vec::with_capacity(nbins);
    for _ in 0..nbins {
        let cnt = reader.read_bits(count_width(mbits, left)) as usize;
        if cnt > left {
            bail!("Bin count {} exceeds the {} samples left", cnt, left);
        }
        left -= cnt;
        counts.push(cnt as u16);
    }
    if left != 0 {
        bail!("Bin counts miss {} of {} samples", left, nsamples - 1);
    }
    let table = CumulativeTable::from_counts(&counts)?;

    let overflows = (0..counts[ESCAPE_BIN])
        .map(|_| reader.read_bits(nobits) as Symbol)
        .collect::<Vec<_>>();
    let mut overflows = overflows.into_iter();

    let mut adcs = Vec::with_capacity(nsamples);
    adcs.push(seed);
    let mut nbits = reader.position() - start;

    if nsamples > 1 {
        let mut dec = ArithmeticDecoder::new(reader);
        let mut prv = seed;
        for _ in 1..nsamples {
            let bin = dec.decode(&table, strategy);
            let sym = if bin == ESCAPE_BIN {
                match overflows.next() {
                    Some(ovr) => ovr + nbins as Symbol,
                    None => bail!("More escapes than overflow payloads"),
                }
            } else {
                bin as Symbol
            };
            prv = unsymbol(sym, prv);
            adcs.push(prv);
        }
        nbits += dec.finish();
    }

    Ok(DecodedChannel { adcs, nbits })
}
