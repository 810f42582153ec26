use anyhow::{bail, Result};
use log::{error, warn};

use crate::bitstream::{BitReader, StreamLayout};
use crate::codec::adcs_from_symbols;
use crate::codec::channel::{decode_channel, encode_channel, EncodedChannel};
use crate::codec::encoder::ArithmeticEncoder;
use crate::codec::histogram::Histogram;
use crate::codec::reference::ReferenceEncoder;
use crate::codec::table::LookupStrategy;
use crate::config::ModuleConfig;
use crate::traits::coder::IntervalEncode;
use crate::Symbol;

/// The outcome of [`encode_verified`].
#[derive(Clone, Debug)]
pub struct VerifiedChannel {
    pub channel: EncodedChannel,

    /// Whether the production encoder produced a stream that didn't decode back and the
    /// reference encoder had to take over.
    pub diverged: bool,
}

/// Checks that `channel`, laid out in memory with `layout`, decodes back to `syms` and that the
/// decoder consumes exactly the bits that were written.
pub fn check(
    channel: &EncodedChannel,
    syms: &[Symbol],
    layout: StreamLayout,
    strategy: LookupStrategy,
) -> Result<()> {
    let (words, _) = channel.bits.clone().into_words();
    let bytes = layout.to_bytes(&words);
    let decoded = decode_channel(BitReader::new(&bytes, layout, 0), syms.len(), strategy)?;

    if decoded.nbits != channel.nbits {
        bail!(
            "Decoder consumed {} bits, encoder wrote {}",
            decoded.nbits,
            channel.nbits
        );
    }
    let expected = adcs_from_symbols(syms);
    if let Some(idx) = (0..expected.len()).find(|idx| expected[*idx] != decoded.adcs[*idx]) {
        bail!(
            "Sample {} decodes to {:#05x} instead of {:#05x}",
            idx,
            decoded.adcs[idx],
            expected[idx]
        );
    }
    Ok(())
}

/// Encodes channel `ichan` with the production encoder and, when the self-check is enabled,
/// decodes the result back.
pub fn encode_verified(
    ichan: usize,
    syms: &[Symbol],
    hist: &Histogram,
    config: &ModuleConfig,
) -> Result<VerifiedChannel> {
    encode_verified_with::<ArithmeticEncoder>(ichan, syms, hist, config)
}

/// Encodes channel `ichan` with `E` and, when the self-check is enabled, decodes the result back
/// with the configured layout and lookup.
///
/// A stream that doesn't decode is replaced by the output of the reference encoder, which is
/// checked in turn. If that fails too the packet can't be emitted and an error is returned.
pub fn encode_verified_with<E: IntervalEncode>(
    ichan: usize,
    syms: &[Symbol],
    hist: &Histogram,
    config: &ModuleConfig,
) -> Result<VerifiedChannel> {
    let channel = encode_channel::<E>(syms, hist)?;
    if !config.self_check {
        return Ok(VerifiedChannel {
            channel,
            diverged: false,
        });
    }

    let Err(err) = check(&channel, syms, config.layout, config.lookup) else {
        return Ok(VerifiedChannel {
            channel,
            diverged: false,
        });
    };
    warn!(
        "Channel {} failed the self-check ({}), re-encoding with the reference encoder",
        ichan, err
    );

    let channel = encode_channel::<ReferenceEncoder>(syms, hist)?;
    if let Err(err) = check(&channel, syms, config.layout, config.lookup) {
        error!("Channel {} can't be encoded: {}", ichan, err);
        bail!("Codec divergence on channel {}: {}", ichan, err);
    }
    Ok(VerifiedChannel {
        channel,
        diverged: true,
    })
}
