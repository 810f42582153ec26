use std::hint::black_box;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use dsi_progress_logger::*;
use dune_wib_compress::bitstream::StreamLayout;
use dune_wib_compress::codec::table::LookupStrategy;
use dune_wib_compress::packet::{PacketArchive, PacketReader};
use dune_wib_compress::wib::extract_adcs;
use dune_wib_compress::wib::file::load_frames;
use dune_wib_compress::wib::FRAME_NWORDS;
use itertools::Itertools;
use log::{error, info};

#[derive(Parser, Debug)]
#[command(about = "Decodes stored packets and checks them against the frames", long_about = None)]
struct Args {
    /// The packets, as stored by wibcomp.
    packets: PathBuf,

    /// The frames the packets were made from. When given, every decoded sample is checked.
    frames: Option<PathBuf>,

    /// How the decoder sees the packet words in memory.
    #[clap(long, value_enum, default_value_t = StreamLayout::Words64)]
    layout: StreamLayout,

    /// The cumulative table lookup used by the decoder.
    #[clap(long, value_enum, default_value_t = LookupStrategy::Bottom)]
    lookup: LookupStrategy,
}

pub fn main() -> Result<()> {
    stderrlog::new()
        .verbosity(2)
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .unwrap();

    let args = Args::parse();

    let archive = PacketArchive::load(&args.packets)?;
    let frames = args.frames.as_ref().map(load_frames).transpose()?;
    let mut frames = frames.as_deref().map(|words| words.chunks_exact(FRAME_NWORDS));

    let mut pl = ProgressLogger::default();
    pl.item_name("packet").expected_updates(Some(archive.len()));
    pl.start("Decoding packets...");

    let start = Instant::now();
    let mut nsamples = 0;
    let mut nmismatches = 0;
    for (ipacket, words) in archive.iter().enumerate() {
        let reader = PacketReader::parse(words)?;
        let channels = reader.decode_all(args.layout, args.lookup)?;
        nsamples += channels.iter().flatten().map(|adcs| adcs.len()).sum::<usize>();

        if let Some(frames) = frames.as_mut() {
            let expected = frames.by_ref().take(reader.nsamples()).map(extract_adcs).collect_vec();
            if expected.len() != reader.nsamples() {
                bail!("Packet {} goes past the end of the frames", ipacket);
            }
            for (ichan, adcs) in channels.iter().enumerate() {
                let Some(adcs) = adcs else { continue };
                for (isample, (adc, frame)) in adcs.iter().zip_eq(&expected).enumerate() {
                    if *adc != frame[ichan] {
                        if nmismatches == 0 {
                            error!(
                                "Packet {} channel {} sample {}: {:#05x} instead of {:#05x}",
                                ipacket, ichan, isample, adc, frame[ichan]
                            );
                        }
                        nmismatches += 1;
                    }
                }
            }
        }
        black_box(channels);
        pl.update();
    }
    pl.done();

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "{} samples decoded in {:.3}s: {:.1} Msamples/s",
        nsamples,
        elapsed,
        nsamples as f64 / elapsed.max(f64::EPSILON) / 1e6
    );
    info!(
        "Compression ratio {:.3}, {:.2} bits per sample",
        (12 * nsamples) as f64 / (64 * archive.nwords()).max(1) as f64,
        (64 * archive.nwords()) as f64 / nsamples.max(1) as f64
    );
    if nmismatches > 0 {
        bail!("{} samples don't match the frames", nmismatches);
    }
    Ok(())
}
