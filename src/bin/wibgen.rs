use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dsi_progress_logger::*;
use dune_wib_compress::wib::file::store_frames;
use dune_wib_compress::wib::{SignalGenerator, WibFrameBuilder, WibId, DEFAULT_TICKS, FRAME_NWORDS};
use log::info;

#[derive(Parser, Debug)]
#[command(about = "Generates a file of synthetic WIB frames", long_about = None)]
struct Args {
    /// The file the frames are written to.
    output: PathBuf,

    /// The number of frames to generate.
    #[clap(short, long, default_value_t = 8192)]
    frames: usize,

    /// The seed of the generator.
    #[clap(short, long, default_value_t = 0)]
    seed: u64,

    /// The standard deviation of the noise, in ADC counts.
    #[clap(long, default_value_t = 3.0)]
    sigma: f64,

    /// The probability that a channel starts a pulse at a given sample.
    #[clap(long, default_value_t = 0.001)]
    pulse_rate: f64,

    /// The crate number written in the frames.
    #[clap(long = "crate", default_value_t = 0)]
    crate_no: u8,

    /// The slot written in the frames.
    #[clap(long, default_value_t = 0)]
    slot: u8,

    /// The fiber written in the frames.
    #[clap(long, default_value_t = 0)]
    fiber: u8,
}

pub fn main() -> Result<()> {
    stderrlog::new()
        .verbosity(2)
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .unwrap();

    let args = Args::parse();

    let wib = WibId::new(args.crate_no, args.slot, args.fiber);
    let mut generator = SignalGenerator::new(args.seed, args.sigma, args.pulse_rate)?;
    let mut builder = WibFrameBuilder::new(wib).with_ticks(DEFAULT_TICKS);
    let mut words = Vec::with_capacity(args.frames * FRAME_NWORDS);

    let mut pl = ProgressLogger::default();
    pl.item_name("frame").expected_updates(Some(args.frames));
    pl.start(format!("Generating frames for WIB {}...", wib));
    for _ in 0..args.frames {
        words.extend_from_slice(&builder.words(&generator.next_adcs()));
        builder.advance();
        pl.update();
    }
    pl.done();

    store_frames(&args.output, &words)?;
    info!("{} frames written to {}", args.frames, args.output.display());
    Ok(())
}
