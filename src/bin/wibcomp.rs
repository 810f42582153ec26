use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dsi_progress_logger::*;
use dune_wib_compress::bitstream::StreamLayout;
use dune_wib_compress::codec::table::LookupStrategy;
use dune_wib_compress::config::{Identity, Mode, ModuleConfig};
use dune_wib_compress::packet::{PacketArchive, PacketAssembler};
use dune_wib_compress::wib::file::{load_frames, replay};
use dune_wib_compress::wib::{WibId, DEFAULT_TICKS, FRAME_NWORDS};
use log::info;

#[derive(Parser, Debug)]
#[command(about = "Compresses a file of WIB frames into packets", long_about = None)]
struct Args {
    /// The file of frames, as written by wibgen.
    input: PathBuf,

    /// The file the packets are stored to.
    output: PathBuf,

    /// What to do with the frames.
    #[clap(short, long, value_enum, default_value_t = Mode::Compress)]
    mode: Mode,

    /// The number of histogram bins: 32, 64 or 128.
    #[clap(short, long, default_value_t = 32)]
    nbins: usize,

    /// The maximum size of a packet in 64-bit words, 0 for no limit.
    #[clap(short, long, default_value_t = 0)]
    limit: usize,

    /// The expected crate number.
    #[clap(long = "crate", default_value_t = 0)]
    crate_no: u8,

    /// The expected slot.
    #[clap(long, default_value_t = 0)]
    slot: u8,

    /// The expected fiber.
    #[clap(long, default_value_t = 0)]
    fiber: u8,

    /// Takes the identity from the first frame instead.
    #[clap(long)]
    latch: bool,

    /// Decodes every channel back before writing it.
    #[clap(long)]
    self_check: bool,

    /// The memory layout the self-check decodes from.
    #[clap(long, value_enum, default_value_t = StreamLayout::Words64)]
    layout: StreamLayout,

    /// The table lookup the self-check decodes with.
    #[clap(long, value_enum, default_value_t = LookupStrategy::Bottom)]
    lookup: LookupStrategy,

    /// Timestamp ticks between consecutive frames.
    #[clap(long, default_value_t = DEFAULT_TICKS)]
    ticks: u64,
}

pub fn main() -> Result<()> {
    stderrlog::new()
        .verbosity(2)
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .unwrap();

    let args = Args::parse();

    let identity = if args.latch {
        Identity::LatchFirst
    } else {
        Identity::Fixed(WibId::new(args.crate_no, args.slot, args.fiber))
    };
    let config = ModuleConfig::default()
        .with_mode(args.mode)
        .with_nbins(args.nbins)
        .with_limit(args.limit)
        .with_wib_id(identity)
        .with_self_check(args.self_check)
        .with_layout(args.layout)
        .with_lookup(args.lookup)
        .with_ticks(args.ticks);
    let mut assembler = PacketAssembler::new(&config)?;

    let words = load_frames(&args.input)?;
    let nframes = words.len() / FRAME_NWORDS;
    let mut archive = PacketArchive::new();

    let mut pl = ProgressLogger::default();
    pl.item_name("frame").expected_updates(Some(nframes));
    pl.start(format!("Compressing {} frames in {} mode...", nframes, args.mode.to_string().trim_end()));
    for frame in replay(&words) {
        if let Some(packet) = assembler.push_frame(&frame)? {
            archive.push(&packet);
        }
        pl.update();
    }
    if let Some(packet) = assembler.flush()? {
        archive.push(&packet);
    }
    pl.done();

    info!("\n{}", assembler.monitor());
    let raw_bytes = 8 * words.len();
    let packed_bytes = 8 * archive.nwords();
    info!(
        "{} packets, {} bytes from {}: ratio {:.3}",
        archive.len(),
        packed_bytes,
        raw_bytes,
        raw_bytes as f64 / packed_bytes.max(1) as f64
    );

    archive.store(&args.output)?;
    Ok(())
}
