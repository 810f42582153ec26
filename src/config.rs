use std::fmt::Display;

use anyhow::{bail, Result};

use crate::bitstream::StreamLayout;
use crate::codec::histogram::VALID_NBINS;
use crate::codec::table::LookupStrategy;
use crate::wib::{WibId, DEFAULT_TICKS};
use crate::MODULE_NCHANNELS;

/// What the module does with the frames it reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Frames are read and counted, nothing is written.
    Dump,
    /// Frames are copied verbatim.
    Copy,
    /// Samples are regrouped channel by channel, uncompressed.
    Transpose,
    /// Samples are regrouped channel by channel and compressed.
    #[default]
    Compress,
}

impl Mode {
    /// The record type written in the packet identifier.
    pub fn record_type(&self) -> u64 {
        match self {
            Mode::Dump => 0,
            Mode::Copy => 1,
            Mode::Transpose => 2,
            Mode::Compress => 3,
        }
    }

    pub fn from_record_type(record_type: u64) -> Result<Self> {
        Ok(match record_type {
            1 => Mode::Copy,
            2 => Mode::Transpose,
            3 => Mode::Compress,
            _ => bail!("Unknown record type {}", record_type),
        })
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Dump => write!(f, "{:<15}", "Dump"),
            Mode::Copy => write!(f, "{:<15}", "Copy"),
            Mode::Transpose => write!(f, "{:<15}", "Transpose"),
            Mode::Compress => write!(f, "{:<15}", "Compress"),
        }
    }
}

/// Where the identity frames are checked against comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Identity {
    /// A configured crate, slot and fiber.
    Fixed(WibId),
    /// Whatever the first frame read carries. Only meant to replay captured data.
    LatchFirst,
}

impl Default for Identity {
    fn default() -> Self {
        Identity::Fixed(WibId::default())
    }
}

/// The configuration of a compression module. It is read once per packet.
#[derive(Clone, Debug)]
pub struct ModuleConfig {
    pub mode: Mode,

    /// Per-channel enable flags. Disabled channels are written with zero length.
    pub enabled: Vec<bool>,

    /// Maximum number of 64-bit words of a packet, 0 for no limit.
    pub limit: usize,

    pub wib_id: Identity,

    /// Number of histogram bins.
    pub nbins: usize,

    /// Lookup used when decoding for the self-check.
    pub lookup: LookupStrategy,

    /// Whether every compressed channel is decoded back before being written.
    pub self_check: bool,

    /// Layout the decoder expects packets in.
    pub layout: StreamLayout,

    /// Timestamp ticks between consecutive frames.
    pub ticks: u64,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            enabled: vec![true; MODULE_NCHANNELS],
            limit: 0,
            wib_id: Identity::default(),
            nbins: 32,
            lookup: LookupStrategy::default(),
            self_check: false,
            layout: StreamLayout::default(),
            ticks: DEFAULT_TICKS,
        }
    }
}

impl ModuleConfig {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_wib_id(mut self, wib_id: Identity) -> Self {
        self.wib_id = wib_id;
        self
    }

    pub fn with_nbins(mut self, nbins: usize) -> Self {
        self.nbins = nbins;
        self
    }

    pub fn with_lookup(mut self, lookup: LookupStrategy) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_self_check(mut self, self_check: bool) -> Self {
        self.self_check = self_check;
        self
    }

    pub fn with_layout(mut self, layout: StreamLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// Enables only the channels in `channels`.
    pub fn with_enabled(mut self, channels: impl IntoIterator<Item = usize>) -> Self {
        self.enabled = vec![false; MODULE_NCHANNELS];
        for channel in channels {
            if let Some(flag) = self.enabled.get_mut(channel) {
                *flag = true;
            }
        }
        self
    }

    #[inline(always)]
    pub fn is_enabled(&self, channel: usize) -> bool {
        self.enabled.get(channel).copied().unwrap_or(false)
    }

    pub fn validate(&self) -> Result<()> {
        if !VALID_NBINS.contains(&self.nbins) {
            bail!("Invalid number of bins {}: must be one of {:?}", self.nbins, VALID_NBINS);
        }
        if self.enabled.len() != MODULE_NCHANNELS {
            bail!(
                "Expected {} channel enable flags, got {}",
                MODULE_NCHANNELS,
                self.enabled.len()
            );
        }
        Ok(())
    }
}
