use anyhow::{bail, Result};
use log::{debug, info, trace, warn};

use crate::bitstream::BitStream64;
use crate::codec::histogram::Histogram;
use crate::codec::verify::encode_verified;
use crate::codec::{symbol, symbols_from_adcs};
use crate::config::{Mode, ModuleConfig};
use crate::monitor::Monitor;
use crate::packet::context::PacketContext;
use crate::packet::{
    framing_header, identifier, record_header, record_trailer, Packet, FRAMING_NWORDS,
    STATUS_TRUNCATED,
};
use crate::wib::{FrameReader, InputWord, ReadFrame, FRAME_NWORDS};
use crate::{Adc, ADC_NBITS, MODULE_NCHANNELS, PACKET_NSAMPLES};

/// Number of words of a table of contents covering `nchannels` channels.
#[inline(always)]
pub fn toc_nwords(nchannels: usize) -> usize {
    (nchannels + 1).div_ceil(2)
}

/// Packs channel bit offsets two per word, high half first.
fn pack_toc(offsets: &[u32]) -> Vec<u64> {
    offsets
        .chunks(2)
        .map(|pair| (pair[0] as u64) << 32 | pair.get(1).copied().unwrap_or(0) as u64)
        .collect()
}

/// Turns a stream of frames into packets.
///
/// Frames are read and validated one at a time; their samples are buffered per channel and,
/// when compressing, histogrammed as they arrive. A packet is emitted after
/// [`PACKET_NSAMPLES`] frames, or earlier when a frame whose state is not normal flushes it.
///
/// The configuration passed to [`reconfigure`](Self::reconfigure) is applied at the start of
/// the next packet.
pub struct PacketAssembler {
    config: ModuleConfig,
    pending: Option<ModuleConfig>,
    reader: FrameReader,
    ctx: PacketContext,
    /// One histogram per channel, used only when compressing.
    hists: Vec<Histogram>,
    /// The samples of the current packet, channel by channel.
    samples: Vec<Vec<Adc>>,
    /// The raw words of the current packet, kept only when copying.
    raw: Vec<u64>,
    monitor: Monitor,
}

impl PacketAssembler {
    pub fn new(config: &ModuleConfig) -> Result<Self> {
        config.validate()?;
        let hists = (0..MODULE_NCHANNELS)
            .map(|_| Histogram::new(config.nbins))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            config: config.clone(),
            pending: None,
            reader: FrameReader::from_config(config),
            ctx: PacketContext::new(config.ticks),
            hists,
            samples: vec![Vec::with_capacity(PACKET_NSAMPLES); MODULE_NCHANNELS],
            raw: Vec::new(),
            monitor: Monitor::default(),
        })
    }

    /// Replaces the configuration starting with the next packet.
    pub fn reconfigure(&mut self, config: ModuleConfig) -> Result<()> {
        config.validate()?;
        if self.ctx.nframes() == 0 {
            self.apply(config)?;
        } else {
            self.pending = Some(config);
        }
        Ok(())
    }

    fn apply(&mut self, config: ModuleConfig) -> Result<()> {
        if config.nbins != self.config.nbins {
            self.hists = (0..MODULE_NCHANNELS)
                .map(|_| Histogram::new(config.nbins))
                .collect::<Result<Vec<_>>>()?;
        }
        if config.wib_id != self.config.wib_id || config.ticks != self.config.ticks {
            self.reader = FrameReader::from_config(&config);
        }
        self.ctx.set_ticks(config.ticks);
        self.config = config;
        Ok(())
    }

    #[inline(always)]
    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    #[inline(always)]
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Frames in the packet being assembled.
    #[inline(always)]
    pub fn nframes(&self) -> usize {
        self.ctx.nframes()
    }

    /// Reads one frame, given as its [`FRAME_NWORDS`] input words, and returns the packet it
    /// completes, if any.
    pub fn push_frame(&mut self, input: &[InputWord]) -> Result<Option<Packet>> {
        if self.ctx.nframes() == 0 {
            if let Some(config) = self.pending.take() {
                self.apply(config)?;
            }
        }
        let frame = self.reader.read(input)?;
        self.monitor.update_read(frame.status);

        if self.config.mode == Mode::Dump {
            self.monitor.update_dropped(1);
            return Ok(None);
        }
        if !frame.state().is_normal() {
            debug!("{} frame ends the packet", frame.state());
            self.monitor.update_dropped(1);
            return self.flush();
        }

        self.add(&frame)?;
        if self.ctx.nframes() == PACKET_NSAMPLES {
            return self.flush();
        }
        Ok(None)
    }

    fn add(&mut self, frame: &ReadFrame) -> Result<()> {
        if !self.ctx.add_frame(frame) {
            warn!(
                "Exception buffer full, headers of frame {} dropped",
                self.ctx.nframes() - 1
            );
            self.monitor.write.ndropped_exceptions += 1;
        }

        match self.config.mode {
            Mode::Copy => self.raw.extend_from_slice(&frame.words),
            Mode::Transpose => {
                for (samples, adc) in self.samples.iter_mut().zip(frame.adcs()) {
                    samples.push(adc);
                }
            }
            Mode::Compress => {
                let adcs = frame.adcs();
                for ichan in 0..MODULE_NCHANNELS {
                    let samples = &mut self.samples[ichan];
                    if let Some(prv) = samples.last() {
                        self.hists[ichan].bump(symbol(adcs[ichan], *prv))?;
                    }
                    samples.push(adcs[ichan]);
                }
            }
            Mode::Dump => bail!("Dump mode doesn't assemble packets"),
        }
        Ok(())
    }

    /// Emits the packet being assembled, if it holds any frame.
    pub fn flush(&mut self) -> Result<Option<Packet>> {
        if self.ctx.nframes() == 0 {
            return Ok(None);
        }
        let packet = self.assemble();
        self.clear();
        let packet = packet?;

        self.monitor.update_packet(packet.words.len(), packet.nframes);
        info!(
            "Packet {}: {} frames in {} bytes, status {:08x}",
            self.monitor.write.npackets,
            packet.nframes,
            packet.nbytes(),
            packet.status
        );
        Ok(Some(packet))
    }

    fn clear(&mut self) {
        self.ctx.reset();
        self.raw.clear();
        for samples in self.samples.iter_mut() {
            samples.clear();
        }
        for hist in self.hists.iter_mut() {
            hist.clear();
        }
    }

    fn assemble(&mut self) -> Result<Packet> {
        let exceptions = self.ctx.exception_words();
        let headers = self.ctx.header_words().to_vec();
        let nframes = self.ctx.nframes();
        let mut status = self.ctx.status();

        // everything but the data record proper
        let mut overhead = FRAMING_NWORDS + exceptions.len() + headers.len() + 1;
        if self.config.mode != Mode::Copy {
            overhead += toc_nwords(MODULE_NCHANNELS);
        }
        let budget = match self.config.limit {
            0 => None,
            limit => {
                if overhead > limit {
                    warn!(
                        "Packet overhead of {} words exceeds the limit of {}",
                        overhead, limit
                    );
                }
                Some(limit.saturating_sub(overhead))
            }
        };

        let (record, nkept) = match self.config.mode {
            Mode::Copy => self.copy_record(nframes, budget),
            _ => self.channel_record(nframes, budget)?,
        };
        if nkept < nframes || record.truncated {
            status |= STATUS_TRUNCATED;
        }

        let nwords = FRAMING_NWORDS + exceptions.len() + headers.len() + record.words.len();
        let mut words = Vec::with_capacity(nwords);
        words.push(framing_header());
        words.push(record_header(status, exceptions.len(), headers.len()));
        words.extend_from_slice(&exceptions);
        words.extend_from_slice(&headers);
        words.extend_from_slice(&record.words);
        words.push(identifier(
            status,
            self.config.mode.record_type(),
            8 * nwords,
        ));
        words.push(!framing_header());
        debug_assert_eq!(words.len(), nwords);

        Ok(Packet {
            words,
            nframes: nkept,
            status,
        })
    }

    /// The raw frames, as many as fit the budget, and the record trailer.
    fn copy_record(&mut self, nframes: usize, budget: Option<usize>) -> (DataRecord, usize) {
        let nkept = budget.map_or(nframes, |words| nframes.min(words / FRAME_NWORDS));
        if nkept < nframes {
            warn!(
                "Packet limit reached, {} of {} frames copied",
                nkept, nframes
            );
            self.monitor.update_dropped(nframes - nkept);
        }
        let mut words = self.raw[..nkept * FRAME_NWORDS].to_vec();
        words.push(record_trailer(0, nkept, nkept * FRAME_NWORDS));
        (
            DataRecord {
                words,
                truncated: nkept < nframes,
            },
            nkept,
        )
    }

    /// The channel bit strings, the table of contents and the record trailer.
    ///
    /// Channels are added in order while they fit the budget. The first one that doesn't is
    /// dropped together with every channel after it.
    fn channel_record(&mut self, nframes: usize, budget: Option<usize>) -> Result<(DataRecord, usize)> {
        let budget_bits = budget.map(|words| 64 * words);
        let mut data = BitStream64::new();
        let mut offsets = Vec::with_capacity(MODULE_NCHANNELS + 1);
        offsets.push(0);
        let mut truncated = false;

        for ichan in 0..MODULE_NCHANNELS {
            if self.config.is_enabled(ichan) {
                if !truncated {
                    let bits = self.channel_bits(ichan)?;
                    if budget_bits.is_some_and(|max| data.len() + bits.len() > max) {
                        warn!(
                            "Packet limit reached at channel {}, {} bits written",
                            ichan,
                            data.len()
                        );
                        truncated = true;
                    } else {
                        data.append_stream(&bits);
                    }
                }
                if truncated {
                    self.monitor.write.ndropped_channels += 1;
                }
            }
            offsets.push(data.len() as u32);
        }

        let (mut words, _) = data.into_words();
        words.extend(pack_toc(&offsets));
        let nwords = words.len();
        words.push(record_trailer(MODULE_NCHANNELS, nframes, nwords));
        Ok((DataRecord { words, truncated }, nframes))
    }

    /// The bit string of one channel of the packet.
    fn channel_bits(&mut self, ichan: usize) -> Result<BitStream64> {
        let samples = &self.samples[ichan];
        if self.config.mode == Mode::Transpose {
            let mut bits = BitStream64::with_capacity(samples.len() * ADC_NBITS / 64 + 1);
            for adc in samples {
                bits.insert(*adc as u64, ADC_NBITS as u32);
            }
            return Ok(bits);
        }

        let syms = symbols_from_adcs(samples);
        trace!("Channel {:>3} histogram\n{}", ichan, self.hists[ichan]);
        let verified = encode_verified(ichan, &syms, &self.hists[ichan], &self.config)?;
        if verified.diverged {
            self.monitor.write.ndivergences += 1;
        }
        debug!(
            "Channel {:>3}: {:>6} bits, {:>5} of table, {:>6} estimated",
            ichan,
            verified.channel.nbits,
            verified.channel.table_bits,
            verified.channel.esize
        );
        Ok(verified.channel.bits)
    }
}

/// The data record of a packet, trailer included.
struct DataRecord {
    words: Vec<u64>,
    truncated: bool,
}
