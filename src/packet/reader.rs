use std::ops::Range;

use anyhow::{bail, ensure, Context, Result};

use crate::bitstream::{BitReader, StreamLayout};
use crate::codec::channel::decode_channel;
use crate::codec::table::LookupStrategy;
use crate::config::Mode;
use crate::packet::assembler::toc_nwords;
use crate::packet::context::{predict_headers, split_exception_entry};
use crate::packet::{
    framing_header, split_record_trailer, EXCEPTIONS_PER_WORD, FRAMING_NWORDS, HEADER_FORMAT,
    RECORD_TYPE_HEADER, SUMMARY_MARKER,
};
use crate::utils::bits::field;
use crate::wib::{extract_adcs, FRAME_NHEADERS, FRAME_NWORDS};
use crate::{Adc, ADC_NBITS, MODULE_NCHANNELS};

/// A parsed packet, borrowing its words.
///
/// Parsing checks the framing and the record lengths and reads the table of contents; channels
/// are decoded on demand, each independently of the others.
#[derive(Clone, Debug)]
pub struct PacketReader<'a> {
    mode: Mode,
    status: u32,
    /// Frame index and header mask of each exception.
    exceptions: Vec<(usize, u8)>,
    headers: &'a [u64],
    /// The channel data or, when copying, the raw frames.
    data: &'a [u64],
    /// Bit offset of each channel plus the end of the last one. Empty when copying.
    toc: Vec<usize>,
    nchannels: usize,
    nsamples: usize,
}

impl<'a> PacketReader<'a> {
    pub fn parse(words: &'a [u64]) -> Result<Self> {
        ensure!(
            words.len() >= FRAMING_NWORDS + 1,
            "A packet is at least {} words long, got {}",
            FRAMING_NWORDS + 1,
            words.len()
        );
        let head = framing_header();
        if words[0] != head {
            bail!("Bad framing header {:#018x}", words[0]);
        }
        let last = words.len() - 1;
        if words[last] != !head {
            bail!("Bad framing trailer {:#018x}", words[last]);
        }

        let record = words[1];
        if field(record, 0, 4) != HEADER_FORMAT || field(record, 4, 4) != RECORD_TYPE_HEADER {
            bail!("Bad header record {:#018x}", record);
        }
        let status = field(record, 32, 32) as u32;
        let nexception_words = field(record, 24, 8) as usize;
        let record_len = field(record, 8, 16) as usize;
        ensure!(
            record_len > nexception_words && 1 + record_len + 2 <= words.len(),
            "Header record of {} words doesn't fit a packet of {}",
            record_len,
            words.len()
        );
        let exception_words = &words[2..2 + nexception_words];
        let headers = &words[2 + nexception_words..1 + record_len];
        ensure!(
            headers.len() > FRAME_NHEADERS && headers[0] & SUMMARY_MARKER == SUMMARY_MARKER,
            "Missing header words"
        );

        let id = words[last - 1];
        let mode = Mode::from_record_type(field(id, 28, 4))?;
        let nbytes = field(id, 0, 24) as usize;
        ensure!(
            nbytes == 8 * words.len(),
            "Packet claims {} bytes but is {} long",
            nbytes,
            8 * words.len()
        );

        let body = &words[1 + record_len..last - 1];
        let Some((trailer, body)) = body.split_last() else {
            bail!("Missing data record");
        };
        let (nchannels, nsamples, nwords) = split_record_trailer(*trailer);
        ensure!(
            nwords == body.len(),
            "Data record trailer claims {} words, got {}",
            nwords,
            body.len()
        );

        let (data, toc) = if mode == Mode::Copy {
            ensure!(nchannels == 0, "Copied frames with {} channels", nchannels);
            ensure!(
                nwords == nsamples * FRAME_NWORDS,
                "{} copied frames in {} words",
                nsamples,
                nwords
            );
            (body, Vec::new())
        } else {
            let ntoc = toc_nwords(nchannels);
            ensure!(ntoc <= body.len(), "Table of contents overruns the record");
            let (data, toc_words) = body.split_at(body.len() - ntoc);
            let toc = toc_words
                .iter()
                .flat_map(|word| [(word >> 32) as usize, (*word as u32) as usize])
                .take(nchannels + 1)
                .collect::<Vec<_>>();
            ensure!(
                toc.windows(2).all(|pair| pair[0] <= pair[1])
                    && toc.last().is_some_and(|end| *end <= 64 * data.len()),
                "Inconsistent table of contents"
            );
            (data, toc)
        };

        let exceptions = exception_words
            .iter()
            .flat_map(|word| (0..EXCEPTIONS_PER_WORD).map(move |slot| (word >> (16 * slot)) as u16))
            .filter(|entry| *entry != 0)
            .map(split_exception_entry)
            .collect();

        Ok(Self {
            mode,
            status,
            exceptions,
            headers,
            data,
            toc,
            nchannels,
            nsamples,
        })
    }

    #[inline(always)]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The packet status: OR of the status of its frames plus the truncation flag.
    #[inline(always)]
    pub fn status(&self) -> u32 {
        self.status
    }

    #[inline(always)]
    pub fn nchannels(&self) -> usize {
        self.nchannels
    }

    /// Samples per channel, which is the number of frames.
    #[inline(always)]
    pub fn nsamples(&self) -> usize {
        self.nsamples
    }

    /// Frame index and header mask of every exception.
    pub fn exceptions(&self) -> &[(usize, u8)] {
        &self.exceptions
    }

    /// The status of frame 0, as recorded in the summary header word.
    pub fn first_status(&self) -> u32 {
        (self.headers[0] >> 32) as u32
    }

    /// The bit range of channel `ichan` within the data record.
    pub fn channel_range(&self, ichan: usize) -> Result<Range<usize>> {
        ensure!(
            ichan < self.nchannels,
            "Channel {} out of {}",
            ichan,
            self.nchannels
        );
        Ok(self.toc[ichan]..self.toc[ichan + 1])
    }

    /// The data record as laid out in memory with `layout`.
    pub fn data_bytes(&self, layout: StreamLayout) -> Vec<u8> {
        layout.to_bytes(self.data)
    }

    /// Decodes channel `ichan`. Returns `None` for a channel that was disabled or dropped.
    pub fn decode_channel(
        &self,
        ichan: usize,
        layout: StreamLayout,
        strategy: LookupStrategy,
    ) -> Result<Option<Vec<Adc>>> {
        self.decode_from(&self.data_bytes(layout), layout, ichan, strategy)
    }

    fn decode_from(
        &self,
        bytes: &[u8],
        layout: StreamLayout,
        ichan: usize,
        strategy: LookupStrategy,
    ) -> Result<Option<Vec<Adc>>> {
        let range = self.channel_range(ichan)?;
        if range.is_empty() {
            return Ok(None);
        }
        let mut reader = BitReader::new(bytes, layout, range.start);

        if self.mode == Mode::Transpose {
            ensure!(
                range.len() == self.nsamples * ADC_NBITS,
                "Channel {} holds {} bits instead of {}",
                ichan,
                range.len(),
                self.nsamples * ADC_NBITS
            );
            let adcs = (0..self.nsamples)
                .map(|_| reader.read_bits(ADC_NBITS as u32) as Adc)
                .collect();
            return Ok(Some(adcs));
        }

        let decoded = decode_channel(reader, self.nsamples, strategy)
            .with_context(|| format!("Could not decode channel {}", ichan))?;
        ensure!(
            decoded.nbits == range.len(),
            "Channel {} decoded from {} bits but spans {}",
            ichan,
            decoded.nbits,
            range.len()
        );
        Ok(Some(decoded.adcs))
    }

    /// Decodes every channel. Copied frames are unpacked into their channels.
    pub fn decode_all(
        &self,
        layout: StreamLayout,
        strategy: LookupStrategy,
    ) -> Result<Vec<Option<Vec<Adc>>>> {
        if self.mode == Mode::Copy {
            let mut channels = vec![Vec::with_capacity(self.nsamples); MODULE_NCHANNELS];
            for frame in self.frames() {
                for (samples, adc) in channels.iter_mut().zip(extract_adcs(frame)) {
                    samples.push(adc);
                }
            }
            return Ok(channels.into_iter().map(Some).collect());
        }

        let bytes = self.data_bytes(layout);
        (0..self.nchannels)
            .map(|ichan| self.decode_from(&bytes, layout, ichan, strategy))
            .collect()
    }

    /// The raw frames of a packet of copied frames.
    pub fn frames(&self) -> impl Iterator<Item = &'a [u64]> + 'a {
        let frames = if self.mode == Mode::Copy {
            self.data
        } else {
            &[]
        };
        frames.chunks_exact(FRAME_NWORDS)
    }

    /// Rebuilds the header words of every frame: frame 0 and the exceptions from the header
    /// words, the other frames by prediction from the previous one.
    ///
    /// The checksums of the frames that are not exceptions are not recoverable: they are
    /// carried over from the previous frame.
    pub fn frame_headers(&self, ticks: u64) -> Result<Vec<[u64; FRAME_NHEADERS]>> {
        let mut cur = [0; FRAME_NHEADERS];
        cur.copy_from_slice(&self.headers[1..=FRAME_NHEADERS]);
        let mut extra = self.headers[1 + FRAME_NHEADERS..].iter();
        let mut exceptions = self.exceptions.iter().peekable();

        let mut headers = Vec::with_capacity(self.nsamples);
        for iframe in 0..self.nsamples {
            if iframe > 0 {
                cur = predict_headers(&cur, ticks);
                if let Some((_, mask)) = exceptions.next_if(|(jframe, _)| *jframe == iframe) {
                    for (idx, word) in cur.iter_mut().enumerate() {
                        if mask & (1 << idx) != 0 {
                            *word = *extra.next().context("Missing exception header words")?;
                        }
                    }
                }
            }
            headers.push(cur);
        }
        Ok(headers)
    }
}
