use anyhow::{bail, Result};

use crate::config::{Identity, ModuleConfig};
use crate::wib::status::ReadStatus;
use crate::wib::{
    colddata, comma, extract_adcs, id, reserved, version, wib_errors, FrameState, InputWord,
    WibId, DEFAULT_TICKS, FRAME_NHEADERS, FRAME_NWORDS, HEADER_INDICES, K28_5, LINK_OFFSETS,
    NLINKS, USER_EOF_ERR, USER_FLUSH, USER_RUN_ENABLE, USER_SOF, VERSION,
};
use crate::{Adc, MODULE_NCHANNELS};

/// A frame as read from the input, with the anomalies found in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadFrame {
    pub words: [u64; FRAME_NWORDS],
    pub status: ReadStatus,
}

impl ReadFrame {
    #[inline(always)]
    pub fn state(&self) -> FrameState {
        self.status.state()
    }

    /// The header words, in packet order.
    pub fn headers(&self) -> [u64; FRAME_NHEADERS] {
        HEADER_INDICES.map(|idx| self.words[idx])
    }

    pub fn adcs(&self) -> [Adc; MODULE_NCHANNELS] {
        extract_adcs(&self.words)
    }
}

/// What the reader remembers of the previous frame to predict the headers of the next one.
#[derive(Clone, Debug, Default)]
struct ReadContext {
    /// The expected timestamp.
    timestamp: u64,
    /// The expected convert count of each link.
    convert_count: [u16; NLINKS],
    /// The second header word of each link in the previous frame.
    link_hdr1: [u64; NLINKS],
    /// The identity latched from the first frame.
    latched: Option<WibId>,
    /// Whether at least one frame has been read.
    primed: bool,
}

/// Reads frames from the input stream, checks their framing and compares their headers with
/// the values predicted from the previous frame.
///
/// Anomalies never fail a read: they are reported in the [`ReadStatus`] of the frame.
#[derive(Clone, Debug)]
pub struct FrameReader {
    identity: Identity,
    ticks: u64,
    ctx: ReadContext,
}

impl FrameReader {
    pub fn new(identity: Identity, ticks: u64) -> Self {
        Self {
            identity,
            ticks,
            ctx: ReadContext::default(),
        }
    }

    pub fn from_config(config: &ModuleConfig) -> Self {
        Self::new(config.wib_id, config.ticks)
    }

    /// The identity frames are checked against, if already known.
    pub fn wib_id(&self) -> Option<WibId> {
        match self.identity {
            Identity::Fixed(id) => Some(id),
            Identity::LatchFirst => self.ctx.latched,
        }
    }

    /// Reads one frame. Fails only if `input` doesn't hold exactly one frame worth of words.
    pub fn read(&mut self, input: &[InputWord]) -> Result<ReadFrame> {
        if input.len() != FRAME_NWORDS {
            bail!(
                "A frame is {} words long, got {}",
                FRAME_NWORDS,
                input.len()
            );
        }

        let mut status = ReadStatus::default();
        let mut words = [0; FRAME_NWORDS];
        for (idx, word) in input.iter().enumerate() {
            words[idx] = word.data;
            let sof = word.user & USER_SOF != 0;
            if idx == 0 {
                status.set(ReadStatus::SOF_MISSING, !sof);
                status.set(ReadStatus::RUN_DISABLE, word.user & USER_RUN_ENABLE == 0);
            } else {
                status.set(ReadStatus::SOF_UNEXPECTED, sof);
            }
            if idx == FRAME_NWORDS - 1 {
                status.set(ReadStatus::FLUSH, word.user & USER_FLUSH != 0);
                status.set(ReadStatus::EOF_MISSING, !word.last);
                status.set(ReadStatus::EOF_ERROR, word.user & USER_EOF_ERR != 0);
            } else {
                status.set(ReadStatus::EOF_UNEXPECTED, word.last);
            }
        }

        self.eval_wib(&words, &mut status);
        for link in 0..NLINKS {
            self.eval_colddata(link, &words, &mut status);
        }
        self.ctx.primed = true;

        Ok(ReadFrame { words, status })
    }

    fn eval_wib(&mut self, words: &[u64; FRAME_NWORDS], status: &mut ReadStatus) {
        let (w0, w1) = (words[0], words[1]);

        if self.identity == Identity::LatchFirst && self.ctx.latched.is_none() {
            self.ctx.latched = Some(WibId::from_header(w0));
        }
        let expected_id = self.wib_id().map_or(0, |wib| wib.packed());

        status.set(ReadStatus::WIB_COMMA, comma(w0) != K28_5);
        status.set(ReadStatus::WIB_VERSION, version(w0) != VERSION);
        status.set(ReadStatus::WIB_ID, id(w0) != expected_id);
        status.set(ReadStatus::WIB_RESERVED, reserved(w0) != 0);
        status.set(ReadStatus::WIB_ERRORS, wib_errors(w0) != 0);

        if self.ctx.primed {
            status.set(ReadStatus::WIB_TIMESTAMP, w1 != self.ctx.timestamp);
        }
        self.ctx.timestamp = w1.wrapping_add(self.ticks);
    }

    fn eval_colddata(&mut self, link: usize, words: &[u64; FRAME_NWORDS], status: &mut ReadStatus) {
        let base = ReadStatus::LINK_BASE[link];
        let h0 = words[LINK_OFFSETS[link]];
        let h1 = words[LINK_OFFSETS[link] + 1];

        // the checksums cover data that is no longer available, they can't be checked
        status.set(base + ReadStatus::CD_STREAM_ERR1, colddata::stream_err1(h0) != 0);
        status.set(base + ReadStatus::CD_STREAM_ERR2, colddata::stream_err2(h0) != 0);
        status.set(base + ReadStatus::CD_RESERVED0, colddata::rsvd0(h0) != 0);

        let convert_count = colddata::convert_count(h0);
        if self.ctx.primed {
            status.set(
                base + ReadStatus::CD_CONVERT_COUNT,
                convert_count != self.ctx.convert_count[link],
            );
            status.set(
                base + ReadStatus::CD_HDRS,
                colddata::hdrs(h1) != colddata::hdrs(self.ctx.link_hdr1[link]),
            );
        }
        self.ctx.convert_count[link] = convert_count.wrapping_add(1);
        self.ctx.link_hdr1[link] = h1;

        status.set(base + ReadStatus::CD_ERR_REG, colddata::err_reg(h1) != 0);
        status.set(base + ReadStatus::CD_RESERVED1, colddata::rsvd1(h1) != 0);
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(Identity::default(), DEFAULT_TICKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wib::WibFrameBuilder;

    #[test]
    fn good_frames_have_clean_status() {
        let id = WibId::new(1, 2, 3);
        let mut builder = WibFrameBuilder::new(id);
        let mut reader = FrameReader::new(Identity::Fixed(id), DEFAULT_TICKS);
        for _ in 0..4 {
            let frame = reader.read(&builder.build(&[0x800; MODULE_NCHANNELS])).unwrap();
            assert_eq!(frame.status, ReadStatus::default());
        }
    }

    #[test]
    fn predictions_skip_the_first_frame() {
        let id = WibId::new(1, 2, 3);
        let mut builder = WibFrameBuilder::new(id).with_timestamp(1000).with_convert_count(7);
        let mut reader = FrameReader::new(Identity::Fixed(id), DEFAULT_TICKS);
        let frame = reader.read(&builder.build(&[0; MODULE_NCHANNELS])).unwrap();
        assert!(frame.status.is_good_frame());
        assert_eq!(frame.status.header_errors(), 0);

        // skip a frame: timestamp and convert counts go out of sequence
        builder.build(&[0; MODULE_NCHANNELS]);
        let frame = reader.read(&builder.build(&[0; MODULE_NCHANNELS])).unwrap();
        assert!(frame.status.test(ReadStatus::WIB_TIMESTAMP));
        assert!(frame.status.test(ReadStatus::LINK_BASE[0] + ReadStatus::CD_CONVERT_COUNT));
        assert!(frame.status.test(ReadStatus::LINK_BASE[1] + ReadStatus::CD_CONVERT_COUNT));
        assert_eq!(frame.status.header_mask(), 0b010110);
    }

    #[test]
    fn latched_identity() {
        let mut builder = WibFrameBuilder::new(WibId::new(9, 1, 4));
        let mut reader = FrameReader::new(Identity::LatchFirst, DEFAULT_TICKS);
        assert_eq!(reader.wib_id(), None);
        let frame = reader.read(&builder.build(&[0; MODULE_NCHANNELS])).unwrap();
        assert!(!frame.status.test(ReadStatus::WIB_ID));
        assert_eq!(reader.wib_id(), Some(WibId::new(9, 1, 4)));

        let mut other = WibFrameBuilder::new(WibId::new(9, 1, 5)).with_timestamp(25);
        let frame = reader.read(&other.build(&[0; MODULE_NCHANNELS])).unwrap();
        assert!(frame.status.test(ReadStatus::WIB_ID));
    }

    #[test]
    fn truncated_frames_are_rejected() {
        let mut reader = FrameReader::default();
        assert!(reader.read(&[InputWord::new(0); 29]).is_err());
    }
}
