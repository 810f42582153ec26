use crate::wib::adc::pack_link;
use crate::wib::{
    colddata, wib_header0, InputWord, WibId, DEFAULT_TICKS, FRAME_NWORDS, LINK_NCHANNELS,
    LINK_OFFSETS, NLINKS, USER_FLUSH, USER_RUN_ENABLE, USER_SOF,
};
use crate::Adc;

/// Composes well-formed frames: consecutive timestamps and convert counts, constant link
/// headers and nominal side-band flags.
#[derive(Clone, Debug)]
pub struct WibFrameBuilder {
    id: WibId,
    timestamp: u64,
    convert_count: u16,
    ticks: u64,
    hdrs: u32,
    run_enable: bool,
    flush: bool,
}

impl WibFrameBuilder {
    pub fn new(id: WibId) -> Self {
        Self {
            id,
            timestamp: 0,
            convert_count: 0,
            ticks: DEFAULT_TICKS,
            hdrs: 0,
            run_enable: true,
            flush: false,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_convert_count(mut self, convert_count: u16) -> Self {
        self.convert_count = convert_count;
        self
    }

    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_hdrs(mut self, hdrs: u32) -> Self {
        self.hdrs = hdrs;
        self
    }

    /// Sets the run-enable flag of the following frames.
    pub fn set_run_enable(&mut self, run_enable: bool) {
        self.run_enable = run_enable;
    }

    /// Sets the flush flag of the following frames.
    pub fn set_flush(&mut self, flush: bool) {
        self.flush = flush;
    }

    /// The data words of a frame carrying `adcs`, link 0 first. Missing channels read as 0.
    pub fn words(&self, adcs: &[Adc]) -> [u64; FRAME_NWORDS] {
        let mut words = [0; FRAME_NWORDS];
        words[0] = wib_header0(self.id, 0);
        words[1] = self.timestamp;
        for link in 0..NLINKS {
            let off = LINK_OFFSETS[link];
            let mut link_adcs = [0; LINK_NCHANNELS];
            let src = adcs.iter().skip(link * LINK_NCHANNELS).take(LINK_NCHANNELS);
            for (dst, adc) in link_adcs.iter_mut().zip(src) {
                *dst = *adc;
            }
            words[off] = colddata::header0(0, self.convert_count);
            words[off + 1] = colddata::header1(self.hdrs);
            words[off + 2..off + 14].copy_from_slice(&pack_link(&link_adcs));
        }
        words
    }

    /// Builds the next frame and advances timestamp and convert count.
    pub fn build(&mut self, adcs: &[Adc]) -> [InputWord; FRAME_NWORDS] {
        let words = self.words(adcs);
        let mut user = 0;
        if self.run_enable {
            user |= USER_RUN_ENABLE;
        }
        let mut frame = side_band(&words, user);
        if self.flush {
            frame[FRAME_NWORDS - 1].user |= USER_FLUSH;
        }
        self.advance();
        frame
    }

    /// Moves on to the next frame: timestamp and convert count advance.
    pub fn advance(&mut self) {
        self.timestamp = self.timestamp.wrapping_add(self.ticks);
        self.convert_count = self.convert_count.wrapping_add(1);
    }
}

/// Wraps raw frame words into input words with start-of-frame on the first word, end-of-frame
/// on the last one and the given extra user bits on the first word.
pub fn side_band(words: &[u64; FRAME_NWORDS], user: u8) -> [InputWord; FRAME_NWORDS] {
    let mut frame = words.map(InputWord::new);
    frame[0].user = USER_SOF | user;
    frame[FRAME_NWORDS - 1].last = true;
    frame
}

/// Wraps raw frame words as a frame of a running acquisition.
pub fn running(words: &[u64; FRAME_NWORDS]) -> [InputWord; FRAME_NWORDS] {
    side_band(words, USER_RUN_ENABLE)
}
