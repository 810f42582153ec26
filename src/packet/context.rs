use crate::packet::{EXCEPTIONS_PER_WORD, MAX_EXCEPTION_WORDS, SUMMARY_MARKER};
use crate::wib::{ReadFrame, FRAME_NHEADERS};

/// Bits of the first header word of a cold-data link holding the checksums. They are never
/// predicted: a frame whose headers differ from the prediction only there is not an exception.
const CHECKSUM_BITS: u64 = 0xFFFF_FFFF << 16;

/// Index, among the header words, of the first header word of each cold-data link.
const LINK_HEADER0: [usize; 2] = [2, 4];

/// Predicts the header words of a frame from those of the previous one: the timestamp
/// advances by `ticks`, the convert counts by one and everything else stays put.
pub fn predict_headers(prev: &[u64; FRAME_NHEADERS], ticks: u64) -> [u64; FRAME_NHEADERS] {
    let mut next = *prev;
    next[1] = prev[1].wrapping_add(ticks);
    for idx in LINK_HEADER0 {
        next[idx] = prev[idx].wrapping_add(1 << 48);
    }
    next
}

/// One bit per header word that differs from its prediction, checksums aside.
pub fn mismatch_mask(headers: &[u64; FRAME_NHEADERS], predicted: &[u64; FRAME_NHEADERS]) -> u8 {
    let mut mask = 0;
    for idx in 0..FRAME_NHEADERS {
        let care = if LINK_HEADER0.contains(&idx) {
            !CHECKSUM_BITS
        } else {
            u64::MAX
        };
        if (headers[idx] ^ predicted[idx]) & care != 0 {
            mask |= 1 << idx;
        }
    }
    mask
}

/// Packs an exception entry.
#[inline(always)]
pub fn exception_entry(iframe: usize, mask: u8) -> u16 {
    ((mask as u16 & 0x3F) << 10) | (iframe as u16 & 0x3FF)
}

/// Unpacks an exception entry into its frame index and header mask.
#[inline(always)]
pub fn split_exception_entry(entry: u16) -> (usize, u8) {
    ((entry & 0x3FF) as usize, (entry >> 10) as u8)
}

/// What a packet accumulates from its frames besides their samples: the OR of their status,
/// the header words and the exceptions.
///
/// Frame 0 contributes a summary word and its six header words. A later frame contributes only
/// when some of its header words are flagged by the reader or differ from the prediction: an
/// exception entry with the mask of those words, plus the words themselves.
#[derive(Clone, Debug)]
pub struct PacketContext {
    ticks: u64,
    status: u32,
    nframes: usize,
    /// The header words of the previous frame.
    prev: [u64; FRAME_NHEADERS],
    headers: Vec<u64>,
    /// Complete exception words.
    exceptions: Vec<u64>,
    /// The exception word being filled, from its low end.
    staged: u64,
    nentries: usize,
    ndropped: usize,
}

impl PacketContext {
    pub fn new(ticks: u64) -> Self {
        Self {
            ticks,
            status: 0,
            nframes: 0,
            prev: [0; FRAME_NHEADERS],
            headers: Vec::new(),
            exceptions: Vec::new(),
            staged: 0,
            nentries: 0,
            ndropped: 0,
        }
    }

    /// Starts a new packet.
    pub fn reset(&mut self) {
        self.status = 0;
        self.nframes = 0;
        self.headers.clear();
        self.exceptions.clear();
        self.staged = 0;
        self.nentries = 0;
        self.ndropped = 0;
    }

    pub fn set_ticks(&mut self, ticks: u64) {
        self.ticks = ticks;
    }

    /// Accounts for the next frame of the packet. Returns `false` if the frame was an exception
    /// and the exception buffer was full, in which case its header words are lost.
    pub fn add_frame(&mut self, frame: &ReadFrame) -> bool {
        let headers = frame.headers();
        let iframe = self.nframes;
        self.nframes += 1;
        self.status |= frame.status.0;

        if iframe == 0 {
            self.headers.push(
                (frame.status.0 as u64) << 32 | SUMMARY_MARKER | frame.status.header_errors() as u64,
            );
            self.headers.extend_from_slice(&headers);
            self.prev = headers;
            return true;
        }

        let predicted = predict_headers(&self.prev, self.ticks);
        self.prev = headers;
        let mask = frame.status.header_mask() | mismatch_mask(&headers, &predicted);
        if mask == 0 {
            return true;
        }
        if self.nentries == MAX_EXCEPTION_WORDS * EXCEPTIONS_PER_WORD {
            self.ndropped += 1;
            return false;
        }

        let slot = self.nentries % EXCEPTIONS_PER_WORD;
        self.staged |= (exception_entry(iframe, mask) as u64) << (16 * slot);
        self.nentries += 1;
        if slot == EXCEPTIONS_PER_WORD - 1 {
            self.exceptions.push(self.staged);
            self.staged = 0;
        }
        for (idx, word) in headers.iter().enumerate() {
            if mask & (1 << idx) != 0 {
                self.headers.push(*word);
            }
        }
        true
    }

    #[inline(always)]
    pub fn nframes(&self) -> usize {
        self.nframes
    }

    /// OR of the status of the frames added so far.
    #[inline(always)]
    pub fn status(&self) -> u32 {
        self.status
    }

    #[inline(always)]
    pub fn nexceptions(&self) -> usize {
        self.nentries
    }

    /// Exceptions dropped because the buffer was full.
    #[inline(always)]
    pub fn ndropped_exceptions(&self) -> usize {
        self.ndropped
    }

    /// The exception words, the partially filled one included.
    pub fn exception_words(&self) -> Vec<u64> {
        let mut words = self.exceptions.clone();
        if self.nentries % EXCEPTIONS_PER_WORD != 0 {
            words.push(self.staged);
        }
        words
    }

    /// The header words: the summary, the headers of frame 0 and those of the exceptions.
    pub fn header_words(&self) -> &[u64] {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wib::{FrameReader, ReadStatus, WibFrameBuilder, WibId, DEFAULT_TICKS};
    use crate::{MODULE_NCHANNELS, PACKET_NSAMPLES};

    fn frames(n: usize) -> Vec<ReadFrame> {
        let mut builder = WibFrameBuilder::new(WibId::default()).with_timestamp(500);
        let mut reader = FrameReader::default();
        (0..n)
            .map(|_| reader.read(&builder.build(&[0x123; MODULE_NCHANNELS])).unwrap())
            .collect()
    }

    #[test]
    fn regular_frames_leave_no_exceptions() {
        let mut ctx = PacketContext::new(DEFAULT_TICKS);
        for frame in frames(10) {
            assert!(ctx.add_frame(&frame));
        }
        assert_eq!(ctx.nframes(), 10);
        assert_eq!(ctx.nexceptions(), 0);
        assert!(ctx.exception_words().is_empty());
        assert_eq!(ctx.header_words().len(), 1 + FRAME_NHEADERS);
        assert_eq!(ctx.header_words()[0], SUMMARY_MARKER);
    }

    #[test]
    fn prediction_follows_the_counters() {
        let frames = frames(2);
        let predicted = predict_headers(&frames[0].headers(), DEFAULT_TICKS);
        assert_eq!(mismatch_mask(&frames[1].headers(), &predicted), 0);
        assert_eq!(predicted[1], 525);
    }

    #[test]
    fn exceptions_carry_the_flagged_words() {
        let mut frames = frames(6);
        frames[3].words[1] += 1;
        frames[5].status.set(ReadStatus::LINK_BASE[1] + ReadStatus::CD_ERR_REG, true);

        let mut ctx = PacketContext::new(DEFAULT_TICKS);
        for frame in &frames {
            ctx.add_frame(frame);
        }
        // frame 3 is late, frame 4 is then early with respect to it
        assert_eq!(ctx.nexceptions(), 3);
        let words = ctx.exception_words();
        assert_eq!(words.len(), 1);
        assert_eq!(split_exception_entry(words[0] as u16), (3, 0b10));
        assert_eq!(split_exception_entry((words[0] >> 16) as u16), (4, 0b10));
        assert_eq!(split_exception_entry((words[0] >> 32) as u16), (5, 0b100000));
        assert_eq!(ctx.header_words().len(), 1 + FRAME_NHEADERS + 3);
        assert_eq!(ctx.header_words()[7], frames[3].words[1]);
    }

    #[test]
    fn the_exception_buffer_is_bounded() {
        let mut ctx = PacketContext::new(0);
        let frames = frames(PACKET_NSAMPLES);
        let mut ndropped = 0;
        for frame in &frames {
            ndropped += !ctx.add_frame(frame) as usize;
        }
        // with no ticks every frame after the first mispredicts the timestamp
        assert_eq!(ctx.nexceptions(), MAX_EXCEPTION_WORDS * EXCEPTIONS_PER_WORD);
        assert_eq!(ndropped, PACKET_NSAMPLES - 1 - ctx.nexceptions());
        assert_eq!(ctx.ndropped_exceptions(), ndropped);
        assert_eq!(ctx.exception_words().len(), MAX_EXCEPTION_WORDS);
    }
}
