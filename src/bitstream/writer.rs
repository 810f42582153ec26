use mem_dbg::{MemDbg, MemSize};

use crate::utils::bits::low_mask;

/// A write-only, MSB-first bit stream packing variable-width fields into 64-bit words.
///
/// At most one partially filled word is ever staged: as soon as a word is complete it is moved
/// to the output.
#[derive(Clone, Debug, Default, MemDbg, MemSize)]
pub struct BitStream64 {
    /// The completed output words.
    words: Vec<u64>,

    /// The partially filled word. Bits are filled from the most significant end.
    staging: u64,

    /// Index of the next bit to be written.
    idx: usize,
}

impl BitStream64 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nwords: usize) -> Self {
        Self {
            words: Vec::with_capacity(nwords),
            ..Self::default()
        }
    }

    /// Appends the `nbits` least significant bits of `bits`. Higher bits of `bits` are ignored.
    ///
    /// # Panics
    /// If `nbits` is bigger than 64.
    #[inline]
    pub fn insert(&mut self, bits: u64, nbits: u32) {
        assert!(nbits <= u64::BITS, "can't insert more than 64 bits at once");
        if nbits == 0 {
            return;
        }

        let bits = bits & low_mask(nbits);
        let avail = u64::BITS - (self.idx % 64) as u32;

        if nbits < avail {
            self.staging |= bits << (avail - nbits);
        } else {
            // the new bits complete the staging word and, possibly, overrun into the next one
            let overrun = nbits - avail;
            self.words.push(self.staging | (bits >> overrun));
            self.staging = if overrun == 0 {
                0
            } else {
                bits << (u64::BITS - overrun)
            };
        }
        self.idx += nbits as usize;
    }

    /// Appends `nbits` copies of the same bit.
    pub fn insert_run(&mut self, bit: bool, mut nbits: usize) {
        let pattern = if bit { u64::MAX } else { 0 };
        while nbits > 0 {
            let n = nbits.min(64);
            self.insert(pattern, n as u32);
            nbits -= n;
        }
    }

    /// Appends the first `nbits` bits of an MSB-first stream given as its words.
    pub fn append(&mut self, words: &[u64], nbits: usize) {
        debug_assert!(words.len() * 64 >= nbits);
        let full = nbits / 64;
        for word in &words[..full] {
            self.insert(*word, 64);
        }

        let rest = (nbits % 64) as u32;
        if rest > 0 {
            self.insert(words[full] >> (64 - rest), rest);
        }
    }

    /// Appends every bit written so far into `other`, staged bits included.
    pub fn append_stream(&mut self, other: &BitStream64) {
        let full = other.idx / 64;
        for word in &other.words[..full] {
            self.insert(*word, 64);
        }

        let rest = (other.idx % 64) as u32;
        if rest > 0 {
            self.insert(other.staging >> (64 - rest), rest);
        }
    }

    /// Number of bits written so far.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.idx
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.idx == 0
    }

    /// Number of 64-bit words the stream occupies once flushed.
    #[inline(always)]
    pub fn nwords(&self) -> usize {
        self.idx.div_ceil(64)
    }

    /// Emits the partially filled word, if any, zero filling its unused low bits, and returns
    /// the total number of bits written.
    ///
    /// Writing can continue after a flush; it restarts on the next word boundary.
    pub fn flush(&mut self) -> usize {
        let nbits = self.idx;
        if self.idx % 64 != 0 {
            self.words.push(self.staging);
            self.staging = 0;
            self.idx = self.words.len() * 64;
        }
        nbits
    }

    /// The completed words. Staged bits show up only after a [`flush`](Self::flush).
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Flushes the stream and returns its words together with the number of valid bits.
    pub fn into_words(mut self) -> (Vec<u64>, usize) {
        let nbits = self.flush();
        (self.words, nbits)
    }
}
