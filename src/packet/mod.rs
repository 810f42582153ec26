//! The output packets: their word-level format, the assembler building them from frames and
//! the reader taking them apart.
//!
//! A packet is a sequence of 64-bit words:
//!
//! ```text
//! framing header
//! record header          status | #exception words | header record length | type | format
//! exception words        4 x (mask(6) | frame(10)) per word
//! header words           summary, the 6 headers of frame 0, the bad headers of later frames
//! data record            channel data, table of contents, record trailer
//! identifier             status | mode | 1 | #bytes
//! framing trailer        complement of the framing header
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use epserde::prelude::*;
use epserde::ser::Serialize;
use mem_dbg::{MemDbg, MemSize};

use crate::utils::bits::field;

pub mod assembler;
pub mod context;
pub mod reader;

pub use assembler::PacketAssembler;
pub use context::PacketContext;
pub use reader::PacketReader;

/// Framing pattern in bits [31:4] of the framing header.
pub const FRAMING_PATTERN: u64 = 0x8b30_9e2;

/// Version of the framing, bits [63:32] of the framing header.
pub const FRAMING_VERSION: u64 = 1;

/// Record type of the header record.
pub const RECORD_TYPE_HEADER: u64 = 1;

/// Format of the header record.
pub const HEADER_FORMAT: u64 = 3;

/// Marker of the summary word opening the header words.
pub const SUMMARY_MARKER: u64 = 0xC000_0000;

/// Packet status bit set when the packet was cut to respect the size limit.
pub const STATUS_TRUNCATED: u32 = 1 << 31;

/// Capacity, in words, of the exception buffer. The record header has 8 bits for it.
pub const MAX_EXCEPTION_WORDS: usize = 0xFF;

/// Exception entries per word.
pub const EXCEPTIONS_PER_WORD: usize = 4;

/// Words of a packet besides its exceptions, headers and data record: the framing header, the
/// record header, the identifier and the framing trailer.
pub const FRAMING_NWORDS: usize = 4;

/// The framing header opening every packet.
#[inline(always)]
pub fn framing_header() -> u64 {
    FRAMING_VERSION << 32 | FRAMING_PATTERN << 4
}

/// Composes the record header.
pub fn record_header(status: u32, nexception_words: usize, nheaders: usize) -> u64 {
    (status as u64) << 32
        | (nexception_words as u64 & 0xFF) << 24
        | ((nexception_words + nheaders + 1) as u64 & 0xFFFF) << 8
        | RECORD_TYPE_HEADER << 4
        | HEADER_FORMAT
}

/// Composes the identifier word. `nbytes` is the length of the whole packet.
pub fn identifier(status: u32, record_type: u64, nbytes: usize) -> u64 {
    (status as u64) << 32 | (record_type & 0xF) << 28 | 1 << 24 | (nbytes as u64 & 0xFF_FFFF)
}

/// Composes the trailer of a data record.
pub fn record_trailer(nchannels: usize, nsamples: usize, nwords: usize) -> u64 {
    (nchannels as u64 & 0xFFFF) << 48 | (nsamples as u64 & 0xFFFF) << 32 | (nwords as u64 & 0xFFFF_FFFF)
}

/// The fields of a record trailer: number of channels, of samples and of words.
pub fn split_record_trailer(word: u64) -> (usize, usize, usize) {
    (
        field(word, 48, 16) as usize,
        field(word, 32, 16) as usize,
        field(word, 0, 32) as usize,
    )
}

/// An assembled packet.
#[derive(Clone, Debug, PartialEq, Eq, MemDbg, MemSize)]
pub struct Packet {
    pub words: Vec<u64>,
    /// Number of frames the packet holds.
    pub nframes: usize,
    /// OR of the status of its frames, plus [`STATUS_TRUNCATED`].
    pub status: u32,
}

impl Packet {
    pub fn is_truncated(&self) -> bool {
        self.status & STATUS_TRUNCATED != 0
    }

    pub fn nbytes(&self) -> usize {
        8 * self.words.len()
    }
}

/// A sequence of packets, stored back to back.
#[derive(Clone, Debug, Default, Epserde, MemDbg, MemSize)]
pub struct PacketArchive {
    words: Vec<u64>,
    /// Start of each packet, plus the end of the last one.
    offsets: Vec<usize>,
}

impl PacketArchive {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            offsets: vec![0],
        }
    }

    pub fn push(&mut self, packet: &Packet) {
        if self.offsets.is_empty() {
            self.offsets.push(0);
        }
        self.words.extend_from_slice(&packet.words);
        self.offsets.push(self.words.len());
    }

    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The words of packet `index`.
    pub fn get(&self, index: usize) -> &[u64] {
        &self.words[self.offsets[index]..self.offsets[index + 1]]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u64]> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }

    /// Total number of words.
    pub fn nwords(&self) -> usize {
        self.words.len()
    }

    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = BufWriter::new(
            File::create(path).with_context(|| format!("Could not create {}", path.display()))?,
        );
        self.serialize(&mut file)
            .with_context(|| format!("Could not serialize packets to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::load_full(path).with_context(|| format!("Could not load packets from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_words() {
        assert_eq!(framing_header(), 0x0000_0001_8b30_9e20);
        assert_eq!(record_header(0x8000_0001, 2, 7), 0x8000_0001_020a_0013);
        assert_eq!(identifier(0, 3, 0x1234), 0x3100_1234);
        assert_eq!(split_record_trailer(record_trailer(128, 1024, 77)), (128, 1024, 77));
    }

    #[test]
    fn archive_keeps_packets_apart() {
        let mut archive = PacketArchive::new();
        for len in [3, 0, 5] {
            archive.push(&Packet {
                words: vec![len as u64; len],
                nframes: 1,
                status: 0,
            });
        }
        assert_eq!(archive.len(), 3);
        assert_eq!(archive.get(1), &[] as &[u64]);
        assert_eq!(archive.get(2), &[5; 5]);
        assert_eq!(archive.nwords(), 8);
    }
}
