//! The WIB frame: the 30-word hardware record carrying one time sample of the 128 channels of a
//! compression module, together with the side-band flags of the stream it arrives on.

use std::fmt::Display;

use crate::utils::bits::field;

pub mod adc;
pub mod builder;
pub mod file;
pub mod reader;
pub mod signal;
pub mod status;

pub use adc::extract_adcs;
pub use builder::WibFrameBuilder;
pub use reader::{FrameReader, ReadFrame};
pub use signal::SignalGenerator;
pub use status::ReadStatus;

/// Number of 64-bit words of a frame.
pub const FRAME_NWORDS: usize = 30;

/// Number of header words kept from every frame: 2 WIB words and 2 words per cold-data link.
pub const FRAME_NHEADERS: usize = 6;

/// Number of cold-data links per frame.
pub const NLINKS: usize = 2;

/// Number of data words of a cold-data link.
pub const LINK_NDATA: usize = 12;

/// Number of channels carried by a cold-data link.
pub const LINK_NCHANNELS: usize = 64;

/// Index of the first word of each cold-data link.
pub const LINK_OFFSETS: [usize; NLINKS] = [2, 16];

/// Index, within a frame, of the header words, in packet order.
pub const HEADER_INDICES: [usize; FRAME_NHEADERS] = [0, 1, 2, 3, 16, 17];

/// The 8b/10b comma character opening every frame.
pub const K28_5: u64 = 0xBC;

/// Frame format version.
pub const VERSION: u64 = 3;

/// Timestamp ticks between two consecutive frames.
pub const DEFAULT_TICKS: u64 = 25;

/// User bits of the first word of a frame.
pub const USER_SOF: u8 = 1 << 1;
pub const USER_RUN_ENABLE: u8 = 1 << 3;

/// User bits of the last word of a frame.
pub const USER_EOF_ERR: u8 = 1 << 0;
pub const USER_FLUSH: u8 = 1 << 2;

/// A 64-bit word of the input stream with its side-band signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputWord {
    pub data: u64,
    /// User bits: start-of-frame and run-enable on the first word, flush and
    /// end-of-frame-with-error on the last one.
    pub user: u8,
    /// End-of-frame marker.
    pub last: bool,
}

impl InputWord {
    pub fn new(data: u64) -> Self {
        Self {
            data,
            user: 0,
            last: false,
        }
    }
}

/// The identity of the WIB fiber a frame comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WibId {
    pub crate_no: u8,
    pub slot: u8,
    pub fiber: u8,
}

impl WibId {
    pub fn new(crate_no: u8, slot: u8, fiber: u8) -> Self {
        Self {
            crate_no: crate_no & 0x1F,
            slot: slot & 0x7,
            fiber: fiber & 0x7,
        }
    }

    /// Extracts the identity from the first WIB header word.
    pub fn from_header(w0: u64) -> Self {
        Self::new(crate_no(w0) as u8, slot(w0) as u8, fiber(w0) as u8)
    }

    /// The 11-bit identity field as it appears in bits [23:13] of the first header word.
    pub fn packed(&self) -> u64 {
        (self.slot as u64) << 8 | (self.crate_no as u64) << 3 | self.fiber as u64
    }
}

impl Display for WibId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.crate_no, self.slot, self.fiber)
    }
}

// WIB header, word 0

#[inline(always)]
pub fn comma(w0: u64) -> u64 {
    field(w0, 0, 8)
}

#[inline(always)]
pub fn version(w0: u64) -> u64 {
    field(w0, 8, 5)
}

#[inline(always)]
pub fn fiber(w0: u64) -> u64 {
    field(w0, 13, 3)
}

#[inline(always)]
pub fn crate_no(w0: u64) -> u64 {
    field(w0, 16, 5)
}

#[inline(always)]
pub fn slot(w0: u64) -> u64 {
    field(w0, 21, 3)
}

/// The packed identity, bits [23:13].
#[inline(always)]
pub fn id(w0: u64) -> u64 {
    field(w0, 13, 11)
}

/// Both reserved fields, [31:24] and [63:48].
#[inline(always)]
pub fn reserved(w0: u64) -> u64 {
    field(w0, 24, 8) | field(w0, 48, 16)
}

/// The WIB error word: capture [35:32], asic [39:36] and error bits [47:40].
#[inline(always)]
pub fn wib_errors(w0: u64) -> u64 {
    field(w0, 32, 16)
}

/// Composes the first WIB header word.
pub fn wib_header0(id: WibId, wib_errors: u16) -> u64 {
    K28_5 | VERSION << 8 | id.packed() << 13 | (wib_errors as u64) << 32
}

/// Cold-data link header words.
pub mod colddata {
    use crate::utils::bits::field;

    #[inline(always)]
    pub fn stream_err1(w0: u64) -> u64 {
        field(w0, 0, 4)
    }

    #[inline(always)]
    pub fn stream_err2(w0: u64) -> u64 {
        field(w0, 4, 4)
    }

    #[inline(always)]
    pub fn rsvd0(w0: u64) -> u64 {
        field(w0, 8, 8)
    }

    #[inline(always)]
    pub fn checksums(w0: u64) -> u64 {
        field(w0, 16, 32)
    }

    #[inline(always)]
    pub fn convert_count(w0: u64) -> u16 {
        field(w0, 48, 16) as u16
    }

    #[inline(always)]
    pub fn err_reg(w1: u64) -> u64 {
        field(w1, 0, 16)
    }

    #[inline(always)]
    pub fn rsvd1(w1: u64) -> u64 {
        field(w1, 16, 16)
    }

    #[inline(always)]
    pub fn hdrs(w1: u64) -> u64 {
        field(w1, 32, 32)
    }

    /// Composes the first header word of a link.
    pub fn header0(checksums: u32, convert_count: u16) -> u64 {
        (checksums as u64) << 16 | (convert_count as u64) << 48
    }

    /// Composes the second header word of a link.
    pub fn header1(hdrs: u32) -> u64 {
        (hdrs as u64) << 32
    }
}

/// How a frame affects the packet being assembled, from its run-disable and flush flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// Run enabled, no flush: the frame belongs to the current packet.
    Normal,
    /// The run is disabled.
    RunDisabled,
    /// The frame flushes the current packet.
    Flush,
    DisabledFlush,
}

impl FrameState {
    /// The number of frame states.
    pub const STATES: usize = 4;

    pub fn is_normal(&self) -> bool {
        *self == FrameState::Normal
    }
}

impl Display for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameState::Normal => write!(f, "{:<15}", "Normal"),
            FrameState::RunDisabled => write!(f, "{:<15}", "RunDisabled"),
            FrameState::Flush => write!(f, "{:<15}", "Flush"),
            FrameState::DisabledFlush => write!(f, "{:<15}", "DisabledFlush"),
        }
    }
}

impl From<usize> for FrameState {
    fn from(value: usize) -> Self {
        match value {
            0 => FrameState::Normal,
            1 => FrameState::RunDisabled,
            2 => FrameState::Flush,
            3 => FrameState::DisabledFlush,
            _ => panic!("Invalid frame state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips_through_the_header() {
        let wib = WibId::new(17, 5, 3);
        let w0 = wib_header0(wib, 0);
        assert_eq!(comma(w0), K28_5);
        assert_eq!(version(w0), VERSION);
        assert_eq!(WibId::from_header(w0), wib);
        assert_eq!(id(w0), wib.packed());
        assert_eq!(reserved(w0), 0);
        assert_eq!(wib_errors(wib_header0(wib, 0x1234)), 0x1234);
    }

    #[test]
    fn colddata_fields() {
        let w0 = colddata::header0(0xDEAD_BEEF, 0x8001);
        assert_eq!(colddata::checksums(w0), 0xDEAD_BEEF);
        assert_eq!(colddata::convert_count(w0), 0x8001);
        assert_eq!(colddata::stream_err1(w0) | colddata::rsvd0(w0), 0);
        assert_eq!(colddata::hdrs(colddata::header1(0x1234_5678)), 0x1234_5678);
    }
}
