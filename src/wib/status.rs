use std::fmt::Display;

use crate::wib::{FrameState, FRAME_NHEADERS};

/// The status of a read frame: one flag per anomaly found in it plus the two state bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ReadStatus(pub u32);

impl ReadStatus {
    // WIB header
    pub const WIB_COMMA: u32 = 0;
    pub const WIB_VERSION: u32 = 1;
    pub const WIB_ID: u32 = 2;
    pub const WIB_RESERVED: u32 = 3;
    pub const WIB_ERRORS: u32 = 4;
    pub const WIB_TIMESTAMP: u32 = 5;

    /// First bit of the flags of each cold-data link.
    pub const LINK_BASE: [u32; 2] = [8, 16];

    // Cold-data link flags, relative to the link base
    pub const CD_STREAM_ERR1: u32 = 0;
    pub const CD_STREAM_ERR2: u32 = 1;
    pub const CD_RESERVED0: u32 = 2;
    pub const CD_CHECKSUM: u32 = 3;
    pub const CD_CONVERT_COUNT: u32 = 4;
    pub const CD_ERR_REG: u32 = 5;
    pub const CD_RESERVED1: u32 = 6;
    pub const CD_HDRS: u32 = 7;

    // State
    pub const RUN_DISABLE: u32 = 24;
    pub const FLUSH: u32 = 25;

    // Framing
    pub const SOF_MISSING: u32 = 26;
    pub const SOF_UNEXPECTED: u32 = 27;
    pub const EOF_MISSING: u32 = 28;
    pub const EOF_UNEXPECTED: u32 = 29;
    pub const EOF_ERROR: u32 = 30;

    /// Number of framing error flags.
    pub const NFRAME_ERRORS: usize = 5;

    /// Number of header error flags: the WIB and the cold-data ones.
    pub const NHEADER_ERRORS: usize = 24;

    /// For each header word of a frame, the status flags that describe it.
    pub const HEADER_GROUPS: [u32; FRAME_NHEADERS] = [
        0x00_00_1F,
        0x00_00_E0,
        0x00_1F_00,
        0x00_E0_00,
        0x1F_00_00,
        0xE0_00_00,
    ];

    #[inline(always)]
    pub fn set(&mut self, bit: u32, value: bool) {
        self.0 |= (value as u32) << bit;
    }

    #[inline(always)]
    pub fn test(&self, bit: u32) -> bool {
        self.0 & (1 << bit) != 0
    }

    /// The run-disable and flush bits.
    pub fn state(&self) -> FrameState {
        FrameState::from(((self.0 >> Self::RUN_DISABLE) & 0x3) as usize)
    }

    /// The framing error flags, right justified.
    pub fn frame_errors(&self) -> u32 {
        self.0 >> Self::SOF_MISSING
    }

    /// Whether the frame was delimited correctly.
    pub fn is_good_frame(&self) -> bool {
        self.frame_errors() == 0
    }

    /// The header error flags, right justified.
    pub fn header_errors(&self) -> u32 {
        self.0 & ((1 << Self::NHEADER_ERRORS) - 1)
    }

    /// One bit per header word with at least one anomaly, in the order of
    /// [`HEADER_INDICES`](crate::wib::HEADER_INDICES).
    pub fn header_mask(&self) -> u8 {
        Self::HEADER_GROUPS
            .iter()
            .enumerate()
            .filter(|(_, group)| self.0 & **group != 0)
            .fold(0, |mask, (idx, _)| mask | 1 << idx)
    }
}

impl Display for ReadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x} ({})", self.0, self.state())
    }
}
