use std::fmt::Display;

use itertools::Itertools;
use mem_dbg::{MemDbg, MemSize};

use crate::wib::{FrameState, ReadStatus};

/// Counters of the frames read.
#[derive(Clone, Debug, Default, PartialEq, Eq, MemDbg, MemSize)]
pub struct ReadSummary {
    /// OR of the status of every frame read.
    pub mask: u32,
    pub nframes: u64,
    /// Frames per [`FrameState`].
    pub states: [u64; FrameState::STATES],
    /// Occurrences of each framing error, SOF missing first.
    pub frame_errors: [u64; ReadStatus::NFRAME_ERRORS],
    /// Occurrences of each WIB and cold-data header anomaly.
    pub header_errors: [u64; ReadStatus::NHEADER_ERRORS],
}

/// Counters of what was written.
#[derive(Clone, Debug, Default, PartialEq, Eq, MemDbg, MemSize)]
pub struct WriteSummary {
    pub nbytes: u64,
    pub npackets: u64,
    /// Frames that made it into a packet.
    pub npromoted: u64,
    /// Frames read but not written.
    pub ndropped: u64,
    /// Channels cut by the packet size limit.
    pub ndropped_channels: u64,
    /// Channels the production encoder got wrong.
    pub ndivergences: u64,
    /// Exceptions that didn't fit the exception buffer.
    pub ndropped_exceptions: u64,
}

/// Monitoring counters of a compression module.
#[derive(Clone, Debug, Default, PartialEq, Eq, MemDbg, MemSize)]
pub struct Monitor {
    pub read: ReadSummary,
    pub write: WriteSummary,
}

impl Monitor {
    /// Accounts for a frame read with the given status.
    pub fn update_read(&mut self, status: ReadStatus) {
        let read = &mut self.read;
        read.mask |= status.0;
        read.nframes += 1;
        read.states[status.state() as usize] += 1;

        let frame_errors = status.frame_errors();
        for (bit, counter) in read.frame_errors.iter_mut().enumerate() {
            *counter += (frame_errors >> bit & 1) as u64;
        }
        let header_errors = status.header_errors();
        for (bit, counter) in read.header_errors.iter_mut().enumerate() {
            *counter += (header_errors >> bit & 1) as u64;
        }
    }

    /// Accounts for a packet of `nwords` 64-bit words holding `nframes` frames.
    pub fn update_packet(&mut self, nwords: usize, nframes: usize) {
        self.write.npackets += 1;
        self.write.nbytes += 8 * nwords as u64;
        self.write.npromoted += nframes as u64;
    }

    /// Accounts for frames read but not written.
    pub fn update_dropped(&mut self, nframes: usize) {
        self.write.ndropped += nframes as u64;
    }
}

impl Display for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let read = &self.read;
        let write = &self.write;
        writeln!(f, "Read:   {:>12} frames, status mask {:08x}", read.nframes, read.mask)?;
        for (idx, count) in read.states.iter().enumerate() {
            writeln!(f, "        {} {:>12}", FrameState::from(idx), count)?;
        }
        writeln!(
            f,
            "Frame errors (SofM SofU EofM EofU EofE): {}",
            read.frame_errors.iter().join(" ")
        )?;
        writeln!(
            f,
            "Header errors: wib {} link0 {} link1 {}",
            read.header_errors[..8].iter().sum::<u64>(),
            read.header_errors[8..16].iter().sum::<u64>(),
            read.header_errors[16..].iter().sum::<u64>()
        )?;
        writeln!(
            f,
            "Write:  {:>12} packets, {} bytes, {} frames promoted, {} dropped",
            write.npackets, write.nbytes, write.npromoted, write.ndropped
        )?;
        write!(
            f,
            "        {} channels dropped, {} divergences, {} exceptions dropped",
            write.ndropped_channels, write.ndivergences, write.ndropped_exceptions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_counters() {
        let mut monitor = Monitor::default();
        let mut status = ReadStatus::default();
        monitor.update_read(status);
        status.set(ReadStatus::FLUSH, true);
        status.set(ReadStatus::EOF_MISSING, true);
        status.set(ReadStatus::LINK_BASE[1] + ReadStatus::CD_HDRS, true);
        monitor.update_read(status);

        assert_eq!(monitor.read.nframes, 2);
        assert_eq!(monitor.read.states, [1, 0, 1, 0]);
        assert_eq!(monitor.read.frame_errors, [0, 0, 1, 0, 0]);
        assert_eq!(monitor.read.header_errors[23], 1);
        assert_eq!(monitor.read.mask, status.0);
        assert!(monitor.to_string().contains("Frame errors"));
    }
}
