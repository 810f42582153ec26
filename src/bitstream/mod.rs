//! Bit-level streams used to pack the compressed data.
//!
//! All streams are MSB-first: bit 0 of the logical stream is the most significant bit of the
//! first 64-bit word. [`BitStream64`] produces such a stream, [`BitReader`] consumes it from a
//! byte buffer whose layout in memory is described by a [`StreamLayout`].

pub mod reader;
pub mod writer;

pub use reader::{BitReader, StreamLayout};
pub use writer::BitStream64;
