pub mod bitstream;
pub mod codec;
pub mod config;
pub mod monitor;
pub mod packet;
pub mod traits;
pub mod utils;
pub mod wib;

/// Number of bits in a raw ADC sample.
pub const ADC_NBITS: usize = 12;

/// Mask extracting a raw ADC sample.
pub const ADC_MASK: u32 = (1 << ADC_NBITS) - 1;

/// Number of bits needed to hold a [`Symbol`]. The difference of two ADCs needs one more bit
/// than the ADCs themselves.
pub const SYMBOL_NBITS: usize = ADC_NBITS + 1;

/// The largest symbol the difference mapping can produce.
pub const MAX_SYMBOL: Symbol = (1 << SYMBOL_NBITS) - 1;

/// Number of time samples per channel in one packet.
pub const PACKET_NSAMPLES: usize = 1024;

/// Number of channels serviced by one compression module, i.e. the ADCs carried by one WIB frame.
pub const MODULE_NCHANNELS: usize = 128;

/// A raw 12-bit ADC sample.
pub type Adc = u16;

/// The value that is actually entropy coded: the folded difference between two consecutive
/// samples of the same channel (see [`codec::symbol`]).
///
/// The first sample of a packet is not a difference; it seeds the channel and is stored
/// verbatim, so the symbol buffer of a channel holds the seed ADC at index 0.
pub type Symbol = u16;

/// The working register of the arithmetic coder. Only the low [`codec::CV_NBITS`] bits are
/// significant; a wider type is used so that intermediate products don't overflow.
pub type CodeValue = u32;

/// The type of the cumulative counts stored in a [`codec::table::CumulativeTable`].
pub type Freq = u16;
