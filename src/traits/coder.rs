use crate::bitstream::BitStream64;
use crate::codec::table::CumulativeTable;

/// An arithmetic encoder narrowing its range onto the intervals of a [`CumulativeTable`].
///
/// Implementors must produce the same bits for the same input: the decoder has a single
/// implementation.
pub trait IntervalEncode: Default {
    /// Encodes the interval of `bin`, appending the bits that became known to `out`.
    fn encode(&mut self, bin: usize, table: &CumulativeTable, out: &mut BitStream64);

    /// Terminates the code so that the decoder can tell apart the last interval, and returns
    /// the total number of bits produced by this encoder.
    fn finish(&mut self, out: &mut BitStream64) -> usize;
}
