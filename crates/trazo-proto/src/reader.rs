//! The capability surface shared by all protocol readers.

use trazo_core::{SamplePack, Source};

use crate::format::{Endianness, NumberFormat};

/// A protocol reader: a [`Source`] that turns raw byte chunks into
/// [`SamplePack`]s under a specific wire contract.
///
/// `feed` never blocks and never fails: a reader that lacks enough bytes
/// for its current phase simply retains state and returns; malformed
/// stream data is recovered from internally and yields zero packs for
/// that event.
pub trait Reader: Source {
    /// Consumes one chunk of raw bytes, emitting zero or more packs
    /// through the outlet.
    fn feed(&mut self, bytes: &[u8]);

    /// Drops buffered bytes and partial parse state. Called on
    /// reconfiguration and transport restart.
    fn reset(&mut self);
}

/// Decodes row `row` of `pack` from `bytes`, one sample per channel in
/// channel order.
///
/// `bytes` must hold at least `num_channels * format.byte_size()` bytes.
pub(crate) fn decode_row(
    pack: &mut SamplePack,
    row: usize,
    bytes: &[u8],
    format: NumberFormat,
    endianness: Endianness,
) {
    let width = format.byte_size();
    for ci in 0..pack.num_channels() {
        let sample = format.decode(&bytes[ci * width..ci * width + width], endianness);
        pack.channel_mut(ci)[row] = sample;
    }
}
