//! Trazo Proto - protocol decoders for raw device byte streams
//!
//! Each reader is a [`Source`](trazo_core::Source) that consumes raw byte
//! chunks (fragmented at arbitrary boundaries) and emits decoded
//! [`SamplePack`](trazo_core::SamplePack)s to its connected sinks. All
//! decoding is synchronous and non-blocking: a reader that lacks bytes
//! for its current phase retains state and returns.
//!
//! # Readers
//!
//! - [`BinaryReader`] - unframed rows of fixed-format samples
//! - [`AsciiReader`] - delimiter-separated decimal text, one row per line
//! - [`OmitReader`] - fixed prefix to discard, then a single row
//! - [`FramedReader`] - sync word + optional size field + payload +
//!   optional checksum; the self-resynchronizing state machine
//! - [`DemoSource`] - synthetic generator, no bytes involved
//!
//! The active protocol is selected at setup time through the closed
//! [`AnyReader`] enum keyed by [`ProtocolKind`] — a tagged dispatch, not
//! a trait object.
//!
//! # Shared descriptors
//!
//! - [`NumberFormat`] / [`Endianness`] - sample wire format
//! - [`checksum_of`] / [`Checksum`] - the mod-256 payload checksum
//!
//! # Error model
//!
//! Only *configuration* fails ([`ProtoError`]); feeding never does.
//! Stream corruption is recovered locally per reader (see each reader's
//! docs) and at worst yields zero packs for the event.

use std::fmt;
use std::str::FromStr;

pub mod ascii;
pub mod binary;
pub mod checksum;
pub mod demo;
pub mod error;
pub mod format;
pub mod framed;
pub mod omit;
pub mod reader;

#[cfg(test)]
pub(crate) mod test_util;

pub use ascii::{AsciiReader, AsciiReaderConfig};
pub use binary::{BinaryReader, BinaryReaderConfig};
pub use checksum::{Checksum, checksum_of};
pub use demo::DemoSource;
pub use error::ProtoError;
pub use format::{Endianness, NumberFormat};
pub use framed::{FramedReader, FramedReaderConfig, FramedStats, SizeField, parse_sync_word};
pub use omit::{OmitReader, OmitReaderConfig};
pub use reader::Reader;

use trazo_core::{Outlet, Source};

/// Tags identifying the selectable protocols. The string forms are the
/// values persisted in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProtocolKind {
    /// Unframed binary rows.
    #[default]
    Binary,
    /// Delimiter-separated text lines.
    Ascii,
    /// Omit-prefixed single rows.
    Omit,
    /// Framed binary with sync word.
    Framed,
}

impl ProtocolKind {
    /// Stable tag used in persisted settings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Ascii => "ascii",
            Self::Omit => "omit",
            Self::Framed => "framed",
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolKind {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Self::Binary),
            "ascii" => Ok(Self::Ascii),
            "omit" => Ok(Self::Omit),
            "framed" => Ok(Self::Framed),
            other => Err(ProtoError::UnknownProtocol(other.to_string())),
        }
    }
}

/// The closed set of protocol readers, selected at setup time.
pub enum AnyReader {
    /// Unframed binary rows.
    Binary(BinaryReader),
    /// Delimiter-separated text lines.
    Ascii(AsciiReader),
    /// Omit-prefixed single rows.
    Omit(OmitReader),
    /// Framed binary with sync word.
    Framed(FramedReader),
}

impl AnyReader {
    /// Which protocol this reader decodes.
    pub fn kind(&self) -> ProtocolKind {
        match self {
            Self::Binary(_) => ProtocolKind::Binary,
            Self::Ascii(_) => ProtocolKind::Ascii,
            Self::Omit(_) => ProtocolKind::Omit,
            Self::Framed(_) => ProtocolKind::Framed,
        }
    }
}

impl Source for AnyReader {
    fn outlet(&self) -> &Outlet {
        match self {
            Self::Binary(r) => r.outlet(),
            Self::Ascii(r) => r.outlet(),
            Self::Omit(r) => r.outlet(),
            Self::Framed(r) => r.outlet(),
        }
    }

    fn outlet_mut(&mut self) -> &mut Outlet {
        match self {
            Self::Binary(r) => r.outlet_mut(),
            Self::Ascii(r) => r.outlet_mut(),
            Self::Omit(r) => r.outlet_mut(),
            Self::Framed(r) => r.outlet_mut(),
        }
    }
}

impl Reader for AnyReader {
    fn feed(&mut self, bytes: &[u8]) {
        match self {
            Self::Binary(r) => r.feed(bytes),
            Self::Ascii(r) => r.feed(bytes),
            Self::Omit(r) => r.feed(bytes),
            Self::Framed(r) => r.feed(bytes),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Binary(r) => r.reset(),
            Self::Ascii(r) => r.reset(),
            Self::Omit(r) => r.reset(),
            Self::Framed(r) => r.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_tags_round_trip() {
        for kind in [
            ProtocolKind::Binary,
            ProtocolKind::Ascii,
            ProtocolKind::Omit,
            ProtocolKind::Framed,
        ] {
            assert_eq!(kind.as_str().parse::<ProtocolKind>(), Ok(kind));
        }
        assert!("modbus".parse::<ProtocolKind>().is_err());
    }

    #[test]
    fn any_reader_reports_kind_and_delegates() {
        let mut reader = AnyReader::Binary(
            BinaryReader::new(BinaryReaderConfig::default()).unwrap(),
        );
        assert_eq!(reader.kind(), ProtocolKind::Binary);
        assert_eq!(reader.num_channels(), 1);
        reader.feed(&[1, 2]);
        reader.reset();
    }
}
