//! Omit-prefixed protocol: a header to skip, then one sample row.
//!
//! A weaker, manually-triggered protocol for devices that prepend a
//! fixed-length header blob before each reading. Unlike the framed
//! reader there is no self-resynchronizing scan: each feed event either
//! yields exactly one row or drops the whole pending buffer.

use tracing::error;

use trazo_core::{Outlet, SamplePack, Source};

use crate::error::ProtoError;
use crate::format::{Endianness, NumberFormat};
use crate::reader::{Reader, decode_row};

/// Settings of the omit-prefixed protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmitReaderConfig {
    /// Samples per row.
    pub num_channels: usize,
    /// Wire format of each sample.
    pub format: NumberFormat,
    /// Byte order of multi-byte samples.
    pub endianness: Endianness,
    /// Leading bytes to discard before the row.
    pub omit_bytes: usize,
}

impl Default for OmitReaderConfig {
    fn default() -> Self {
        Self {
            num_channels: 1,
            format: NumberFormat::default(),
            endianness: Endianness::default(),
            omit_bytes: 0,
        }
    }
}

impl OmitReaderConfig {
    fn validate(&self) -> Result<(), ProtoError> {
        if self.num_channels == 0 {
            return Err(ProtoError::NoChannels);
        }
        Ok(())
    }
}

/// Reader that discards a fixed prefix, decodes a single row, and throws
/// the rest of the pending bytes away.
///
/// When the accumulated bytes cannot fit the prefix *and* one full row,
/// but already hold at least a row's worth, the whole buffer is dropped
/// as a hard error — there is no partial salvage. Fewer bytes than one
/// row simply wait for the next event.
pub struct OmitReader {
    config: OmitReaderConfig,
    buf: Vec<u8>,
    outlet: Outlet,
}

impl OmitReader {
    /// Creates a reader with the given settings.
    pub fn new(config: OmitReaderConfig) -> Result<Self, ProtoError> {
        config.validate()?;
        let outlet = Outlet::new(config.num_channels, false);
        Ok(Self {
            config,
            buf: Vec::new(),
            outlet,
        })
    }

    /// Current settings.
    pub fn config(&self) -> &OmitReaderConfig {
        &self.config
    }

    /// Replaces the settings, dropping buffered bytes and propagating a
    /// channel-count change downstream.
    pub fn set_config(&mut self, config: OmitReaderConfig) -> Result<(), ProtoError> {
        config.validate()?;
        if config.num_channels != self.config.num_channels {
            self.outlet.set_num_channels(config.num_channels, false);
        }
        self.config = config;
        self.reset();
        Ok(())
    }

    fn row_size(&self) -> usize {
        self.config.num_channels * self.config.format.byte_size()
    }
}

impl Source for OmitReader {
    fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    fn outlet_mut(&mut self) -> &mut Outlet {
        &mut self.outlet
    }
}

impl Reader for OmitReader {
    fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);

        let row_size = self.row_size();
        if self.buf.len() < row_size {
            return;
        }

        if self.config.omit_bytes > self.buf.len() - row_size {
            error!(
                omit = self.config.omit_bytes,
                available = self.buf.len(),
                "omit count exceeds available payload, dropping buffer"
            );
            self.buf.clear();
            return;
        }

        let start = self.config.omit_bytes;
        let mut pack = SamplePack::new(1, self.config.num_channels, false);
        decode_row(
            &mut pack,
            0,
            &self.buf[start..],
            self.config.format,
            self.config.endianness,
        );
        // single-row protocol: whatever trails the row is discarded
        self.buf.clear();
        self.outlet.feed_out(&pack);
    }

    fn reset(&mut self) {
        self.buf.clear();
    }
}
