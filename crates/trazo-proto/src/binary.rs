//! Unframed binary protocol: a plain sequence of sample rows.

use trazo_core::{Outlet, SamplePack, Source};

use crate::error::ProtoError;
use crate::format::{Endianness, NumberFormat};
use crate::reader::{Reader, decode_row};

/// Settings of the binary passthrough protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryReaderConfig {
    /// Samples per row.
    pub num_channels: usize,
    /// Wire format of each sample.
    pub format: NumberFormat,
    /// Byte order of multi-byte samples.
    pub endianness: Endianness,
}

impl Default for BinaryReaderConfig {
    fn default() -> Self {
        Self {
            num_channels: 1,
            format: NumberFormat::default(),
            endianness: Endianness::default(),
        }
    }
}

impl BinaryReaderConfig {
    fn validate(&self) -> Result<(), ProtoError> {
        if self.num_channels == 0 {
            return Err(ProtoError::NoChannels);
        }
        Ok(())
    }
}

/// Reader for a stream with no framing at all: every
/// `channels × sample-width` bytes is one complete row.
///
/// Each feed event emits a single pack holding every complete row
/// available; a trailing partial row is retained for the next event.
pub struct BinaryReader {
    config: BinaryReaderConfig,
    buf: Vec<u8>,
    outlet: Outlet,
}

impl BinaryReader {
    /// Creates a reader with the given settings.
    pub fn new(config: BinaryReaderConfig) -> Result<Self, ProtoError> {
        config.validate()?;
        let outlet = Outlet::new(config.num_channels, false);
        Ok(Self {
            config,
            buf: Vec::new(),
            outlet,
        })
    }

    /// Current settings.
    pub fn config(&self) -> &BinaryReaderConfig {
        &self.config
    }

    /// Replaces the settings, dropping buffered bytes and propagating a
    /// channel-count change downstream.
    pub fn set_config(&mut self, config: BinaryReaderConfig) -> Result<(), ProtoError> {
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

impl Source for BinaryReader {
    fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    fn outlet_mut(&mut self) -> &mut Outlet {
        &mut self.outlet
    }
}

impl Reader for BinaryReader {
    fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);

        let row_size = self.row_size();
        let rows = self.buf.len() / row_size;
        if rows == 0 {
            return;
        }

        let mut pack = SamplePack::new(rows, self.config.num_channels, false);
        for r in 0..rows {
            decode_row(
                &mut pack,
                r,
                &self.buf[r * row_size..],
                self.config.format,
                self.config.endianness,
            );
        }
        self.buf.drain(..rows * row_size);
        self.outlet.feed_out(&pack);
    }

    fn reset(&mut self) {
        self.buf.clear();
    }
}
