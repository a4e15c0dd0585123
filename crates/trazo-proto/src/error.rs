//! Error types for protocol configuration.
//!
//! Decoding itself never errors across the flow boundary — malformed
//! stream data is recovered from locally (see the reader docs). These
//! errors cover *configuration*: a reader with an invalid configuration
//! refuses to consume bytes until corrected.

use thiserror::Error;

/// Errors raised while configuring a protocol reader.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    /// The sync word is empty.
    #[error("sync word is empty")]
    EmptySyncWord,

    /// The sync word text ends with an unpaired hex nibble.
    #[error("sync word '{0}' has a trailing unpaired nibble")]
    UnpairedSyncNibble(String),

    /// The sync word text contains a non-hex character.
    #[error("sync word '{0}' contains an invalid hex digit")]
    InvalidSyncDigit(String),

    /// A fixed frame size that cannot hold one row of samples.
    #[error("frame size {size} cannot hold one row of samples ({row} bytes)")]
    FrameTooSmall {
        /// Configured payload size in bytes.
        size: usize,
        /// Bytes required for one sample row.
        row: usize,
    },

    /// Channel count of zero.
    #[error("at least one channel is required")]
    NoChannels,

    /// An unrecognized number format tag.
    #[error("unknown number format: '{0}'")]
    UnknownFormat(String),

    /// An unrecognized endianness tag.
    #[error("unknown endianness: '{0}'")]
    UnknownEndianness(String),

    /// An unrecognized protocol tag.
    #[error("unknown protocol: '{0}'")]
    UnknownProtocol(String),
}
