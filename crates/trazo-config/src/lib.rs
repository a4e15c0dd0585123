//! Trazo Config - persisted settings for protocols and channels.
//!
//! Settings live in a single TOML profile: the active protocol tag,
//! per-reader fields (channel count, sync word, number format, byte
//! order, checksum, omit count), the stream window, and per-channel
//! display metadata.
//!
//! Loading is deliberately lenient: missing keys, missing tables and
//! unrecognized tag values fall back to the in-memory defaults instead of
//! failing hard, so an old or hand-edited profile always produces a
//! usable configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use trazo_config::{Profile, paths};
//!
//! let profile = Profile::load_or_default(paths::default_profile_path());
//! let reader = profile.make_reader().expect("reader settings");
//! ```

mod error;
mod profile;

/// Platform-specific configuration paths.
pub mod paths;

pub use error::ConfigError;
pub use profile::{
    AsciiSection, BinarySection, ChannelSection, FramedSection, OmitSection, Profile,
    StreamSection,
};
