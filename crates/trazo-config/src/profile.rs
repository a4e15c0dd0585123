//! The persisted settings profile.
//!
//! A profile is a TOML document holding the active protocol tag plus
//! per-reader and per-channel settings. Every field carries a default:
//! missing keys, missing tables and unrecognized tag values all fall back
//! to the in-memory defaults (with a warning), never to a hard failure.
//! Only real I/O and TOML syntax problems surface as [`ConfigError`] —
//! and [`Profile::load_or_default`] swallows even those.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use trazo_core::{ChannelInfoModel, Color};
use trazo_proto::{
    AnyReader, AsciiReader, AsciiReaderConfig, BinaryReader, BinaryReaderConfig, Endianness,
    FramedReader, FramedReaderConfig, NumberFormat, OmitReader, OmitReaderConfig, ProtoError,
    ProtocolKind, SizeField, parse_sync_word,
};

use crate::error::ConfigError;

/// Parses a tag-like string leniently: unknown values warn and fall back
/// to the default.
fn lenient<T: std::str::FromStr + Default>(text: &str, what: &str) -> T
where
    T::Err: std::fmt::Display,
{
    match text.parse() {
        Ok(v) => v,
        Err(e) => {
            warn!("{what}: {e}, using default");
            T::default()
        }
    }
}

/// Settings of the binary passthrough protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BinarySection {
    /// Channel count.
    pub channels: usize,
    /// Number format tag (see [`NumberFormat`]).
    pub format: String,
    /// Endianness tag: `little` or `big`.
    pub endianness: String,
}

impl Default for BinarySection {
    fn default() -> Self {
        Self {
            channels: 1,
            format: NumberFormat::default().as_str().to_string(),
            endianness: Endianness::default().as_str().to_string(),
        }
    }
}

/// Settings of the ASCII protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AsciiSection {
    /// Field separator; only the first character is used.
    pub delimiter: String,
    /// Drop the first (possibly truncated) line after a reset.
    pub discard_first_line: bool,
}

impl Default for AsciiSection {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            discard_first_line: true,
        }
    }
}

/// Settings of the omit-prefixed protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OmitSection {
    /// Channel count.
    pub channels: usize,
    /// Number format tag.
    pub format: String,
    /// Endianness tag.
    pub endianness: String,
    /// Leading bytes to discard before each row.
    pub omit_bytes: usize,
}

impl Default for OmitSection {
    fn default() -> Self {
        Self {
            channels: 1,
            format: NumberFormat::default().as_str().to_string(),
            endianness: Endianness::default().as_str().to_string(),
            omit_bytes: 0,
        }
    }
}

/// Settings of the framed protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FramedSection {
    /// Channel count.
    pub channels: usize,
    /// Sync word as hex text, e.g. `"AA BB"`.
    pub sync_word: String,
    /// Sizing mode: `fixed`, `byte1` or `byte2`.
    pub size_field: String,
    /// Payload size in bytes; used with `size_field = "fixed"`.
    pub frame_size: usize,
    /// Number format tag.
    pub format: String,
    /// Endianness tag.
    pub endianness: String,
    /// Whether a checksum byte trails the payload.
    pub checksum: bool,
    /// Frame-boundary tracing for bring-up.
    pub debug: bool,
}

impl Default for FramedSection {
    fn default() -> Self {
        Self {
            channels: 1,
            sync_word: "AA BB".to_string(),
            size_field: "fixed".to_string(),
            frame_size: 1,
            format: NumberFormat::default().as_str().to_string(),
            endianness: Endianness::default().as_str().to_string(),
            checksum: false,
            debug: false,
        }
    }
}

/// Stream window and X-axis settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamSection {
    /// Sample window size per channel.
    pub num_samples: usize,
    /// Synthesize X as the sample index (true) or a linear sweep (false).
    pub x_as_index: bool,
    /// Linear sweep start.
    pub x_min: f64,
    /// Linear sweep end.
    pub x_max: f64,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            x_as_index: true,
            x_min: 0.0,
            x_max: 1.0,
        }
    }
}

/// Persisted metadata of one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelSection {
    /// Display name; empty keeps the in-memory default.
    pub name: String,
    /// Color as `#rrggbb`; empty keeps the in-memory default.
    pub color: String,
    /// Trace visibility.
    pub visible: bool,
    /// Gain multiplier.
    pub gain: f64,
    /// Whether gain is applied.
    pub gain_en: bool,
    /// Offset addend.
    pub offset: f64,
    /// Whether offset is applied.
    pub offset_en: bool,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: String::new(),
            visible: true,
            gain: 1.0,
            gain_en: false,
            offset: 0.0,
            offset_en: false,
        }
    }
}

/// The complete persisted profile.
///
/// # TOML Format
///
/// ```toml
/// protocol = "framed"
///
/// [framed]
/// channels = 2
/// sync_word = "AA BB"
/// size_field = "fixed"
/// frame_size = 4
/// format = "u16"
/// endianness = "little"
/// checksum = true
///
/// [stream]
/// num_samples = 1000
///
/// [[channels]]
/// name = "voltage"
/// color = "#1f77b4"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    /// Active protocol tag (see [`ProtocolKind`]).
    pub protocol: String,
    /// Binary passthrough settings.
    pub binary: BinarySection,
    /// ASCII settings.
    pub ascii: AsciiSection,
    /// Omit-prefixed settings.
    pub omit: OmitSection,
    /// Framed settings.
    pub framed: FramedSection,
    /// Stream window settings.
    pub stream: StreamSection,
    /// Per-channel metadata, in channel order.
    pub channels: Vec<ChannelSection>,
}

impl Profile {
    /// Loads a profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Loads a profile from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Loads the profile at `path`, falling back to defaults if the file
    /// is missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("could not load profile from '{}': {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Saves the profile to a TOML file, creating parent directories as
    /// needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// The active protocol; an unknown tag warns and selects the default.
    pub fn protocol_kind(&self) -> ProtocolKind {
        if self.protocol.is_empty() {
            return ProtocolKind::default();
        }
        lenient(&self.protocol, "protocol")
    }

    /// Reader settings for the binary protocol.
    pub fn binary_config(&self) -> BinaryReaderConfig {
        BinaryReaderConfig {
            num_channels: self.binary.channels.max(1),
            format: lenient(&self.binary.format, "binary.format"),
            endianness: lenient(&self.binary.endianness, "binary.endianness"),
        }
    }

    /// Reader settings for the ASCII protocol.
    pub fn ascii_config(&self) -> AsciiReaderConfig {
        AsciiReaderConfig {
            delimiter: self.ascii.delimiter.chars().next().unwrap_or(','),
            discard_first_line: self.ascii.discard_first_line,
        }
    }

    /// Reader settings for the omit-prefixed protocol.
    pub fn omit_config(&self) -> OmitReaderConfig {
        OmitReaderConfig {
            num_channels: self.omit.channels.max(1),
            format: lenient(&self.omit.format, "omit.format"),
            endianness: lenient(&self.omit.endianness, "omit.endianness"),
            omit_bytes: self.omit.omit_bytes,
        }
    }

    /// Reader settings for the framed protocol.
    ///
    /// Tag fields fall back leniently; an unparsable sync word falls back
    /// to the default marker. Semantic validity (frame size vs. row size)
    /// is checked by [`FramedReader::new`], not here.
    pub fn framed_config(&self) -> FramedReaderConfig {
        let sync_word = match parse_sync_word(&self.framed.sync_word) {
            Ok(word) => word,
            Err(e) => {
                warn!("framed.sync_word: {e}, using default");
                vec![0xaa, 0xbb]
            }
        };
        let size_field = match self.framed.size_field.as_str() {
            "fixed" => SizeField::Fixed(self.framed.frame_size),
            "byte1" => SizeField::OneByte,
            "byte2" => SizeField::TwoBytes,
            other => {
                warn!("framed.size_field: unknown mode '{other}', using fixed");
                SizeField::Fixed(self.framed.frame_size)
            }
        };
        FramedReaderConfig {
            sync_word,
            size_field,
            num_channels: self.framed.channels.max(1),
            format: lenient(&self.framed.format, "framed.format"),
            endianness: lenient(&self.framed.endianness, "framed.endianness"),
            checksum: self.framed.checksum,
            debug: self.framed.debug,
        }
    }

    /// Builds the reader selected by the protocol tag.
    pub fn make_reader(&self) -> Result<AnyReader, ProtoError> {
        Ok(match self.protocol_kind() {
            ProtocolKind::Binary => AnyReader::Binary(BinaryReader::new(self.binary_config())?),
            ProtocolKind::Ascii => AnyReader::Ascii(AsciiReader::new(self.ascii_config())),
            ProtocolKind::Omit => AnyReader::Omit(OmitReader::new(self.omit_config())?),
            ProtocolKind::Framed => AnyReader::Framed(FramedReader::new(self.framed_config())?),
        })
    }

    /// Applies the persisted channel metadata to a model. Entries beyond
    /// the model's active channel count are ignored; empty names and
    /// colors keep the model's defaults.
    pub fn apply_channels(&self, model: &mut ChannelInfoModel) {
        let n = model.num_channels().min(self.channels.len());
        for (i, section) in self.channels[..n].iter().enumerate() {
            model.update(i, |info| {
                if !section.name.is_empty() {
                    info.name = section.name.clone();
                }
                if let Some(color) = Color::from_hex(&section.color) {
                    info.color = color;
                }
                info.visible = section.visible;
                info.gain = section.gain;
                info.gain_en = section.gain_en;
                info.offset = section.offset;
                info.offset_en = section.offset_en;
            });
        }
    }

    /// Captures a model's active channels into the profile.
    pub fn capture_channels(&mut self, model: &ChannelInfoModel) {
        self.channels = (0..model.num_channels())
            .map(|i| {
                let info = model.info(i);
                ChannelSection {
                    name: info.name.clone(),
                    color: info.color.to_hex(),
                    visible: info.visible,
                    gain: info.gain,
                    gain_en: info.gain_en,
                    offset: info.offset,
                    offset_en: info.offset_en,
                }
            })
            .collect();
    }
}
