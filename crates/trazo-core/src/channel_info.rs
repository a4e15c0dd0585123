//! Per-channel display metadata: names, colors, visibility, gain/offset.
//!
//! Metadata is kept in an append-only arena indexed by channel slot.
//! Shrinking the channel count marks slots inactive but never discards
//! their entries, so re-grown channels recover the names and colors a
//! user gave them earlier.

/// RGB display color for a channel trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl Color {
    /// Parses `"#rrggbb"` or `"rrggbb"`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// Formats as `"#rrggbb"`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Default trace palette, cycled by channel index.
pub const PALETTE: [Color; 8] = [
    Color { r: 0x1f, g: 0x77, b: 0xb4 },
    Color { r: 0xff, g: 0x7f, b: 0x0e },
    Color { r: 0x2c, g: 0xa0, b: 0x2c },
    Color { r: 0xd6, g: 0x27, b: 0x28 },
    Color { r: 0x94, g: 0x67, b: 0xbd },
    Color { r: 0x8c, g: 0x56, b: 0x4b },
    Color { r: 0xe3, g: 0x77, b: 0xc2 },
    Color { r: 0x7f, g: 0x7f, b: 0x7f },
];

/// Metadata for one channel slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    /// Display name.
    pub name: String,
    /// Trace color.
    pub color: Color,
    /// Whether the trace is drawn.
    pub visible: bool,
    /// Multiplier applied to incoming samples when `gain_en` is set.
    pub gain: f64,
    /// Whether gain is applied.
    pub gain_en: bool,
    /// Offset added to incoming samples when `offset_en` is set.
    pub offset: f64,
    /// Whether offset is applied.
    pub offset_en: bool,
}

impl ChannelInfo {
    /// Default metadata for the channel at `index`: name `Channel N`
    /// (1-based), palette color, visible, unity gain and zero offset
    /// disabled.
    pub fn new(index: usize) -> Self {
        Self {
            name: format!("Channel {}", index + 1),
            color: PALETTE[index % PALETTE.len()],
            visible: true,
            gain: 1.0,
            gain_en: false,
            offset: 0.0,
            offset_en: false,
        }
    }
}

/// Append-only arena of channel metadata.
///
/// `num_channels` tracks how many leading slots are active; the arena
/// itself only ever grows.
#[derive(Debug, Clone)]
pub struct ChannelInfoModel {
    num_channels: usize,
    infos: Vec<ChannelInfo>,
    /// Cached: true when any *active* channel has gain or offset enabled.
    gain_or_offset_en: bool,
}

impl ChannelInfoModel {
    /// Creates a model with `num_channels` active channels.
    pub fn new(num_channels: usize) -> Self {
        let infos = (0..num_channels).map(ChannelInfo::new).collect();
        Self {
            num_channels,
            infos,
            gain_or_offset_en: false,
        }
    }

    /// Number of active channels.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Metadata of active channel `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_channels()`.
    pub fn info(&self, i: usize) -> &ChannelInfo {
        assert!(i < self.num_channels, "channel index out of range");
        &self.infos[i]
    }

    /// Mutates metadata of active channel `i` through `f`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_channels()`.
    pub fn update(&mut self, i: usize, f: impl FnOnce(&mut ChannelInfo)) {
        assert!(i < self.num_channels, "channel index out of range");
        f(&mut self.infos[i]);
        self.refresh_gain_or_offset_en();
    }

    /// True when any active channel has gain or offset enabled.
    pub fn gain_or_offset_en(&self) -> bool {
        self.gain_or_offset_en
    }

    /// Names of all active channels.
    pub fn channel_names(&self) -> Vec<String> {
        self.infos[..self.num_channels]
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Changes the active channel count.
    ///
    /// Growing extends the arena with defaults where no retained entry
    /// exists; shrinking only moves the active mark, keeping every entry
    /// for later regrowth.
    pub fn set_num_channels(&mut self, n: usize) {
        while self.infos.len() < n {
            self.infos.push(ChannelInfo::new(self.infos.len()));
        }
        self.num_channels = n;
        self.refresh_gain_or_offset_en();
    }

    /// Resets every entry to its defaults.
    pub fn reset_infos(&mut self) {
        for (i, info) in self.infos.iter_mut().enumerate() {
            *info = ChannelInfo::new(i);
        }
        self.gain_or_offset_en = false;
    }

    /// Resets all names to `Channel N`.
    pub fn reset_names(&mut self) {
        for (i, info) in self.infos.iter_mut().enumerate() {
            info.name = format!("Channel {}", i + 1);
        }
    }

    /// Resets all colors to the palette.
    pub fn reset_colors(&mut self) {
        for (i, info) in self.infos.iter_mut().enumerate() {
            info.color = PALETTE[i % PALETTE.len()];
        }
    }

    /// Disables all gains and resets them to unity.
    pub fn reset_gains(&mut self) {
        for info in &mut self.infos {
            info.gain = 1.0;
            info.gain_en = false;
        }
        self.refresh_gain_or_offset_en();
    }

    /// Disables all offsets and resets them to zero.
    pub fn reset_offsets(&mut self) {
        for info in &mut self.infos {
            info.offset = 0.0;
            info.offset_en = false;
        }
        self.refresh_gain_or_offset_en();
    }

    /// Sets every channel's visibility.
    pub fn reset_visibility(&mut self, visible: bool) {
        for info in &mut self.infos {
            info.visible = visible;
        }
    }

    fn refresh_gain_or_offset_en(&mut self) {
        self.gain_or_offset_en = self.infos[..self.num_channels]
            .iter()
            .any(|c| c.gain_en || c.offset_en);
    }
}
