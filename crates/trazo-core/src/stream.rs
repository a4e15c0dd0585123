//! Main waveform storage: one ring buffer per channel plus an X axis.
//!
//! [`Stream`] is the long-lived sink at the end of a decoder chain. It
//! owns per-channel [`RingBuffer`]s sized to the sample window, an X
//! buffer (real when the protocol supplies X values, virtual otherwise),
//! and the channel metadata arena. Downstream consumers read buffer
//! snapshots and subscribe to change notifications; they never mutate.

use tracing::warn;

use crate::channel_info::ChannelInfoModel;
use crate::flow::{Outlet, Sink, SourceId};
use crate::frame_buffer::{FrameBuffer, Range, ReadOnlyBuffer};
use crate::index_buffer::{IndexBuffer, LinIndexBuffer};
use crate::ring_buffer::RingBuffer;
use crate::sample_pack::SamplePack;

/// Notification raised by a [`Stream`] after it mutates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamEvent {
    /// Samples were appended to the channel buffers.
    DataAdded,
    /// The channel count changed; buffers were rebuilt.
    NumChannelsChanged(usize),
    /// The sample window size changed; buffers were resized.
    NumSamplesChanged(usize),
}

/// X-axis storage: real when fed by the protocol, virtual otherwise.
enum XData {
    Index(IndexBuffer),
    Linear(LinIndexBuffer),
    Ring(RingBuffer),
}

/// Synchronized multi-channel waveform store.
pub struct Stream {
    num_samples: usize,
    paused: bool,
    has_x: bool,
    x_as_index: bool,
    x_range: Range,
    x: XData,
    channels: Vec<RingBuffer>,
    info: ChannelInfoModel,
    upstream: Option<SourceId>,
    followers: Outlet,
    listeners: Vec<Box<dyn FnMut(&StreamEvent)>>,
}

impl Stream {
    /// Creates a stream of `num_channels` channels holding a window of
    /// `num_samples` samples each.
    ///
    /// `has_x` declares whether the upstream protocol supplies X values;
    /// without them the X axis is synthesized (sample index by default,
    /// see [`set_x_axis`](Self::set_x_axis)).
    ///
    /// # Panics
    ///
    /// Panics if `num_channels` or `num_samples` is 0.
    pub fn new(num_channels: usize, has_x: bool, num_samples: usize) -> Self {
        assert!(num_channels > 0, "Stream requires at least one channel");
        assert!(num_samples > 0, "Stream requires a non-empty window");

        let x_range = Range { start: 0.0, end: 1.0 };
        let mut stream = Self {
            num_samples,
            paused: false,
            has_x,
            x_as_index: true,
            x_range,
            x: XData::Index(IndexBuffer::new(num_samples)),
            channels: (0..num_channels)
                .map(|_| RingBuffer::new(num_samples))
                .collect(),
            info: ChannelInfoModel::new(num_channels),
            upstream: None,
            followers: Outlet::new(num_channels, has_x),
            listeners: Vec::new(),
        };
        stream.x = stream.make_x_buffer();
        stream
    }

    /// Whether the X axis comes from the protocol.
    pub fn has_x(&self) -> bool {
        self.has_x
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Sample window size.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Storage of channel `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn channel_buffer(&self, i: usize) -> &RingBuffer {
        &self.channels[i]
    }

    /// The X-axis buffer behind the common read contract.
    pub fn x_buffer(&self) -> &dyn FrameBuffer {
        match &self.x {
            XData::Index(b) => b,
            XData::Linear(b) => b,
            XData::Ring(b) => b,
        }
    }

    /// Immutable snapshot of channel `i`, for export.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn snapshot_channel(&self, i: usize) -> ReadOnlyBuffer {
        ReadOnlyBuffer::new(&self.channels[i])
    }

    /// Channel metadata.
    pub fn info(&self) -> &ChannelInfoModel {
        &self.info
    }

    /// Channel metadata, mutably.
    pub fn info_mut(&mut self) -> &mut ChannelInfoModel {
        &mut self.info
    }

    /// The follower outlet; packs fed into this stream are forwarded
    /// through it unmodified.
    pub fn followers_mut(&mut self) -> &mut Outlet {
        &mut self.followers
    }

    /// Registers a listener for [`StreamEvent`]s. Listeners run
    /// synchronously inside the mutating call and must not call back
    /// into the stream.
    pub fn on_event(&mut self, listener: impl FnMut(&StreamEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// While paused, fed data is dropped before buffering; there is no
    /// queueing for replay.
    pub fn pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Whether data feed is currently ignored.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Changes the sample window size. Same-size calls are ignored.
    pub fn set_num_samples(&mut self, n: usize) {
        assert!(n > 0, "Stream requires a non-empty window");
        if n == self.num_samples {
            return;
        }
        self.num_samples = n;
        for buf in &mut self.channels {
            buf.resize(n);
        }
        match &mut self.x {
            XData::Index(b) => b.resize(n),
            XData::Linear(b) => b.resize(n),
            XData::Ring(b) => b.resize(n),
        }
        self.emit(&StreamEvent::NumSamplesChanged(n));
    }

    /// Configures the synthesized X axis: sample index, or a linear
    /// sweep from `min` to `max`.
    ///
    /// Ignored when X is provided by the source (`has_x`).
    pub fn set_x_axis(&mut self, as_index: bool, min: f64, max: f64) {
        if self.has_x {
            warn!("ignoring X axis style while the source supplies X data");
            return;
        }
        self.x_as_index = as_index;
        self.x_range = Range { start: min, end: max };
        self.x = self.make_x_buffer();
    }

    /// Fills every buffer with zeros.
    pub fn clear(&mut self) {
        for buf in &mut self.channels {
            buf.clear();
        }
        if let XData::Ring(b) = &mut self.x {
            b.clear();
        }
    }

    fn make_x_buffer(&self) -> XData {
        if self.has_x {
            XData::Ring(RingBuffer::new(self.num_samples))
        } else if self.x_as_index {
            XData::Index(IndexBuffer::new(self.num_samples))
        } else {
            XData::Linear(LinIndexBuffer::new(
                self.num_samples,
                self.x_range.start,
                self.x_range.end,
            ))
        }
    }

    /// Builds a fresh pack with per-channel gain and offset applied.
    /// The input pack is never mutated; followers still receive the
    /// original.
    fn apply_gain_offset(&self, pack: &SamplePack) -> SamplePack {
        let mut out = pack.clone();
        for ci in 0..pack.num_channels() {
            let info = self.info.info(ci);
            if !info.gain_en && !info.offset_en {
                continue;
            }
            for v in out.channel_mut(ci) {
                if info.gain_en {
                    *v *= info.gain;
                }
                if info.offset_en {
                    *v += info.offset;
                }
            }
        }
        out
    }

    fn emit(&mut self, event: &StreamEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

impl Sink for Stream {
    fn set_num_channels(&mut self, nc: usize, has_x: bool) {
        if nc == self.channels.len() && has_x == self.has_x {
            return;
        }
        if nc == 0 {
            warn!("ignoring request for zero channels");
            return;
        }

        self.channels.truncate(nc);
        while self.channels.len() < nc {
            self.channels.push(RingBuffer::new(self.num_samples));
        }
        if has_x != self.has_x {
            self.has_x = has_x;
            self.x = self.make_x_buffer();
        }
        // arena only grows; shrunk channels keep their metadata
        self.info.set_num_channels(nc);

        self.followers.set_num_channels(nc, has_x);
        self.emit(&StreamEvent::NumChannelsChanged(nc));
    }

    fn feed_in(&mut self, pack: &SamplePack) {
        if self.paused {
            return;
        }
        if pack.num_channels() != self.channels.len() {
            warn!(
                pack_channels = pack.num_channels(),
                stream_channels = self.channels.len(),
                "dropping pack with mismatched channel count"
            );
            return;
        }

        if pack.num_samples() > 0 {
            let adjusted;
            let data: &SamplePack = if self.info.gain_or_offset_en() {
                adjusted = self.apply_gain_offset(pack);
                &adjusted
            } else {
                pack
            };

            for (ci, buf) in self.channels.iter_mut().enumerate() {
                buf.add_samples(data.channel(ci));
            }
            if let XData::Ring(b) = &mut self.x {
                if pack.has_x() {
                    b.add_samples(pack.x());
                } else {
                    warn!("source promised X data but the pack has none");
                }
            }
            self.emit(&StreamEvent::DataAdded);
        }

        self.followers.feed_out(pack);
    }

    fn connected_source(&self) -> Option<SourceId> {
        self.upstream
    }

    fn set_connected_source(&mut self, source: Option<SourceId>) {
        self.upstream = source;
    }
}
