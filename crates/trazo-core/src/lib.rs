//! Trazo Core - sample storage and data-flow primitives
//!
//! This crate provides the storage and plumbing that the protocol decoders
//! feed into: the transient sample batch, the per-channel buffer family,
//! the push-based Source/Sink layer, and the [`Stream`] store that backs
//! live visualization.
//!
//! # Core Abstractions
//!
//! ## Sample Batches
//!
//! - [`SamplePack`] - fixed-shape batch of decoded samples for one
//!   delivery event, with optional X values
//!
//! ## Buffer Family
//!
//! All buffers share the [`FrameBuffer`] read contract (`size`, `sample`,
//! `limits`); X-axis buffers add [`XFrameBuffer::find_index`].
//!
//! - [`RingBuffer`] - real circular storage, oldest values overwritten
//! - [`IndexBuffer`] - virtual X axis equal to the sample index
//! - [`LinIndexBuffer`] - virtual X axis interpolated over a range
//! - [`ReadOnlyBuffer`] - owned snapshot of any buffer, for export
//!
//! ## Data Flow
//!
//! - [`Sink`] - receiving end: structure changes plus data delivery
//! - [`Outlet`] - embeddable source half with fan-out to many sinks
//! - [`Source`] - trait for producers built around an [`Outlet`]
//!
//! Delivery is synchronous, order-preserving and single-threaded; see the
//! [`flow`] module docs.
//!
//! ## Storage
//!
//! - [`Stream`] - one ring buffer per channel plus an X axis, gain/offset
//!   application, pause, and change notifications ([`StreamEvent`])
//! - [`ChannelInfoModel`] - append-only channel metadata arena
//!
//! # Example
//!
//! ```rust
//! use trazo_core::{FrameBuffer, SamplePack, Sink, Stream};
//!
//! let mut stream = Stream::new(2, false, 100);
//!
//! let mut pack = SamplePack::new(1, 2, false);
//! pack.channel_mut(0)[0] = 1.5;
//! pack.channel_mut(1)[0] = -0.5;
//! stream.feed_in(&pack);
//!
//! assert_eq!(stream.channel_buffer(0).sample(99), 1.5);
//! ```

pub mod channel_info;
pub mod flow;
pub mod frame_buffer;
pub mod index_buffer;
pub mod ring_buffer;
pub mod sample_pack;
pub mod stream;

pub use channel_info::{ChannelInfo, ChannelInfoModel, Color, PALETTE};
pub use flow::{FlowError, Outlet, Sink, SinkHandle, Source, SourceId};
pub use frame_buffer::{FrameBuffer, Range, ReadOnlyBuffer, XFrameBuffer};
pub use index_buffer::{IndexBuffer, LinIndexBuffer};
pub use ring_buffer::RingBuffer;
pub use sample_pack::SamplePack;
pub use stream::{Stream, StreamEvent};
