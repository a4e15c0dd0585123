//! Push-based data flow between decoders and storage.
//!
//! A *source* produces [`SamplePack`]s and fans them out to any number of
//! connected sinks; a *sink* receives packs and may itself forward them to
//! followers of its own, forming a chain. All delivery is synchronous and
//! order-preserving: `feed_out` returns only after every sink (and its
//! followers, recursively) has seen the pack.
//!
//! The graph is single-threaded by design — handles are
//! `Rc<RefCell<dyn Sink>>` and no delivery ever blocks or suspends.
//!
//! # Types
//!
//! - [`Sink`] - receiving end: structure changes and data delivery
//! - [`Outlet`] - the embeddable source half: sink registry and fan-out
//! - [`Source`] - trait for types that expose an [`Outlet`]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::SamplePack;

/// Errors from flow-graph mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    /// The sink is already attached to a different source. Disconnect it
    /// from its current source first.
    #[error("sink is already attached to another source")]
    SinkAttached,
}

/// Identity of a source endpoint.
///
/// Ids are process-unique and never reused, so a sink can record which
/// source currently feeds it without holding a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Receiving end of the data flow.
///
/// Implementors store their upstream source id; a sink accepts at most one
/// upstream at a time, enforced by [`Outlet::connect`]. `feed_in` is
/// infallible — malformed upstream data must be handled (and at worst
/// dropped) by the producer, never surfaced across this boundary.
pub trait Sink {
    /// Applies a structural change: channel count and X presence.
    ///
    /// A sink that forwards to followers must propagate the change before
    /// returning.
    fn set_num_channels(&mut self, nc: usize, has_x: bool);

    /// Delivers one batch of samples.
    ///
    /// A sink that forwards to followers must pass the pack on before
    /// returning, preserving arrival order end to end.
    fn feed_in(&mut self, pack: &SamplePack);

    /// The source currently feeding this sink, if any.
    fn connected_source(&self) -> Option<SourceId>;

    /// Records the feeding source. Called by [`Outlet`] on connect and
    /// disconnect; not intended for direct use.
    fn set_connected_source(&mut self, source: Option<SourceId>);
}

/// Shared handle to a sink in the flow graph.
pub type SinkHandle = Rc<RefCell<dyn Sink>>;

/// The source half of the flow graph, designed for embedding.
///
/// An `Outlet` owns the ordered list of connected sinks plus the current
/// structure (channel count, X presence). Pure producers (protocol
/// readers) embed one directly; a sink that daisy-chains embeds one as its
/// follower list and forwards every call.
pub struct Outlet {
    id: SourceId,
    sinks: Vec<SinkHandle>,
    num_channels: usize,
    has_x: bool,
}

impl std::fmt::Debug for Outlet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outlet")
            .field("id", &self.id)
            .field("sinks", &self.sinks.len())
            .field("num_channels", &self.num_channels)
            .field("has_x", &self.has_x)
            .finish()
    }
}

impl Outlet {
    /// Creates an outlet with the given initial structure.
    pub fn new(num_channels: usize, has_x: bool) -> Self {
        Self {
            id: SourceId::next(),
            sinks: Vec::new(),
            num_channels,
            has_x,
        }
    }

    /// This outlet's identity.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Current channel count.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Whether downstream packs carry X data.
    pub fn has_x(&self) -> bool {
        self.has_x
    }

    /// Number of connected sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Connects a sink and synchronously pushes the current structure to
    /// it, so a newly attached consumer is immediately consistent.
    ///
    /// Connecting a sink that is already connected to this outlet is a
    /// no-op. Connecting a sink attached to a *different* source fails
    /// with [`FlowError::SinkAttached`]; disconnect it there first.
    pub fn connect(&mut self, sink: &SinkHandle) -> Result<(), FlowError> {
        {
            let mut s = sink.borrow_mut();
            match s.connected_source() {
                Some(id) if id == self.id => return Ok(()),
                Some(_) => return Err(FlowError::SinkAttached),
                None => {}
            }
            s.set_connected_source(Some(self.id));
            s.set_num_channels(self.num_channels, self.has_x);
        }
        self.sinks.push(Rc::clone(sink));
        Ok(())
    }

    /// Disconnects a sink, clearing its recorded upstream. Idempotent.
    pub fn disconnect(&mut self, sink: &SinkHandle) {
        if let Some(pos) = self.sinks.iter().position(|s| Rc::ptr_eq(s, sink)) {
            self.sinks.remove(pos);
            sink.borrow_mut().set_connected_source(None);
        }
    }

    /// Disconnects every sink at once.
    pub fn disconnect_all(&mut self) {
        for sink in self.sinks.drain(..) {
            sink.borrow_mut().set_connected_source(None);
        }
    }

    /// Updates the structure and propagates it to every connected sink.
    pub fn set_num_channels(&mut self, nc: usize, has_x: bool) {
        self.num_channels = nc;
        self.has_x = has_x;
        for sink in &self.sinks {
            sink.borrow_mut().set_num_channels(nc, has_x);
        }
    }

    /// Delivers a pack to every connected sink, in registration order.
    pub fn feed_out(&self, pack: &SamplePack) {
        for sink in &self.sinks {
            sink.borrow_mut().feed_in(pack);
        }
    }
}

/// Trait for producers built around an [`Outlet`].
pub trait Source {
    /// The embedded outlet.
    fn outlet(&self) -> &Outlet;

    /// The embedded outlet, mutably.
    fn outlet_mut(&mut self) -> &mut Outlet;

    /// Connects a sink to this source. See [`Outlet::connect`].
    fn connect_sink(&mut self, sink: &SinkHandle) -> Result<(), FlowError> {
        self.outlet_mut().connect(sink)
    }

    /// Disconnects a sink from this source. Idempotent.
    fn disconnect_sink(&mut self, sink: &SinkHandle) {
        self.outlet_mut().disconnect(sink);
    }

    /// Disconnects all sinks from this source.
    fn disconnect_all_sinks(&mut self) {
        self.outlet_mut().disconnect_all();
    }

    /// Current channel count.
    fn num_channels(&self) -> usize {
        self.outlet().num_channels()
    }

    /// Whether produced packs carry X data.
    fn has_x(&self) -> bool {
        self.outlet().has_x()
    }
}
