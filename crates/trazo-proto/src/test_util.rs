//! Shared helpers for reader unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use trazo_core::{SamplePack, Sink, SourceId};

/// Sink that records every delivered pack as rows of channel values,
/// along with structural changes.
pub(crate) struct Collector {
    /// Decoded rows in arrival order.
    pub rows: Vec<Vec<f64>>,
    /// X values in arrival order (packs without X contribute nothing).
    pub x: Vec<f64>,
    /// Number of packs delivered.
    pub packs: usize,
    /// Last announced channel count.
    pub nc: usize,
    /// Last announced X presence.
    pub has_x: bool,
    upstream: Option<SourceId>,
}

impl Collector {
    pub(crate) fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            rows: Vec::new(),
            x: Vec::new(),
            packs: 0,
            nc: 0,
            has_x: false,
            upstream: None,
        }))
    }
}

impl Sink for Collector {
    fn set_num_channels(&mut self, nc: usize, has_x: bool) {
        self.nc = nc;
        self.has_x = has_x;
    }

    fn feed_in(&mut self, pack: &SamplePack) {
        self.packs += 1;
        for r in 0..pack.num_samples() {
            let row = (0..pack.num_channels())
                .map(|ci| pack.channel(ci)[r])
                .collect();
            self.rows.push(row);
        }
        if pack.has_x() {
            self.x.extend_from_slice(pack.x());
        }
    }

    fn connected_source(&self) -> Option<SourceId> {
        self.upstream
    }

    fn set_connected_source(&mut self, s: Option<SourceId>) {
        self.upstream = s;
    }
}
