//! Synthetic sample source for demos and tests.
//!
//! Generates phase-shifted sinusoids, one row per tick, without any
//! transport or decoding. Useful for exercising a sink chain when no
//! device is attached.

use std::f64::consts::TAU;

use trazo_core::{Outlet, SamplePack, Source};

/// Tick-driven generator: channel `c` produces
/// `sin(TAU · (t + c / channels))` where `t` advances by the configured
/// increment per tick.
pub struct DemoSource {
    num_channels: usize,
    increment: f64,
    phase: f64,
    outlet: Outlet,
}

impl DemoSource {
    /// Creates a generator with the given channel count and per-tick
    /// phase increment in turns (e.g. 0.01 for a full cycle every 100
    /// ticks).
    ///
    /// # Panics
    ///
    /// Panics if `num_channels` is 0.
    pub fn new(num_channels: usize, increment: f64) -> Self {
        assert!(num_channels > 0, "DemoSource requires at least one channel");
        Self {
            num_channels,
            increment,
            phase: 0.0,
            outlet: Outlet::new(num_channels, false),
        }
    }

    /// Emits one row of samples and advances the phase.
    pub fn tick(&mut self) {
        let mut pack = SamplePack::new(1, self.num_channels, false);
        for ci in 0..self.num_channels {
            let shift = ci as f64 / self.num_channels as f64;
            pack.channel_mut(ci)[0] = (TAU * (self.phase + shift)).sin();
        }
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.outlet.feed_out(&pack);
    }

    /// Emits `n` rows.
    pub fn run(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }
}

impl Source for DemoSource {
    fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    fn outlet_mut(&mut self) -> &mut Outlet {
        &mut self.outlet
    }
}
