//! Fixed-capacity circular sample storage.

use std::cell::Cell;

use crate::frame_buffer::{FrameBuffer, Range, scan_limits};

/// Circular buffer of capacity N; new samples overwrite the oldest.
///
/// Samples are addressed oldest-first: `sample(0)` is the oldest held
/// value, `sample(size() - 1)` the most recent. A fresh buffer holds all
/// zeros.
///
/// `limits()` always reflects exactly the currently-held values. The
/// min/max is cached and invalidated by every mutation, so reads between
/// mutations are O(1) while the observed result matches a full scan.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f64>,
    /// Index of the oldest sample.
    head: usize,
    limits: Cell<Option<Range>>,
}

impl RingBuffer {
    /// Creates a zero-filled buffer of the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            data: vec![0.0; capacity],
            head: 0,
            limits: Cell::new(Some(Range { start: 0.0, end: 0.0 })),
        }
    }

    /// Appends samples, overwriting the oldest values on wrap.
    ///
    /// When `samples` is longer than the capacity only its tail survives,
    /// exactly as if the values had been appended one by one.
    pub fn add_samples(&mut self, samples: &[f64]) {
        let cap = self.data.len();
        if samples.is_empty() {
            return;
        }

        if samples.len() >= cap {
            self.data.copy_from_slice(&samples[samples.len() - cap..]);
            self.head = 0;
        } else {
            for (k, &v) in samples.iter().enumerate() {
                let i = (self.head + k) % cap;
                self.data[i] = v;
            }
            self.head = (self.head + samples.len()) % cap;
        }
        self.limits.set(None);
    }

    /// Resizes the buffer to capacity `n`.
    ///
    /// Growing keeps the current values aligned to the end and zero-fills
    /// the newly introduced older slots; shrinking keeps only the most
    /// recent `n` values.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0 or equals the current capacity; the caller must
    /// skip same-size resizes.
    pub fn resize(&mut self, n: usize) {
        let old = self.data.len();
        assert!(n > 0, "RingBuffer capacity must be > 0");
        assert_ne!(n, old, "resizing to the same size");

        let keep = old.min(n);
        let mut data = vec![0.0; n];
        for k in 0..keep {
            // most recent `keep` values, oldest of them first
            data[n - keep + k] = self.sample(old - keep + k);
        }
        self.data = data;
        self.head = 0;
        self.limits.set(None);
    }

    /// Resets all samples to zero.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.head = 0;
        self.limits.set(Some(Range { start: 0.0, end: 0.0 }));
    }
}

impl FrameBuffer for RingBuffer {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn sample(&self, i: usize) -> f64 {
        debug_assert!(i < self.data.len());
        self.data[(self.head + i) % self.data.len()]
    }

    fn limits(&self) -> Range {
        if let Some(lim) = self.limits.get() {
            return lim;
        }
        let lim = scan_limits(&self.data);
        self.limits.set(Some(lim));
        lim
    }
}
