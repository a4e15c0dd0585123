//! Sinks used by the CLI commands.

use std::io::Write;

use trazo_core::{SamplePack, Sink, SourceId};

/// Sink that prints each decoded row as a CSV line and counts totals.
pub struct CsvSink<W: Write> {
    writer: W,
    rows: u64,
    num_channels: usize,
    upstream: Option<SourceId>,
}

impl<W: Write> CsvSink<W> {
    /// Creates a sink writing CSV lines to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            rows: 0,
            num_channels: 0,
            upstream: None,
        }
    }

    /// Rows printed so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl<W: Write> Sink for CsvSink<W> {
    fn set_num_channels(&mut self, nc: usize, _has_x: bool) {
        self.num_channels = nc;
    }

    fn feed_in(&mut self, pack: &SamplePack) {
        for r in 0..pack.num_samples() {
            let line = (0..pack.num_channels())
                .map(|ci| pack.channel(ci)[r].to_string())
                .collect::<Vec<_>>()
                .join(",");
            // stdout going away mid-pipe is not worth a panic
            let _ = writeln!(self.writer, "{line}");
            self.rows += 1;
        }
    }

    fn connected_source(&self) -> Option<SourceId> {
        self.upstream
    }

    fn set_connected_source(&mut self, s: Option<SourceId>) {
        self.upstream = s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_one_line_per_row() {
        let mut sink = CsvSink::new(Vec::new());
        let mut pack = SamplePack::new(2, 2, false);
        pack.channel_mut(0).copy_from_slice(&[1.0, 3.0]);
        pack.channel_mut(1).copy_from_slice(&[2.0, 4.0]);

        sink.feed_in(&pack);
        assert_eq!(sink.rows(), 2);
        assert_eq!(String::from_utf8(sink.writer).unwrap(), "1,2\n3,4\n");
    }
}
