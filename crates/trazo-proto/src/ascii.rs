//! Line-based textual protocol.
//!
//! One line per sample row, channel values separated by a configurable
//! delimiter. Lines may arrive fragmented arbitrarily; only complete
//! lines are decoded. The channel count follows the stream: a line with
//! a different number of fields changes the announced channel count
//! before its pack is emitted.

use tracing::warn;

use trazo_core::{Outlet, SamplePack, Source};

use crate::reader::Reader;

/// Settings of the ASCII protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiReaderConfig {
    /// Field separator within a line.
    pub delimiter: char,
    /// Drop the first line seen after a reset. The transport may start
    /// delivering mid-line, so the first line is usually truncated.
    pub discard_first_line: bool,
}

impl Default for AsciiReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            discard_first_line: true,
        }
    }
}

/// Reader for delimiter-separated decimal text, one row per line.
pub struct AsciiReader {
    config: AsciiReaderConfig,
    line_buf: Vec<u8>,
    first_line_pending: bool,
    outlet: Outlet,
}

impl AsciiReader {
    /// Creates a reader with the given settings.
    pub fn new(config: AsciiReaderConfig) -> Self {
        let first_line_pending = config.discard_first_line;
        Self {
            config,
            line_buf: Vec::new(),
            first_line_pending,
            outlet: Outlet::new(1, false),
        }
    }

    /// Current settings.
    pub fn config(&self) -> &AsciiReaderConfig {
        &self.config
    }

    /// Replaces the settings and resets parse state.
    pub fn set_config(&mut self, config: AsciiReaderConfig) {
        self.config = config;
        self.reset();
    }

    fn decode_line(&mut self, line: &[u8]) {
        let Ok(text) = std::str::from_utf8(line) else {
            warn!("dropping line with invalid UTF-8");
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let mut values = Vec::new();
        for field in text.split(self.config.delimiter) {
            match field.trim().parse::<f64>() {
                Ok(v) => values.push(v),
                Err(_) => {
                    warn!(line = text, field, "dropping unparsable line");
                    return;
                }
            }
        }

        // channel count follows the stream
        if values.len() != self.outlet.num_channels() {
            self.outlet.set_num_channels(values.len(), false);
        }

        let mut pack = SamplePack::new(1, values.len(), false);
        for (ci, &v) in values.iter().enumerate() {
            pack.channel_mut(ci)[0] = v;
        }
        self.outlet.feed_out(&pack);
    }
}

impl Source for AsciiReader {
    fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    fn outlet_mut(&mut self) -> &mut Outlet {
        &mut self.outlet
    }
}

impl Reader for AsciiReader {
    fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b != b'\n' {
                self.line_buf.push(b);
                continue;
            }
            let line = std::mem::take(&mut self.line_buf);
            if self.first_line_pending {
                self.first_line_pending = false;
                continue;
            }
            self.decode_line(&line);
        }
    }

    fn reset(&mut self) {
        self.line_buf.clear();
        self.first_line_pending = self.config.discard_first_line;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use trazo_core::SinkHandle;

    use crate::test_util::Collector;

    fn reader(config: AsciiReaderConfig) -> (AsciiReader, Rc<RefCell<Collector>>) {
        let mut reader = AsciiReader::new(config);
        let collector = Collector::new();
        let handle: SinkHandle = collector.clone();
        reader.connect_sink(&handle).unwrap();
        (reader, collector)
    }

    fn no_discard() -> AsciiReaderConfig {
        AsciiReaderConfig {
            discard_first_line: false,
            ..AsciiReaderConfig::default()
        }
    }

    #[test]
    fn one_pack_per_line() {
        let (mut reader, out) = reader(no_discard());
        reader.feed(b"1.5,2.5\n-3,4\n");
        assert_eq!(out.borrow().rows, vec![vec![1.5, 2.5], vec![-3.0, 4.0]]);
        assert_eq!(out.borrow().packs, 2);
    }

    #[test]
    fn lines_survive_fragmentation() {
        let (mut reader, out) = reader(no_discard());
        reader.feed(b"1.5,");
        assert_eq!(out.borrow().packs, 0);
        reader.feed(b"2.5");
        reader.feed(b"\n");
        assert_eq!(out.borrow().rows, vec![vec![1.5, 2.5]]);
    }

    #[test]
    fn first_line_is_discarded_by_default() {
        let (mut reader, out) = reader(AsciiReaderConfig::default());
        reader.feed(b"5,2.5\n1,2\n");
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn field_count_change_propagates() {
        let (mut reader, out) = reader(no_discard());
        reader.feed(b"1,2\n");
        assert_eq!(out.borrow().nc, 2);
        reader.feed(b"1,2,3\n");
        assert_eq!(out.borrow().nc, 3);
        assert_eq!(out.borrow().rows[1], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn malformed_line_is_dropped() {
        let (mut reader, out) = reader(no_discard());
        reader.feed(b"1,zap\n3,4\n");
        assert_eq!(out.borrow().rows, vec![vec![3.0, 4.0]]);
    }

    #[test]
    fn crlf_and_blank_lines_tolerated() {
        let (mut reader, out) = reader(no_discard());
        reader.feed(b"1,2\r\n\r\n3,4\r\n");
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn alternative_delimiter() {
        let (mut reader, out) = reader(AsciiReaderConfig {
            delimiter: '\t',
            discard_first_line: false,
        });
        reader.feed(b"7\t8\n");
        assert_eq!(out.borrow().rows, vec![vec![7.0, 8.0]]);
    }
}
