//! Framed binary protocol: sync word, optional size field, payload,
//! optional checksum.
//!
//! Wire layout per frame:
//!
//! ```text
//! [sync word][size field: 0, 1 or 2 bytes][payload][checksum: 0 or 1 byte]
//! ```
//!
//! The reader is a state machine over a raw, arbitrarily-fragmented byte
//! stream. It retains its parse phase, matched sync prefix and
//! accumulated payload across feed events and only advances when enough
//! bytes are present — it never blocks waiting for more data. Stream
//! corruption is recovered locally: a bad checksum or an implausible
//! size field drops the frame and resumes hunting for the next sync
//! word.

use tracing::{trace, warn};

use trazo_core::{Outlet, SamplePack, Source};

use crate::checksum::checksum_of;
use crate::error::ProtoError;
use crate::format::{Endianness, NumberFormat};
use crate::reader::{Reader, decode_row};

/// How the payload length of a frame is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeField {
    /// Every frame carries this many payload bytes.
    Fixed(usize),
    /// A 1-byte length field follows the sync word.
    OneByte,
    /// A 2-byte length field follows the sync word, in the configured
    /// byte order.
    TwoBytes,
}

/// Parses a sync word from hex text, e.g. `"AA BB"` or `"aabb"`.
///
/// Whitespace between digit pairs is ignored. Fails on empty input, a
/// non-hex character, or a trailing unpaired nibble.
pub fn parse_sync_word(text: &str) -> Result<Vec<u8>, ProtoError> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() {
        return Err(ProtoError::EmptySyncWord);
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ProtoError::InvalidSyncDigit(text.to_string()));
    }
    if digits.len() % 2 != 0 {
        return Err(ProtoError::UnpairedSyncNibble(text.to_string()));
    }
    Ok(digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16).unwrap_or(0) as u8;
            let lo = (pair[1] as char).to_digit(16).unwrap_or(0) as u8;
            (hi << 4) | lo
        })
        .collect())
}

/// Settings of the framed protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedReaderConfig {
    /// Frame marker; must be non-empty.
    pub sync_word: Vec<u8>,
    /// Payload sizing mode.
    pub size_field: SizeField,
    /// Samples per row.
    pub num_channels: usize,
    /// Wire format of each sample.
    pub format: NumberFormat,
    /// Byte order of multi-byte samples (and of a 2-byte size field).
    pub endianness: Endianness,
    /// Whether a checksum byte trails the payload.
    pub checksum: bool,
    /// Trace every frame boundary, for bring-up debugging.
    pub debug: bool,
}

impl Default for FramedReaderConfig {
    fn default() -> Self {
        Self {
            sync_word: vec![0xaa, 0xbb],
            size_field: SizeField::Fixed(1),
            num_channels: 1,
            format: NumberFormat::default(),
            endianness: Endianness::default(),
            checksum: false,
            debug: false,
        }
    }
}

impl FramedReaderConfig {
    /// Bytes needed for one row of samples.
    pub fn row_size(&self) -> usize {
        self.num_channels * self.format.byte_size()
    }

    fn validate(&self) -> Result<(), ProtoError> {
        if self.sync_word.is_empty() {
            return Err(ProtoError::EmptySyncWord);
        }
        if self.num_channels == 0 {
            return Err(ProtoError::NoChannels);
        }
        if let SizeField::Fixed(size) = self.size_field {
            if size < self.row_size() {
                return Err(ProtoError::FrameTooSmall {
                    size,
                    row: self.row_size(),
                });
            }
        }
        Ok(())
    }
}

/// Decode statistics, reset together with the parse state only on
/// reconfiguration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramedStats {
    /// Frames decoded and emitted.
    pub frames_decoded: u64,
    /// Frames dropped on checksum mismatch.
    pub checksum_errors: u64,
    /// Frames dropped for an implausible size field.
    pub size_errors: u64,
    /// Bytes consumed while hunting for a sync word.
    pub bytes_skipped: u64,
}

/// Parse phase of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Scanning for the sync word; everything before a match is
    /// discarded.
    SearchingSync,
    /// Collecting the 1- or 2-byte length field.
    AwaitingSize,
    /// Collecting payload bytes.
    AwaitingPayload,
    /// Collecting the trailing checksum byte.
    VerifyingChecksum,
}

/// Reader for the configurable framed binary protocol.
///
/// With an invalid configuration the reader refuses to consume: `feed`
/// discards nothing and emits nothing until the configuration is
/// corrected via [`set_config`](Self::set_config).
pub struct FramedReader {
    config: FramedReaderConfig,
    config_valid: bool,
    phase: Phase,
    /// Sync word bytes matched so far.
    sync_matched: usize,
    size_bytes: [u8; 2],
    size_got: usize,
    /// Payload length of the frame being collected.
    payload_len: usize,
    payload: Vec<u8>,
    stats: FramedStats,
    outlet: Outlet,
}

impl FramedReader {
    /// Creates a reader with the given settings.
    pub fn new(config: FramedReaderConfig) -> Result<Self, ProtoError> {
        config.validate()?;
        let outlet = Outlet::new(config.num_channels, false);
        Ok(Self {
            config,
            config_valid: true,
            phase: Phase::SearchingSync,
            sync_matched: 0,
            size_bytes: [0; 2],
            size_got: 0,
            payload_len: 0,
            payload: Vec::new(),
            stats: FramedStats::default(),
            outlet,
        })
    }

    /// Current settings.
    pub fn config(&self) -> &FramedReaderConfig {
        &self.config
    }

    /// Whether the current settings allow decoding.
    pub fn is_config_valid(&self) -> bool {
        self.config_valid
    }

    /// Decode statistics since the last reconfiguration.
    pub fn stats(&self) -> FramedStats {
        self.stats
    }

    /// Replaces the settings and resets all parse state.
    ///
    /// On error the reader keeps the new settings but marks them invalid
    /// and refuses to consume until a correct configuration arrives.
    pub fn set_config(&mut self, config: FramedReaderConfig) -> Result<(), ProtoError> {
        let check = config.validate();
        if config.num_channels != self.config.num_channels && check.is_ok() {
            self.outlet.set_num_channels(config.num_channels, false);
        }
        self.config = config;
        self.config_valid = check.is_ok();
        self.reset();
        self.stats = FramedStats::default();
        check
    }

    /// Leaves the current frame behind and resumes hunting for sync.
    fn restart_frame(&mut self) {
        self.phase = Phase::SearchingSync;
        self.sync_matched = 0;
        self.size_got = 0;
        self.payload.clear();
    }

    /// The phase that follows a completed sync word.
    fn after_sync(&mut self) {
        match self.config.size_field {
            SizeField::Fixed(size) => {
                self.payload_len = size;
                self.phase = Phase::AwaitingPayload;
            }
            SizeField::OneByte | SizeField::TwoBytes => {
                self.size_got = 0;
                self.phase = Phase::AwaitingSize;
            }
        }
    }

    fn size_field_width(&self) -> usize {
        match self.config.size_field {
            SizeField::OneByte => 1,
            SizeField::TwoBytes => 2,
            SizeField::Fixed(_) => 0,
        }
    }

    /// Interprets the collected length field.
    fn take_size(&mut self) {
        let len = match self.config.size_field {
            SizeField::OneByte => usize::from(self.size_bytes[0]),
            SizeField::TwoBytes => {
                let raw = [self.size_bytes[0], self.size_bytes[1]];
                usize::from(match self.config.endianness {
                    Endianness::Little => u16::from_le_bytes(raw),
                    Endianness::Big => u16::from_be_bytes(raw),
                })
            }
            SizeField::Fixed(_) => unreachable!("fixed size has no field"),
        };

        if len < self.config.row_size() {
            warn!(
                len,
                row = self.config.row_size(),
                "size field too small for one row, dropping frame"
            );
            self.stats.size_errors += 1;
            self.restart_frame();
        } else {
            self.payload_len = len;
            self.phase = Phase::AwaitingPayload;
        }
    }

    /// Verifies and decodes the completed frame, emitting one row.
    fn commit_frame(&mut self) {
        if self.config.debug {
            trace!(payload = ?self.payload, "frame complete");
        }

        let mut pack = SamplePack::new(1, self.config.num_channels, false);
        decode_row(
            &mut pack,
            0,
            &self.payload,
            self.config.format,
            self.config.endianness,
        );
        self.stats.frames_decoded += 1;
        self.restart_frame();
        self.outlet.feed_out(&pack);
    }
}

impl Source for FramedReader {
    fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    fn outlet_mut(&mut self) -> &mut Outlet {
        &mut self.outlet
    }
}

impl Reader for FramedReader {
    fn feed(&mut self, bytes: &[u8]) {
        if !self.config_valid {
            return;
        }

        let mut i = 0;
        while i < bytes.len() {
            match self.phase {
                Phase::SearchingSync => {
                    let b = bytes[i];
                    i += 1;
                    if b == self.config.sync_word[self.sync_matched] {
                        self.sync_matched += 1;
                        if self.sync_matched == self.config.sync_word.len() {
                            self.after_sync();
                        }
                    } else {
                        // matching resumes from scratch; the mismatch byte
                        // and any partial match are lost to the hunt
                        self.stats.bytes_skipped += self.sync_matched as u64 + 1;
                        self.sync_matched = 0;
                    }
                }

                Phase::AwaitingSize => {
                    self.size_bytes[self.size_got] = bytes[i];
                    self.size_got += 1;
                    i += 1;
                    if self.size_got == self.size_field_width() {
                        self.take_size();
                    }
                }

                Phase::AwaitingPayload => {
                    let want = self.payload_len - self.payload.len();
                    let take = want.min(bytes.len() - i);
                    self.payload.extend_from_slice(&bytes[i..i + take]);
                    i += take;
                    if self.payload.len() == self.payload_len {
                        if self.config.checksum {
                            self.phase = Phase::VerifyingChecksum;
                        } else {
                            self.commit_frame();
                        }
                    }
                }

                Phase::VerifyingChecksum => {
                    let received = bytes[i];
                    i += 1;
                    let computed = checksum_of(&self.payload);
                    if received == computed {
                        self.commit_frame();
                    } else {
                        warn!(received, computed, "checksum mismatch, dropping frame");
                        self.stats.checksum_errors += 1;
                        self.restart_frame();
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.restart_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use trazo_core::SinkHandle;

    use crate::test_util::Collector;

    fn config() -> FramedReaderConfig {
        FramedReaderConfig {
            sync_word: vec![0xaa, 0xbb],
            size_field: SizeField::Fixed(4),
            num_channels: 2,
            format: NumberFormat::U16,
            endianness: Endianness::Little,
            checksum: false,
            debug: false,
        }
    }

    fn reader(config: FramedReaderConfig) -> (FramedReader, Rc<RefCell<Collector>>) {
        let mut reader = FramedReader::new(config).unwrap();
        let collector = Collector::new();
        let handle: SinkHandle = collector.clone();
        reader.connect_sink(&handle).unwrap();
        (reader, collector)
    }

    #[test]
    fn whole_frame_in_one_event() {
        let (mut reader, out) = reader(config());

        reader.feed(&[0xaa, 0xbb, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(out.borrow().rows, vec![vec![513.0, 1027.0]]);
        assert_eq!(reader.stats().frames_decoded, 1);
    }

    #[test]
    fn split_frame_decodes_identically() {
        let (mut reader, out) = reader(config());

        reader.feed(&[0xaa, 0xbb, 0x01]);
        assert_eq!(out.borrow().packs, 0);
        reader.feed(&[0x02, 0x03, 0x04]);
        assert_eq!(out.borrow().rows, vec![vec![513.0, 1027.0]]);
    }

    #[test]
    fn garbage_before_sync_is_skipped() {
        let (mut reader, out) = reader(config());

        reader.feed(&[0x00, 0xaa, 0x13, 0xaa, 0xbb, 1, 0, 2, 0]);
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0]]);
        assert_eq!(reader.stats().bytes_skipped, 3);
    }

    #[test]
    fn mismatch_restarts_matching_from_scratch() {
        let mut cfg = config();
        cfg.sync_word = vec![0xaa, 0xab];
        cfg.size_field = SizeField::Fixed(2);
        cfg.num_channels = 1;
        let (mut reader, out) = reader(cfg);

        // the second 0xaa breaks the match and is itself consumed, so the
        // immediately following 0xab does not complete a sync word
        reader.feed(&[0xaa, 0xaa, 0xab, 1, 0]);
        assert_eq!(out.borrow().packs, 0);

        reader.feed(&[0xaa, 0xab, 7, 0]);
        assert_eq!(out.borrow().rows, vec![vec![7.0]]);
    }

    #[test]
    fn back_to_back_frames() {
        let (mut reader, out) = reader(config());

        reader.feed(&[
            0xaa, 0xbb, 1, 0, 2, 0, // frame 1
            0xaa, 0xbb, 3, 0, 4, 0, // frame 2
        ]);
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(out.borrow().packs, 2);
    }

    #[test]
    fn checksum_accepts_valid_frame() {
        let mut cfg = config();
        cfg.checksum = true;
        let (mut reader, out) = reader(cfg);

        let payload = [1u8, 0, 2, 0];
        let mut frame = vec![0xaa, 0xbb];
        frame.extend_from_slice(&payload);
        frame.push(checksum_of(&payload));

        reader.feed(&frame);
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0]]);
        assert_eq!(reader.stats().checksum_errors, 0);
    }

    #[test]
    fn checksum_mismatch_drops_frame_and_resyncs() {
        let mut cfg = config();
        cfg.checksum = true;
        let (mut reader, out) = reader(cfg);

        let good = [1u8, 0, 2, 0];
        let checksum = checksum_of(&good);
        // corrupt one payload byte, keep the checksum of the clean payload
        let mut stream = vec![0xaa, 0xbb, 1, 0, 2, 1];
        stream.push(checksum);
        // then a valid frame later in the same buffer
        stream.extend_from_slice(&[0xaa, 0xbb]);
        stream.extend_from_slice(&good);
        stream.push(checksum);

        reader.feed(&stream);
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0]]);
        assert_eq!(reader.stats().checksum_errors, 1);
        assert_eq!(reader.stats().frames_decoded, 1);
    }

    #[test]
    fn one_byte_size_field() {
        let mut cfg = config();
        cfg.size_field = SizeField::OneByte;
        let (mut reader, out) = reader(cfg);

        reader.feed(&[0xaa, 0xbb, 4, 1, 0, 2, 0]);
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn two_byte_size_field_uses_configured_endianness() {
        let mut cfg = config();
        cfg.size_field = SizeField::TwoBytes;
        cfg.endianness = Endianness::Big;
        let (mut reader, out) = reader(cfg);

        // size 0x0006 big-endian: 4-byte row plus 2 bytes of padding
        reader.feed(&[0xaa, 0xbb, 0x00, 0x06, 0x00, 0x01, 0x00, 0x02, 0xff, 0xff]);
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn undersized_size_field_is_transient() {
        let mut cfg = config();
        cfg.size_field = SizeField::OneByte;
        let (mut reader, out) = reader(cfg);

        // size 2 cannot hold a 4-byte row; the frame is dropped and the
        // next sync word is found mid-buffer
        reader.feed(&[0xaa, 0xbb, 2, 0xaa, 0xbb, 4, 1, 0, 2, 0]);
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0]]);
        assert_eq!(reader.stats().size_errors, 1);
    }

    #[test]
    fn oversized_fixed_payload_is_consumed_whole() {
        let mut cfg = config();
        cfg.size_field = SizeField::Fixed(6);
        cfg.checksum = true;
        let (mut reader, out) = reader(cfg);

        let payload = [1u8, 0, 2, 0, 0xde, 0xad];
        let mut frame = vec![0xaa, 0xbb];
        frame.extend_from_slice(&payload);
        // checksum covers the padding too
        frame.push(checksum_of(&payload));

        reader.feed(&frame);
        assert_eq!(out.borrow().rows, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn invalid_config_suspends_decoding() {
        let mut cfg = config();
        cfg.size_field = SizeField::Fixed(2); // smaller than the 4-byte row
        assert!(matches!(
            FramedReader::new(cfg),
            Err(ProtoError::FrameTooSmall { size: 2, row: 4 })
        ));

        let (mut reader, out) = reader(config());
        let bad = FramedReaderConfig {
            sync_word: Vec::new(),
            ..config()
        };
        assert_eq!(reader.set_config(bad), Err(ProtoError::EmptySyncWord));
        assert!(!reader.is_config_valid());

        reader.feed(&[0xaa, 0xbb, 1, 0, 2, 0]);
        assert_eq!(out.borrow().packs, 0);

        // correcting the settings resumes decoding
        reader.set_config(config()).unwrap();
        reader.feed(&[0xaa, 0xbb, 1, 0, 2, 0]);
        assert_eq!(out.borrow().packs, 1);
    }

    #[test]
    fn reconfigure_resets_parse_state() {
        let (mut reader, out) = reader(config());

        // leave the reader mid-payload
        reader.feed(&[0xaa, 0xbb, 1, 0]);
        reader.set_config(config()).unwrap();

        // the stale half-frame must not combine with fresh bytes
        reader.feed(&[2, 0, 0xaa, 0xbb, 5, 0, 6, 0]);
        assert_eq!(out.borrow().rows, vec![vec![5.0, 6.0]]);
    }

    #[test]
    fn parse_sync_word_accepts_spaced_hex() {
        assert_eq!(parse_sync_word("AA BB"), Ok(vec![0xaa, 0xbb]));
        assert_eq!(parse_sync_word("aabb"), Ok(vec![0xaa, 0xbb]));
        assert_eq!(parse_sync_word("0a 1B 2c"), Ok(vec![0x0a, 0x1b, 0x2c]));
    }

    #[test]
    fn parse_sync_word_rejects_bad_input() {
        assert_eq!(parse_sync_word(""), Err(ProtoError::EmptySyncWord));
        assert_eq!(parse_sync_word("   "), Err(ProtoError::EmptySyncWord));
        assert_eq!(
            parse_sync_word("aab"),
            Err(ProtoError::UnpairedSyncNibble("aab".into()))
        );
        assert_eq!(
            parse_sync_word("zz"),
            Err(ProtoError::InvalidSyncDigit("zz".into()))
        );
    }
}
