//! End-to-end integration: byte stream → reader → stream storage.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;

use trazo_core::{FrameBuffer, SamplePack, Sink, SinkHandle, Source, SourceId, Stream};
use trazo_proto::{
    AsciiReader, AsciiReaderConfig, Endianness, FramedReader, FramedReaderConfig, NumberFormat,
    Reader, SizeField, checksum_of,
};

/// Test sink recording decoded rows.
struct RowSink {
    rows: Vec<Vec<f64>>,
    upstream: Option<SourceId>,
}

impl RowSink {
    fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            rows: Vec::new(),
            upstream: None,
        }))
    }
}

impl Sink for RowSink {
    fn set_num_channels(&mut self, _nc: usize, _has_x: bool) {}

    fn feed_in(&mut self, pack: &SamplePack) {
        for r in 0..pack.num_samples() {
            self.rows
                .push((0..pack.num_channels()).map(|ci| pack.channel(ci)[r]).collect());
        }
    }

    fn connected_source(&self) -> Option<SourceId> {
        self.upstream
    }

    fn set_connected_source(&mut self, s: Option<SourceId>) {
        self.upstream = s;
    }
}

fn framed_config(checksum: bool) -> FramedReaderConfig {
    FramedReaderConfig {
        sync_word: vec![0xaa, 0xbb],
        size_field: SizeField::Fixed(4),
        num_channels: 2,
        format: NumberFormat::U16,
        endianness: Endianness::Little,
        checksum,
        debug: false,
    }
}

/// Builds one frame for the config above.
fn frame(a: u16, b: u16, checksum: bool) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&a.to_le_bytes());
    payload.extend_from_slice(&b.to_le_bytes());

    let mut out = vec![0xaa, 0xbb];
    out.extend_from_slice(&payload);
    if checksum {
        out.push(checksum_of(&payload));
    }
    out
}

#[test]
fn framed_reader_fills_stream_window() {
    let mut reader = FramedReader::new(framed_config(false)).unwrap();
    let stream = Rc::new(RefCell::new(Stream::new(2, false, 8)));
    let handle: SinkHandle = stream.clone();
    reader.connect_sink(&handle).unwrap();

    reader.feed(&frame(1, 2, false));
    reader.feed(&frame(3, 4, false));

    let s = stream.borrow();
    assert_eq!(s.channel_buffer(0).sample(6), 1.0);
    assert_eq!(s.channel_buffer(0).sample(7), 3.0);
    assert_eq!(s.channel_buffer(1).sample(6), 2.0);
    assert_eq!(s.channel_buffer(1).sample(7), 4.0);
}

#[test]
fn chained_streams_forward_in_order() {
    let mut reader = FramedReader::new(framed_config(false)).unwrap();

    let first = Rc::new(RefCell::new(Stream::new(2, false, 8)));
    let first_handle: SinkHandle = first.clone();
    reader.connect_sink(&first_handle).unwrap();

    reader.feed(&frame(1, 2, false));

    // a follower attached later sees only later packs
    let second = Rc::new(RefCell::new(Stream::new(2, false, 8)));
    let second_handle: SinkHandle = second.clone();
    first.borrow_mut().followers_mut().connect(&second_handle).unwrap();

    reader.feed(&frame(3, 4, false));

    assert_eq!(first.borrow().channel_buffer(0).sample(6), 1.0);
    assert_eq!(first.borrow().channel_buffer(0).sample(7), 3.0);
    // the follower never saw the first frame
    assert_eq!(second.borrow().channel_buffer(0).sample(6), 0.0);
    assert_eq!(second.borrow().channel_buffer(0).sample(7), 3.0);
}

#[test]
fn ascii_channel_growth_reshapes_stream() {
    let mut reader = AsciiReader::new(AsciiReaderConfig {
        discard_first_line: false,
        ..AsciiReaderConfig::default()
    });
    let stream = Rc::new(RefCell::new(Stream::new(1, false, 4)));
    let handle: SinkHandle = stream.clone();
    reader.connect_sink(&handle).unwrap();

    reader.feed(b"1\n");
    assert_eq!(stream.borrow().num_channels(), 1);

    reader.feed(b"2,3\n");
    assert_eq!(stream.borrow().num_channels(), 2);
    assert_eq!(stream.borrow().channel_buffer(1).sample(3), 3.0);
}

#[test]
fn corrupted_frame_never_reaches_storage() {
    let mut reader = FramedReader::new(framed_config(true)).unwrap();
    let sink = RowSink::new();
    let handle: SinkHandle = sink.clone();
    reader.connect_sink(&handle).unwrap();

    let mut bytes = frame(1, 2, true);
    let last = bytes.len() - 2;
    bytes[last] ^= 0xff; // corrupt a payload byte, checksum now mismatches
    bytes.extend_from_slice(&frame(5, 6, true));

    reader.feed(&bytes);
    assert_eq!(sink.borrow().rows, vec![vec![5.0, 6.0]]);
    assert_eq!(reader.stats().checksum_errors, 1);
}

proptest! {
    /// Decoding a frame stream must be invariant under fragmentation:
    /// any partition of the bytes into feed events yields the same rows.
    #[test]
    fn fragmentation_is_invisible(
        frames in prop::collection::vec((any::<u16>(), any::<u16>()), 1..8),
        cut_seed in any::<u64>(),
    ) {
        let mut bytes = Vec::new();
        for &(a, b) in &frames {
            bytes.extend_from_slice(&frame(a, b, true));
        }

        // decode in one event
        let mut whole = FramedReader::new(framed_config(true)).unwrap();
        let whole_sink = RowSink::new();
        let handle: SinkHandle = whole_sink.clone();
        whole.connect_sink(&handle).unwrap();
        whole.feed(&bytes);

        // decode the same bytes cut into deterministic pseudo-random pieces
        let mut split = FramedReader::new(framed_config(true)).unwrap();
        let split_sink = RowSink::new();
        let handle: SinkHandle = split_sink.clone();
        split.connect_sink(&handle).unwrap();

        let mut rest = bytes.as_slice();
        let mut state = cut_seed | 1;
        while !rest.is_empty() {
            // xorshift step; chunk length 1..=7
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let n = (state as usize % 7 + 1).min(rest.len());
            split.feed(&rest[..n]);
            rest = &rest[n..];
        }

        let expected: Vec<Vec<f64>> = frames
            .iter()
            .map(|&(a, b)| vec![f64::from(a), f64::from(b)])
            .collect();
        prop_assert_eq!(&whole_sink.borrow().rows, &expected);
        prop_assert_eq!(&split_sink.borrow().rows, &expected);
    }

    /// Leading garbage must only delay synchronization, never corrupt the
    /// first decoded frame.
    #[test]
    fn leading_noise_is_skipped(
        noise in prop::collection::vec(0u8..0xaa, 0..32),
        a in any::<u16>(),
        b in any::<u16>(),
    ) {
        let mut bytes = noise.clone();
        bytes.extend_from_slice(&frame(a, b, true));

        let mut reader = FramedReader::new(framed_config(true)).unwrap();
        let sink = RowSink::new();
        let handle: SinkHandle = sink.clone();
        reader.connect_sink(&handle).unwrap();
        reader.feed(&bytes);

        prop_assert_eq!(&sink.borrow().rows, &vec![vec![f64::from(a), f64::from(b)]]);
    }
}
