//! Decode a byte capture through a configured protocol reader.

use std::cell::RefCell;
use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Args;

use trazo_core::{SinkHandle, Source};
use trazo_config::{Profile, paths};
use trazo_proto::{AnyReader, Reader};

use crate::sinks::CsvSink;

/// Arguments of the `decode` command.
#[derive(Args)]
pub struct DecodeArgs {
    /// Capture file to decode; reads stdin when omitted
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Profile file (defaults to the user profile)
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Override the profile's protocol tag (binary, ascii, omit, framed)
    #[arg(long)]
    protocol: Option<String>,

    /// Feed the reader in chunks of this many bytes, mimicking transport
    /// fragmentation
    #[arg(long, default_value = "64")]
    chunk_size: usize,
}

/// Runs the `decode` command.
pub fn run(args: DecodeArgs) -> anyhow::Result<()> {
    let profile_path = args
        .profile
        .clone()
        .unwrap_or_else(paths::default_profile_path);
    let mut profile = Profile::load_or_default(&profile_path);
    if let Some(protocol) = args.protocol {
        profile.protocol = protocol;
    }

    let mut reader = profile
        .make_reader()
        .context("invalid reader configuration")?;

    let sink = Rc::new(RefCell::new(CsvSink::new(std::io::stdout().lock())));
    let handle: SinkHandle = sink.clone();
    reader
        .connect_sink(&handle)
        .context("connecting output sink")?;

    let bytes = read_input(args.input.as_deref())?;
    let chunk_size = args.chunk_size.max(1);
    for chunk in bytes.chunks(chunk_size) {
        reader.feed(chunk);
    }

    let rows = sink.borrow().rows();
    tracing::info!(bytes = bytes.len(), rows, "decode finished");
    if let AnyReader::Framed(framed) = &reader {
        let stats = framed.stats();
        tracing::info!(
            frames = stats.frames_decoded,
            checksum_errors = stats.checksum_errors,
            size_errors = stats.size_errors,
            bytes_skipped = stats.bytes_skipped,
            "framed decoder statistics"
        );
    }

    Ok(())
}

fn read_input(input: Option<&std::path::Path>) -> anyhow::Result<Vec<u8>> {
    match input {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading '{}'", path.display()))
        }
        None => {
            let mut bytes = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .context("reading stdin")?;
            Ok(bytes)
        }
    }
}
