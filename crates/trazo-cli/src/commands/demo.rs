//! Stream synthetic data through the full pipeline.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use clap::Args;

use trazo_core::{FrameBuffer, SinkHandle, Source, Stream};
use trazo_proto::DemoSource;

/// Arguments of the `demo` command.
#[derive(Args)]
pub struct DemoArgs {
    /// Number of generated channels
    #[arg(long, default_value = "3")]
    channels: usize,

    /// Rows to generate
    #[arg(long, default_value = "100")]
    ticks: usize,

    /// Phase increment per tick, in turns
    #[arg(long, default_value = "0.01")]
    rate: f64,

    /// Stream window size
    #[arg(long, default_value = "100")]
    window: usize,
}

/// Runs the `demo` command: generator → stream, then prints the stored
/// window per channel with its limits.
pub fn run(args: DemoArgs) -> anyhow::Result<()> {
    let mut source = DemoSource::new(args.channels.max(1), args.rate);
    let stream = Rc::new(RefCell::new(Stream::new(
        args.channels.max(1),
        false,
        args.window.max(1),
    )));
    let handle: SinkHandle = stream.clone();
    source.connect_sink(&handle).context("connecting stream")?;

    source.run(args.ticks);

    let stream = stream.borrow();
    for ci in 0..stream.num_channels() {
        let buf = stream.channel_buffer(ci);
        let lim = buf.limits();
        let name = stream.info().info(ci).name.clone();
        println!("# {name}: window {} samples, limits [{:.3}, {:.3}]", buf.size(), lim.start, lim.end);

        let values = (0..buf.size())
            .map(|i| format!("{:.4}", buf.sample(i)))
            .collect::<Vec<_>>()
            .join(",");
        println!("{values}");
    }

    Ok(())
}
