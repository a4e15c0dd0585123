//! Show the effective configuration profile.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use trazo_config::{Profile, paths};

/// Arguments of the `info` command.
#[derive(Args)]
pub struct InfoArgs {
    /// Profile file (defaults to the user profile)
    #[arg(long)]
    profile: Option<PathBuf>,
}

/// Runs the `info` command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let path = args.profile.unwrap_or_else(paths::default_profile_path);
    let profile = Profile::load_or_default(&path);

    println!("# profile: {}", path.display());
    println!("# active protocol: {}", profile.protocol_kind());
    print!(
        "{}",
        toml::to_string_pretty(&profile).context("serializing profile")?
    );

    Ok(())
}
