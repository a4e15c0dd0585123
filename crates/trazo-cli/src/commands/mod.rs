//! CLI subcommand implementations.

pub mod decode;
pub mod demo;
pub mod info;
