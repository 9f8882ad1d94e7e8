//! # SDSS Install CLI
//!
//! Binary entry point for `sdss-install`. It parses arguments with `clap`,
//! sets up logging and dispatches to a command. The install logic itself
//! lives in the `sdss_install` library.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
