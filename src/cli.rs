//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// Install SDSS software products from SVN or GitHub
#[derive(Parser, Debug)]
#[command(name = "sdss-install")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a product at a version
    Install(commands::install::InstallArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let dry_run = matches!(&self.command, Commands::Install(args) if args.test);
        init_logging(&self.log_level, self.verbose || dry_run)?;

        match self.command {
            Commands::Install(args) => commands::install::execute(args, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let mut filter: LevelFilter = level
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid log level: {}", level))?;
    if debug && filter < LevelFilter::Debug {
        filter = LevelFilter::Debug;
    }
    env_logger::Builder::new()
        .filter_level(filter)
        .format_target(false)
        .try_init()
        .ok();
    Ok(())
}
