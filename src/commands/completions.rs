//! # Completions
//!
//! `sdss-install completions <shell>` prints a tab-completion script for the
//! whole command line, including every `install` flag (`--bootstrap`,
//! `--skip-git-verdirs`, `--external-dependencies`, ...). Sites that put
//! `sdss-install` on a shared `PATH` usually drop the script next to it:
//!
//! ```bash
//! sdss-install completions bash > $SDSS_INSTALL_PRODUCT_ROOT/etc/sdss-install.bash
//! sdss-install completions zsh > ~/.zfunc/_sdss-install
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::io::{self, Write};

use crate::cli::Cli;

const BIN_NAME: &str = "sdss-install";

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the script for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to `out`.
pub fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, BIN_NAME, out);
}

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_completions(args.shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}
