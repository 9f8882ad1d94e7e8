//! # CLI Command Implementations
//!
//! Each subcommand of `sdss-install` lives in its own file with an `Args`
//! struct derived with `clap` and an `execute` function that calls into the
//! `sdss_install` library.

pub mod completions;
pub mod install;
