//! # SDSS Product Installer
//!
//! Installs a named version of an SDSS software product, fetched from the
//! legacy SVN server or from a GitHub organization, into a versioned
//! directory tree. The `sdss-install` binary is a thin wrapper around
//! [`install::Installer`].
//!
//! ## Quick Example
//!
//! ```
//! use sdss_install::config::{InstallOptions, OriginKind};
//! use sdss_install::product::Product;
//!
//! let options = InstallOptions {
//!     product: Some("sdss/transfer".to_string()),
//!     version: Some("branches/dev/".to_string()),
//!     origin: OriginKind::Svn,
//!     ..InstallOptions::default()
//! };
//! let product = Product::from_options(&options).unwrap();
//! assert_eq!(product.path, "repo/sdss/transfer");
//! assert_eq!(product.version_dir("branches/dev"), "dev");
//! ```
//!
//! ## Core Concepts
//!
//! - **Remote queries (`client`, `query`, `pagination`)**: bearer-authenticated
//!   GitHub GraphQL requests built from templates, with cursor pagination
//!   over repositories, branches and tags.
//! - **Versions (`tags`, `classify`)**: picking the most recent tag and
//!   deciding whether a requested version is the default branch, a branch or
//!   a tag.
//! - **Directories (`layout`, `stage`)**: where a product is fetched and
//!   installed, and the guards that keep an overwrite from deleting the
//!   caller's own directory.
//! - **Fetching (`fetch`, `process`)**: `git` and `svn` commands run through
//!   a mockable [`process::CommandRunner`].
//! - **External dependencies (`external`)**: secondary GitHub products
//!   installed beside the main one and exposed through search paths.
//!
//! ## Execution Flow
//!
//! [`install::Installer::run`] resolves the product, classifies the version,
//! plans and guards directories, fetches, installs external dependencies,
//! exports the directory variables and stages the work tree. Every step
//! returns [`error::Result`] and the first failure ends the run.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod external;
pub mod fetch;
pub mod install;
pub mod layout;
pub mod output;
pub mod pagination;
pub mod process;
pub mod product;
pub mod query;
pub mod stage;
pub mod tags;

#[cfg(test)]
mod tags_proptest;
