//! # Error Handling
//!
//! This module defines the centralized error type for `sdss-install`. It uses
//! `thiserror` to build a single `Error` enum covering every failure mode of an
//! install run, with enough context in each variant to tell the user what to
//! fix.
//!
//! The variants fall into four groups:
//!
//! - **Configuration**: a missing or unusable install root, a missing
//!   authorization token, an unsupported external-dependency URL. These abort
//!   before any remote call is made.
//! - **Validation**: the product does not exist on the remote, or the
//!   requested version is neither the default branch, a branch, nor a tag.
//!   Product and version failures are separate variants so the message always
//!   says which one was wrong.
//! - **Transport**: a subprocess or HTTP request failed, timed out, or
//!   returned something that could not be decoded.
//! - **Directory safety**: a forced reinstall would delete the directory the
//!   process is standing in.
//!
//! Nothing in the core retries. A failed step is returned to the caller with
//! `?` and the run stops there.

use std::path::PathBuf;
use thiserror::Error;

/// Help page linked from SSH public key failures.
pub const PUBLICKEY_HELP_URL: &str =
    "https://docs.github.com/en/authentication/troubleshooting-ssh/error-permission-denied-publickey";

/// Main error type for sdss-install operations
#[derive(Error, Debug)]
pub enum Error {
    /// The install configuration is unusable.
    ///
    /// Carries an optional hint naming the option or environment variable
    /// that would fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Configuration {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An authorization token was required but its environment variable is unset.
    #[error("Missing credential: environment variable {variable} is not set")]
    MissingCredential { variable: String },

    /// An external dependency names a URL that is neither GitHub nor SVN.
    #[error("Unsupported external dependency URL: {url}")]
    UnsupportedDependencyUrl { url: String },

    /// The install directory already exists and `--force` was not given.
    #[error("Install directory {} already exists\n  hint: use the -F (or --force) option to overwrite", install.display())]
    InstallExists { install: PathBuf },

    /// A feature that is deliberately not supported.
    #[error("Feature not implemented: {feature}")]
    NotImplemented { feature: String },

    /// The product does not exist on the remote.
    #[error("Invalid product {product}: not found at {location}")]
    ProductNotFound { product: String, location: String },

    /// The product exists but the requested version does not.
    #[error("Invalid version {version} of product {product}: not the default branch, a branch, or a tag")]
    VersionNotFound { product: String, version: String },

    /// An external command could not be started.
    #[error("Failed to run {command}: {message}")]
    Command { command: String, message: String },

    /// An external command did not finish in time and was killed.
    #[error("Command timed out after {seconds}s: {command}")]
    CommandTimeout { command: String, seconds: u64 },

    /// A git command exited non-zero.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// An svn command exited non-zero.
    #[error("SVN command failed for {url}: {command} - {stderr}")]
    SvnCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// GitHub refused the SSH key.
    #[error("Permission denied (publickey) for {url}\n  hint: see {}, or retry with --https", PUBLICKEY_HELP_URL)]
    PublicKeyDenied { url: String },

    /// An error occurred during a network operation.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// A GraphQL response without a top-level `data` member.
    #[error("GraphQL query failed: {body}")]
    GraphqlQuery { body: String },

    /// A remote response was missing expected fields.
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Removing the install directory would remove the caller's location.
    #[error("Refusing to delete {}: current directory {} is inside it\n  hint: cd to another working directory and try again", install.display(), cwd.display())]
    DirectorySafety { cwd: PathBuf, install: PathBuf },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a `Configuration` error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            hint: None,
        }
    }

    /// Shorthand for a `Decode` error.
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
