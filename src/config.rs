//! # Install Configuration
//!
//! Everything an install run needs to know about its surroundings is gathered
//! once, up front, into two plain structs:
//!
//! - [`InstallOptions`]: what the user asked for (product, version, flags).
//!   The binary builds it from parsed command-line arguments.
//! - [`Environment`]: the environment variables the installer consults, read
//!   in a single [`Environment::from_env`] call. The core never calls
//!   `std::env::var` on its own; it receives an `Environment` by reference.
//!   Tests build one by hand.
//!
//! Authorization tokens live in [`Credentials`], keyed explicitly by API kind
//! rather than looked up by name on each request.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Install root override (`--root`).
pub const ENV_PRODUCT_ROOT: &str = "SDSS_INSTALL_PRODUCT_ROOT";
/// Long-path marker (`--longpath`).
pub const ENV_LONGPATH: &str = "SDSS4TOOLS_LONGPATH";
/// Root for GitHub-origin installs, replacing `<root>/github`.
pub const ENV_GIT_ROOT: &str = "SDSS_GIT_ROOT";
/// Root for SVN-origin installs, replacing `<root>/svn`.
pub const ENV_SVN_ROOT: &str = "SDSS_SVN_ROOT";
/// Directory holding GraphQL query templates.
pub const ENV_GRAPHQL_DIR: &str = "SDSS_INSTALL_GRAPHQL_DIR";
/// Bearer token for the GitHub GraphQL API.
pub const ENV_GRAPHQL_TOKEN: &str = "SDSS_INSTALL_GITHUB_KEY";
/// Bearer token for the REST API.
pub const ENV_REST_TOKEN: &str = "SDSSSANDBOX_KEY";
/// Work directory exported to child build processes.
pub const ENV_WORKING_DIR: &str = "WORKING_DIR";
/// Install directory exported to child build processes.
pub const ENV_INSTALL_DIR: &str = "INSTALL_DIR";

/// Default SVN server.
pub const DEFAULT_SVN_URL: &str = "https://svn.sdss.org";
/// Default GitHub organization.
pub const DEFAULT_ORGANIZATION: &str = "sdss";
/// Default GitHub GraphQL endpoint.
pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";
/// Product installed by `--bootstrap` when no product is named.
pub const BOOTSTRAP_PRODUCT: &str = "sdss_install";

/// Which remote source the product comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    /// Legacy SVN repository (SDSS-IV).
    Svn,
    /// GitHub repository (SDSS-V).
    GitHub,
}

impl OriginKind {
    /// Directory segment inserted below the install root.
    pub fn root_segment(self) -> &'static str {
        match self {
            OriginKind::Svn => "svn",
            OriginKind::GitHub => "github",
        }
    }

    /// Version names that denote the default branch.
    pub fn default_branches(self) -> &'static [&'static str] {
        match self {
            OriginKind::Svn => &["trunk"],
            OriginKind::GitHub => &["master", "main"],
        }
    }

    /// The default branch name used when none is requested.
    pub fn default_branch(self) -> &'static str {
        self.default_branches()[0]
    }
}

/// How GitHub products and versions are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryApi {
    /// GraphQL when a token is configured, otherwise `git ls-remote`.
    #[default]
    Auto,
    /// Always `git ls-remote`.
    Git,
    /// Always the GraphQL API.
    Graphql,
}

/// The user's request for one install run.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub product: Option<String>,
    pub version: Option<String>,
    pub origin: OriginKind,
    pub root: Option<PathBuf>,
    pub longpath: bool,
    pub force: bool,
    pub test: bool,
    pub module_only: bool,
    pub skip_module: bool,
    pub skip_version_dirs: bool,
    pub bootstrap: bool,
    pub keep: bool,
    pub public: bool,
    pub username: Option<String>,
    /// SVN server base URL.
    pub svn_url: String,
    /// Replaces `github.com/<organization>` in remote URLs when set.
    pub github_url: Option<String>,
    pub https: bool,
    pub organization: String,
    /// JSON file describing external dependencies.
    pub external_dependencies: Option<PathBuf>,
    pub query_api: QueryApi,
    /// Applied to each subprocess; `None` waits indefinitely.
    pub command_timeout: Option<Duration>,
    pub http_timeout: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            product: None,
            version: None,
            origin: OriginKind::Svn,
            root: None,
            longpath: false,
            force: false,
            test: false,
            module_only: false,
            skip_module: false,
            skip_version_dirs: false,
            bootstrap: false,
            keep: false,
            public: false,
            username: None,
            svn_url: DEFAULT_SVN_URL.to_string(),
            github_url: None,
            https: false,
            organization: DEFAULT_ORGANIZATION.to_string(),
            external_dependencies: None,
            query_api: QueryApi::Auto,
            command_timeout: None,
            http_timeout: Duration::from_secs(60),
        }
    }
}

/// Tokens for each API kind.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub graphql_token: Option<String>,
    pub rest_token: Option<String>,
}

/// Snapshot of the environment variables the installer reads.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub git_root: Option<PathBuf>,
    pub svn_root: Option<PathBuf>,
    pub graphql_dir: Option<PathBuf>,
    pub credentials: Credentials,
}

impl Environment {
    /// Read the installer's variables from the process environment.
    ///
    /// Empty values are treated as unset.
    pub fn from_env() -> Self {
        Self {
            git_root: non_empty(ENV_GIT_ROOT).map(PathBuf::from),
            svn_root: non_empty(ENV_SVN_ROOT).map(PathBuf::from),
            graphql_dir: non_empty(ENV_GRAPHQL_DIR).map(PathBuf::from),
            credentials: Credentials {
                graphql_token: non_empty(ENV_GRAPHQL_TOKEN),
                rest_token: non_empty(ENV_REST_TOKEN),
            },
        }
    }

    /// The per-origin root override, if configured.
    pub fn origin_root(&self, origin: OriginKind) -> Option<&PathBuf> {
        match origin {
            OriginKind::Svn => self.svn_root.as_ref(),
            OriginKind::GitHub => self.git_root.as_ref(),
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
