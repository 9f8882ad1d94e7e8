//! Install command implementation
//!
//! Maps the command-line flags onto [`InstallOptions`], reads the
//! environment once and hands both to the library [`Installer`]. The final
//! line printed is always the run's status line.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, ValueEnum};
use log::{error, info};

use sdss_install::client::QueryTransport;
use sdss_install::config::{
    Environment, InstallOptions, OriginKind, QueryApi, DEFAULT_ORGANIZATION, DEFAULT_SVN_URL,
    ENV_LONGPATH, ENV_PRODUCT_ROOT,
};
use sdss_install::install::{graphql_client, status_line, Installer};
use sdss_install::output::{format_status, OutputConfig};
use sdss_install::process::SystemRunner;

/// How GitHub products and versions are validated
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum QueryApiArg {
    /// GraphQL when a token is set, otherwise git
    Auto,
    /// git ls-remote
    Git,
    /// GitHub GraphQL API
    Graphql,
}

impl From<QueryApiArg> for QueryApi {
    fn from(arg: QueryApiArg) -> Self {
        match arg {
            QueryApiArg::Auto => QueryApi::Auto,
            QueryApiArg::Git => QueryApi::Git,
            QueryApiArg::Graphql => QueryApi::Graphql,
        }
    }
}

/// Arguments for the install command
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Product to install, e.g. sdss/transfer (SVN) or sdssdb (GitHub)
    pub product: Option<String>,

    /// Version to install: trunk, master, main, a branch or a tag
    pub version: Option<String>,

    /// Install from GitHub instead of SVN
    #[arg(short = 'G', long)]
    pub github: bool,

    /// Overwrite an existing installation
    #[arg(short = 'F', long)]
    pub force: bool,

    /// Resolve and validate everything without changing anything
    #[arg(short, long)]
    pub test: bool,

    /// Only install the module file, in place
    #[arg(short, long)]
    pub module_only: bool,

    /// Skip the module file
    #[arg(short, long)]
    pub skip_module: bool,

    /// Install GitHub products without a version directory
    #[arg(long)]
    pub skip_git_verdirs: bool,

    /// Install the most recent tag of sdss_install (or of PRODUCT)
    #[arg(short, long)]
    pub bootstrap: bool,

    /// Keep the working directory after installing
    #[arg(short, long)]
    pub keep: bool,

    /// Download from the public SVN tree, without a username
    #[arg(short, long)]
    pub public: bool,

    /// SVN username
    #[arg(short, long, value_name = "USER")]
    pub username: Option<String>,

    /// Install root
    #[arg(short, long, value_name = "PATH", env = ENV_PRODUCT_ROOT)]
    pub root: Option<PathBuf>,

    /// Mirror the product's parent path below the root
    #[arg(
        short = 'L',
        long,
        env = ENV_LONGPATH,
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub longpath: bool,

    /// SVN server base URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_SVN_URL)]
    pub url: String,

    /// Base for GitHub remote URLs, replacing github.com/<organization>
    #[arg(long, value_name = "URL")]
    pub github_url: Option<String>,

    /// Clone over https instead of ssh
    #[arg(long)]
    pub https: bool,

    /// GitHub organization
    #[arg(short, long, value_name = "ORG", default_value = DEFAULT_ORGANIZATION)]
    pub organization: String,

    /// JSON file declaring external dependencies
    #[arg(short, long, value_name = "FILE")]
    pub external_dependencies: Option<PathBuf>,

    /// How GitHub versions are validated
    #[arg(long, value_enum, default_value = "auto")]
    pub query_api: QueryApiArg,

    /// Kill git and svn commands after this many seconds
    #[arg(long, value_name = "SECS")]
    pub command_timeout: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub http_timeout: u64,
}

impl InstallArgs {
    pub fn to_options(&self) -> InstallOptions {
        InstallOptions {
            product: self.product.clone(),
            version: self.version.clone(),
            origin: if self.github {
                OriginKind::GitHub
            } else {
                OriginKind::Svn
            },
            root: self.root.clone(),
            longpath: self.longpath,
            force: self.force,
            test: self.test,
            module_only: self.module_only,
            skip_module: self.skip_module,
            skip_version_dirs: self.skip_git_verdirs,
            bootstrap: self.bootstrap,
            keep: self.keep,
            public: self.public,
            username: self.username.clone(),
            svn_url: self.url.clone(),
            github_url: self.github_url.clone(),
            https: self.https,
            organization: self.organization.clone(),
            external_dependencies: self.external_dependencies.clone(),
            query_api: self.query_api.into(),
            command_timeout: self.command_timeout.map(Duration::from_secs),
            http_timeout: Duration::from_secs(self.http_timeout),
        }
    }
}

/// Execute the install command
pub fn execute(args: InstallArgs, color: &str) -> Result<()> {
    let output = OutputConfig::from_env_and_flag(color);
    let options = args.to_options();
    let environment = Environment::from_env();
    let runner = SystemRunner::new(options.command_timeout);

    let result = graphql_client(&options, &environment).and_then(|client| {
        let transport = client.as_ref().map(|c| c as &dyn QueryTransport);
        Installer::new(&options, &environment, &runner, transport).run()
    });

    match result {
        Ok(report) => {
            let verb = if report.test { "Would install" } else { "Installed" };
            info!(
                "{} {} {} into {}",
                verb,
                report.product,
                report.version,
                report.plan.install.display()
            );
            for dependency in &report.dependencies {
                info!(
                    "External dependency {} {} in {}",
                    dependency.name,
                    dependency.version.name,
                    dependency.install_dir.display()
                );
            }
            let line = status_line(true, options.test, options.skip_module);
            println!("{}", format_status(&output, true, &line));
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            let line = status_line(false, options.test, options.skip_module);
            println!("{}", format_status(&output, false, &line));
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: InstallArgs,
    }

    fn parse(argv: &[&str]) -> InstallOptions {
        let mut full = vec!["install"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args.to_options()
    }

    #[test]
    fn test_defaults_are_svn() {
        let options = parse(&["--root", "/software", "sdss/transfer", "trunk"]);
        assert_eq!(options.origin, OriginKind::Svn);
        assert_eq!(options.svn_url, DEFAULT_SVN_URL);
        assert_eq!(options.organization, DEFAULT_ORGANIZATION);
        assert_eq!(options.query_api, QueryApi::Auto);
        assert_eq!(options.http_timeout, Duration::from_secs(60));
        assert!(options.command_timeout.is_none());
    }

    #[test]
    fn test_github_flags_map_to_options() {
        let options = parse(&[
            "--root",
            "/software",
            "-G",
            "--https",
            "--skip-git-verdirs",
            "--query-api",
            "git",
            "--command-timeout",
            "30",
            "sdssdb",
            "1.0.0",
        ]);
        assert_eq!(options.origin, OriginKind::GitHub);
        assert!(options.https);
        assert!(options.skip_version_dirs);
        assert_eq!(options.query_api, QueryApi::Git);
        assert_eq!(options.command_timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_bootstrap_needs_no_positionals() {
        let options = parse(&["--root", "/software", "--bootstrap", "--github"]);
        assert!(options.bootstrap);
        assert!(options.product.is_none());
    }
}
