//! End-to-end tests for CLI exit codes.
//!
//! - Exit code 0: Success
//! - Exit code 1: The install failed
//! - Exit code 2: Invalid command-line usage (handled by clap)

#[allow(dead_code)]
mod common;
use common::prelude::*;

/// Exit code 0 is returned for --help.
#[test]
fn test_exit_code_help() {
    let mut cmd = cargo_bin_cmd!("sdss-install");

    cmd.arg("--help").assert().code(0);
}

/// Exit code 0 is returned for --version.
#[test]
fn test_exit_code_version() {
    let mut cmd = cargo_bin_cmd!("sdss-install");

    cmd.arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Exit code 2 is returned for an unknown subcommand.
#[test]
fn test_exit_code_unknown_subcommand() {
    let mut cmd = cargo_bin_cmd!("sdss-install");

    cmd.arg("uninstall").assert().code(2);
}

/// Exit code 2 is returned for an invalid --query-api value.
#[test]
fn test_exit_code_invalid_query_api() {
    let mut cmd = cargo_bin_cmd!("sdss-install");

    cmd.args(["install", "--query-api", "rest", "sdssdb", "master"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

/// Exit code 1 is returned when no product is named.
#[test]
fn test_exit_code_missing_product() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("sdss-install");

    cmd.current_dir(temp.path())
        .env_remove("SDSS_INSTALL_GITHUB_KEY")
        .args(["--color", "never", "install", "--github"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Fail!"))
        .stderr(predicate::str::contains(
            "You must specify a product and the version",
        ));
}

/// A missing version outside bootstrap mode is the same configuration error.
#[test]
fn test_exit_code_missing_version() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("sdss-install");

    cmd.current_dir(temp.path())
        .env_remove("SDSS_INSTALL_GITHUB_KEY")
        .args(["install", "--github", "sdssdb"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("You must specify a product"));
}

/// Exit code 1 is returned for a dry run that fails, with the dry-run status.
#[test]
fn test_exit_code_failed_dry_run() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("sdss-install");

    cmd.current_dir(temp.path())
        .env_remove("SDSS_INSTALL_GITHUB_KEY")
        .args(["--color", "never", "install", "--github", "--test"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Test Fail"));
}

/// Exit code 1 is returned when GraphQL is required but no token is set.
#[test]
fn test_exit_code_graphql_without_token() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("sdss-install");

    cmd.current_dir(temp.path())
        .env_remove("SDSS_INSTALL_GITHUB_KEY")
        .args(["install", "--github", "--query-api", "graphql", "sdssdb", "master"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SDSS_INSTALL_GITHUB_KEY"));
}

/// Exit code 1 is returned when no install root is configured.
#[test]
fn test_exit_code_missing_root() {
    if !git_available() {
        return;
    }
    let fixture = RemoteFixture::new();
    let mut cmd = cargo_bin_cmd!("sdss-install");
    for variable in common::ISOLATED_VARIABLES {
        cmd.env_remove(variable);
    }

    cmd.current_dir(fixture.cwd())
        .arg("install")
        .arg("--github")
        .arg("--query-api")
        .arg("git")
        .arg("--github-url")
        .arg(fixture.remotes())
        .args(["sdssdb", "master"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no install root is configured"));
}
