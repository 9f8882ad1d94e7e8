//! Shared test utilities for the CLI E2E tests.
//!
//! Local git repositories stand in for GitHub: [`RemoteFixture`] creates
//! `<remotes>/sdssdb.git` and the tests pass `--github-url <remotes>` so the
//! installer clones from disk.
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     if !git_available() {
//!         return;
//!     }
//!     let fixture = RemoteFixture::new();
//!     fixture.install(&["sdssdb", "master"]).assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::git_available;
    pub use super::RemoteFixture;
}

/// Environment variables that would redirect an install run.
pub const ISOLATED_VARIABLES: &[&str] = &[
    "SDSS_GIT_ROOT",
    "SDSS_SVN_ROOT",
    "SDSS_INSTALL_PRODUCT_ROOT",
    "SDSS4TOOLS_LONGPATH",
    "SDSS_INSTALL_GITHUB_KEY",
    "SDSSSANDBOX_KEY",
    "SDSS_INSTALL_GRAPHQL_DIR",
];

/// Whether a `git` executable is on `PATH`.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.name=SDSS Test",
            "-c",
            "user.email=test@sdss.org",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        status.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&status.stderr)
    );
}

/// A temporary tree with a local remote, an install root and a work area.
///
/// The `sdssdb` remote has a `master` branch with tag `1.0.0` on its first
/// commit, a second commit on `master`, and a `dev` branch.
pub struct RemoteFixture {
    temp_dir: assert_fs::TempDir,
}

impl RemoteFixture {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir.child("cwd").create_dir_all().unwrap();

        let repo = temp_dir.child("remotes/sdssdb.git");
        repo.create_dir_all().unwrap();
        git(repo.path(), &["init", "-q"]);
        git(repo.path(), &["symbolic-ref", "HEAD", "refs/heads/master"]);

        repo.child("setup.py").write_str("# sdssdb\n").unwrap();
        repo.child("python/sdssdb/__init__.py")
            .write_str("__version__ = '1.0.0'\n")
            .unwrap();
        git(repo.path(), &["add", "."]);
        git(repo.path(), &["commit", "-q", "-m", "Initial release"]);
        git(repo.path(), &["tag", "1.0.0"]);

        repo.child("CHANGELOG.md").write_str("# Changes\n").unwrap();
        git(repo.path(), &["add", "."]);
        git(repo.path(), &["commit", "-q", "-m", "Start next release"]);
        git(repo.path(), &["branch", "dev"]);

        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Base passed as `--github-url`.
    pub fn remotes(&self) -> PathBuf {
        self.path().join("remotes")
    }

    /// Passed as `--root`.
    pub fn root(&self) -> PathBuf {
        self.path().join("root")
    }

    /// Directory the installer runs from.
    pub fn cwd(&self) -> PathBuf {
        self.path().join("cwd")
    }

    /// Install directory of an sdssdb version.
    pub fn install_dir(&self, version: &str) -> PathBuf {
        self.root().join("github/sdssdb").join(version)
    }

    /// Write `content` to `name` in the fixture directory.
    #[allow(dead_code)]
    pub fn child_file(&self, name: &str, content: &str) -> PathBuf {
        let child = self.temp_dir.child(name);
        child.write_str(content).unwrap();
        child.path().to_path_buf()
    }

    /// `sdss-install install --github` against the local remote, run from
    /// [`cwd`](Self::cwd), followed by `args`.
    pub fn install(&self, args: &[&str]) -> assert_cmd::Command {
        self.install_from(&self.cwd(), args)
    }

    pub fn install_from(&self, cwd: &Path, args: &[&str]) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sdss-install");
        for variable in ISOLATED_VARIABLES {
            cmd.env_remove(variable);
        }
        cmd.current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .arg("--color")
            .arg("never")
            .arg("install")
            .arg("--github")
            .arg("--query-api")
            .arg("git")
            .arg("--root")
            .arg(self.root())
            .arg("--github-url")
            .arg(self.remotes())
            .args(args);
        cmd
    }
}

impl Default for RemoteFixture {
    fn default() -> Self {
        Self::new()
    }
}
