//! # Fetching
//!
//! Materializes a resolved version into the planned work directory.
//!
//! GitHub products are cloned, then checked out at the branch or tag unless
//! the default branch was asked for. A tag checkout drops the `origin`
//! remote so the copy cannot be pulled or pushed by accident; the `.git`
//! directory itself is kept.
//!
//! SVN products are fetched with a single `svn checkout` of trunk or a
//! branch, or an `svn export` of a tag (or of anything in public mode).

use std::fmt;
use std::path::Path;

use log::info;

use crate::classify::{svn_command, ResolvedVersion};
use crate::error::{Error, Result};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::product::Product;

/// How an SVN product is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvnMode {
    Checkout,
    Export,
}

impl SvnMode {
    /// Tags and public downloads are exported; everything else is checked out.
    pub fn for_version(version: &ResolvedVersion, public: bool) -> Self {
        if version.is_tag() || public {
            SvnMode::Export
        } else {
            SvnMode::Checkout
        }
    }
}

impl fmt::Display for SvnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvnMode::Checkout => write!(f, "checkout"),
            SvnMode::Export => write!(f, "export"),
        }
    }
}

/// Runs the VCS commands that fetch a product.
pub struct FetchEngine<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> FetchEngine<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Clone `product` into `work` and move it to `version`.
    pub fn fetch_github(
        &self,
        product: &Product,
        version: &ResolvedVersion,
        work: &Path,
    ) -> Result<()> {
        let url = &product.remote_url;
        info!("Cloning {} into {}", url, work.display());
        let clone = CommandSpec::new("git")
            .arg("clone")
            .arg(url.as_str())
            .path_arg(work);
        self.git(&clone, url)?;

        if !version.is_default_branch() {
            self.checkout(work, &version.checkout_ref, url)?;
        }
        if version.requires_origin_removal {
            self.remove_origin(work, url)?;
        }
        info!("Completed fetch of {} {}", product.name, version.name);
        Ok(())
    }

    /// Freeze an existing clone at `tag`, as for a tag fetch.
    pub fn pin_tag(&self, work: &Path, tag: &str, url: &str) -> Result<()> {
        self.checkout(work, &format!("tags/{}", tag), url)?;
        self.remove_origin(work, url)
    }

    /// Check out or export `product` at `version` into `work`.
    ///
    /// `username` is passed as `--username`; public downloads pass `None`.
    pub fn fetch_svn(
        &self,
        product: &Product,
        version: &ResolvedVersion,
        work: &Path,
        mode: SvnMode,
        username: Option<&str>,
    ) -> Result<()> {
        let url = product.svn_url(&version.checkout_ref);
        info!("Running {} of {}", mode, url);
        let spec = svn_command(username)
            .arg(mode.to_string())
            .arg(url.as_str())
            .path_arg(work);
        let output = self.runner.run(&spec)?;
        if !output.success() {
            return Err(Error::SvnCommand {
                command: spec.to_string(),
                url,
                stderr: output.stderr.trim().to_string(),
            });
        }
        info!("Completed svn {} of {}", mode, url);
        Ok(())
    }

    fn checkout(&self, work: &Path, reference: &str, url: &str) -> Result<()> {
        let spec = CommandSpec::new("git")
            .args(["checkout", reference])
            .current_dir(work);
        self.git(&spec, url).map(|_| ())
    }

    fn remove_origin(&self, work: &Path, url: &str) -> Result<()> {
        let spec = CommandSpec::new("git")
            .args(["remote", "rm", "origin"])
            .current_dir(work);
        self.git(&spec, url).map(|_| ())
    }

    fn git(&self, spec: &CommandSpec, url: &str) -> Result<CommandOutput> {
        let output = self.runner.run(spec)?;
        if output.success() {
            return Ok(output);
        }
        if output.stderr.contains("Permission denied (publickey)") {
            return Err(Error::PublicKeyDenied {
                url: url.to_string(),
            });
        }
        Err(Error::GitCommand {
            command: spec.to_string(),
            url: url.to_string(),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InstallOptions, OriginKind};
    use crate::process::mock::ScriptedRunner;

    fn github(name: &str) -> Product {
        Product::from_options(&InstallOptions {
            product: Some(name.to_string()),
            version: Some("master".to_string()),
            origin: OriginKind::GitHub,
            https: true,
            ..InstallOptions::default()
        })
        .unwrap()
    }

    fn svn(public: bool) -> Product {
        Product::from_options(&InstallOptions {
            product: Some("sdss/transfer".to_string()),
            version: Some("trunk".to_string()),
            origin: OriginKind::Svn,
            public,
            ..InstallOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_branch_is_clone_only() {
        let runner = ScriptedRunner::new();
        let work = Path::new("/tmp/sdssdb-master");
        FetchEngine::new(&runner)
            .fetch_github(
                &github("sdssdb"),
                &ResolvedVersion::default_branch(OriginKind::GitHub, "master"),
                work,
            )
            .unwrap();
        assert_eq!(
            runner.calls(),
            vec!["git clone https://github.com/sdss/sdssdb.git /tmp/sdssdb-master"]
        );
    }

    #[test]
    fn test_branch_is_clone_and_checkout() {
        let runner = ScriptedRunner::new();
        let work = Path::new("/tmp/sdssdb-dev");
        FetchEngine::new(&runner)
            .fetch_github(
                &github("sdssdb"),
                &ResolvedVersion::branch(OriginKind::GitHub, "dev"),
                work,
            )
            .unwrap();
        let specs = runner.specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].to_string(), "git checkout dev");
        assert_eq!(specs[1].cwd(), Some(work));
    }

    #[test]
    fn test_tag_removes_origin() {
        let runner = ScriptedRunner::new();
        FetchEngine::new(&runner)
            .fetch_github(
                &github("sdssdb"),
                &ResolvedVersion::tag("1.0.0"),
                Path::new("/tmp/sdssdb-1.0.0"),
            )
            .unwrap();
        assert_eq!(
            runner.calls()[1..],
            ["git checkout tags/1.0.0", "git remote rm origin"]
        );
    }

    #[test]
    fn test_clone_failure_stops_before_checkout() {
        let runner = ScriptedRunner::new().on(
            "git clone",
            128,
            "",
            "fatal: repository 'https://github.com/sdss/sdssdb.git/' not found",
        );
        let result = FetchEngine::new(&runner).fetch_github(
            &github("sdssdb"),
            &ResolvedVersion::tag("1.0.0"),
            Path::new("/tmp/w"),
        );
        match result {
            Err(Error::GitCommand { command, stderr, .. }) => {
                assert!(command.starts_with("git clone"));
                assert!(stderr.contains("not found"));
            }
            other => panic!("expected GitCommand, got {:?}", other),
        }
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_clone_publickey_failure() {
        let runner = ScriptedRunner::new().on(
            "git clone",
            128,
            "",
            "git@github.com: Permission denied (publickey).",
        );
        let result = FetchEngine::new(&runner).fetch_github(
            &github("sdssdb"),
            &ResolvedVersion::default_branch(OriginKind::GitHub, "master"),
            Path::new("/tmp/w"),
        );
        assert!(matches!(result, Err(Error::PublicKeyDenied { .. })));
    }

    #[test]
    fn test_noisy_stderr_with_zero_exit_is_success() {
        let runner = ScriptedRunner::new().on("git clone", 0, "", "Cloning into '/tmp/w'...\n");
        FetchEngine::new(&runner)
            .fetch_github(
                &github("sdssdb"),
                &ResolvedVersion::default_branch(OriginKind::GitHub, "master"),
                Path::new("/tmp/w"),
            )
            .unwrap();
    }

    #[test]
    fn test_svn_modes() {
        let trunk = ResolvedVersion::default_branch(OriginKind::Svn, "trunk");
        let tag = ResolvedVersion::tag("v1_0_0");
        assert_eq!(SvnMode::for_version(&trunk, false), SvnMode::Checkout);
        assert_eq!(SvnMode::for_version(&trunk, true), SvnMode::Export);
        assert_eq!(SvnMode::for_version(&tag, false), SvnMode::Export);
    }

    #[test]
    fn test_svn_checkout_command() {
        let runner = ScriptedRunner::new();
        let trunk = ResolvedVersion::default_branch(OriginKind::Svn, "trunk");
        FetchEngine::new(&runner)
            .fetch_svn(
                &svn(false),
                &trunk,
                Path::new("/tmp/transfer-trunk"),
                SvnMode::Checkout,
                Some("alice"),
            )
            .unwrap();
        assert_eq!(
            runner.calls(),
            vec!["svn --username alice checkout https://svn.sdss.org/repo/sdss/transfer/trunk /tmp/transfer-trunk"]
        );
    }

    #[test]
    fn test_svn_public_export() {
        let runner = ScriptedRunner::new();
        let tag = ResolvedVersion::tag("v1_0_0");
        FetchEngine::new(&runner)
            .fetch_svn(
                &svn(true),
                &tag,
                Path::new("/tmp/transfer-v1_0_0"),
                SvnMode::Export,
                None,
            )
            .unwrap();
        assert_eq!(
            runner.calls(),
            vec!["svn export https://svn.sdss.org/public/repo/sdss/transfer/tags/v1_0_0 /tmp/transfer-v1_0_0"]
        );
    }

    #[test]
    fn test_svn_failure_carries_stderr() {
        let runner = ScriptedRunner::new().on("svn checkout", 1, "", "svn: E170013: Unable to connect");
        let trunk = ResolvedVersion::default_branch(OriginKind::Svn, "trunk");
        let result = FetchEngine::new(&runner).fetch_svn(
            &svn(false),
            &trunk,
            Path::new("/tmp/t"),
            SvnMode::Checkout,
            None,
        );
        match result {
            Err(Error::SvnCommand { stderr, url, .. }) => {
                assert!(stderr.contains("E170013"));
                assert!(url.ends_with("/trunk"));
            }
            other => panic!("expected SvnCommand, got {:?}", other),
        }
    }
}
