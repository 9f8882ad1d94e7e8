//! # Version Classification
//!
//! Decides what a requested version string refers to, checking it against
//! the remote:
//!
//! 1. The product must exist. A missing product is reported as
//!    [`Error::ProductNotFound`], never as a bad version.
//! 2. A default-branch name (`master`/`main` on GitHub, `trunk` on SVN) is
//!    accepted without listing branches or tags.
//! 3. Otherwise the name is looked up as a branch, then as a tag.
//! 4. Anything else is [`Error::VersionNotFound`].
//!
//! Remote lookups go through the [`VersionProbe`] trait. [`GitRemoteProbe`]
//! uses `git ls-remote`, [`GraphqlProbe`] uses the paginated GitHub GraphQL
//! collections and [`SvnProbe`] uses `svn ls`.
//!
//! With no version requested (bootstrap mode) the most recent tag is chosen.
//! `git ls-remote` cannot date tags, so a GitHub bootstrap over git resolves
//! to [`Resolution::Describe`]: fetch the default branch first, then ask
//! [`describe_latest_tag`] in the working copy.

use std::path::Path;
use std::sync::OnceLock;

use log::{debug, info, warn};
use regex::Regex;

use crate::client::QueryTransport;
use crate::config::OriginKind;
use crate::error::{Error, Result};
use crate::pagination::{fetch_all, Branches, Repositories, Tags};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::product::Product;
use crate::query::QueryTemplates;
use crate::tags::{latest_svn_tag, most_recent_by_date, NO_TAG_VERSION};

const PUBLICKEY_DENIED: &str = "Permission denied (publickey)";

/// What kind of ref a version is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    DefaultBranch,
    Branch,
    Tag,
}

/// A version checked against the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Bare version name, also the version directory name.
    pub name: String,
    pub classification: Classification,
    /// Ref handed to `git checkout`, or the path below the SVN product URL.
    pub checkout_ref: String,
    /// Tags are detached from their remote after checkout.
    pub requires_origin_removal: bool,
}

impl ResolvedVersion {
    pub fn default_branch(origin: OriginKind, name: &str) -> Self {
        let checkout_ref = match origin {
            OriginKind::Svn => "trunk".to_string(),
            OriginKind::GitHub => name.to_string(),
        };
        Self {
            name: name.to_string(),
            classification: Classification::DefaultBranch,
            checkout_ref,
            requires_origin_removal: false,
        }
    }

    pub fn branch(origin: OriginKind, name: &str) -> Self {
        let checkout_ref = match origin {
            OriginKind::Svn => format!("branches/{}", name),
            OriginKind::GitHub => name.to_string(),
        };
        Self {
            name: name.to_string(),
            classification: Classification::Branch,
            checkout_ref,
            requires_origin_removal: false,
        }
    }

    pub fn tag(name: &str) -> Self {
        Self {
            name: name.to_string(),
            classification: Classification::Tag,
            checkout_ref: format!("tags/{}", name),
            requires_origin_removal: true,
        }
    }

    pub fn is_default_branch(&self) -> bool {
        self.classification == Classification::DefaultBranch
    }

    pub fn is_tag(&self) -> bool {
        self.classification == Classification::Tag
    }
}

/// Outcome of classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedVersion),
    /// Fetch this default branch, then resolve the tag with
    /// [`describe_latest_tag`].
    Describe(ResolvedVersion),
}

impl Resolution {
    /// The version to plan directories and fetch with.
    pub fn version(&self) -> &ResolvedVersion {
        match self {
            Resolution::Resolved(version) | Resolution::Describe(version) => version,
        }
    }
}

/// Remote existence checks for products and their refs.
pub trait VersionProbe {
    fn product_exists(&self, product: &Product) -> Result<bool>;

    fn branch_exists(&self, product: &Product, branch: &str) -> Result<bool>;

    fn tag_exists(&self, product: &Product, tag: &str) -> Result<bool>;

    /// Most recent tag, or `None` when this probe cannot tell.
    fn latest_tag(&self, product: &Product) -> Result<Option<String>>;
}

/// Classify the product's requested version.
///
/// # Errors
///
/// `ProductNotFound` or `VersionNotFound` when the remote does not know the
/// product or version; transport errors from the probe are passed through.
pub fn classify(probe: &dyn VersionProbe, product: &Product) -> Result<Resolution> {
    if !probe.product_exists(product)? {
        return Err(Error::ProductNotFound {
            product: product.name.clone(),
            location: product.remote_url.clone(),
        });
    }
    debug!("Found product {} at {}", product.name, product.remote_url);

    match product.requested_version.as_deref() {
        Some(version) => classify_version(probe, product, version).map(Resolution::Resolved),
        None => bootstrap(probe, product),
    }
}

fn classify_version(
    probe: &dyn VersionProbe,
    product: &Product,
    version: &str,
) -> Result<ResolvedVersion> {
    let origin = product.origin;
    if origin.default_branches().contains(&version) {
        return Ok(ResolvedVersion::default_branch(origin, version));
    }

    let not_found = || Error::VersionNotFound {
        product: product.name.clone(),
        version: version.to_string(),
    };

    if origin == OriginKind::Svn {
        if let Some(branch) = version.strip_prefix("branches/") {
            return if probe.branch_exists(product, branch)? {
                Ok(ResolvedVersion::branch(origin, branch))
            } else {
                Err(not_found())
            };
        }
        if let Some(tag) = version.strip_prefix("tags/") {
            return if probe.tag_exists(product, tag)? {
                Ok(ResolvedVersion::tag(tag))
            } else {
                Err(not_found())
            };
        }
    }

    if probe.branch_exists(product, version)? {
        info!("{} {} is a branch", product.name, version);
        Ok(ResolvedVersion::branch(origin, version))
    } else if probe.tag_exists(product, version)? {
        info!("{} {} is a tag", product.name, version);
        Ok(ResolvedVersion::tag(version))
    } else {
        Err(not_found())
    }
}

fn bootstrap(probe: &dyn VersionProbe, product: &Product) -> Result<Resolution> {
    match probe.latest_tag(product)? {
        Some(tag) => {
            info!("Selected {}/{} for bootstrap installation", product.name, tag);
            Ok(Resolution::Resolved(ResolvedVersion::tag(&tag)))
        }
        None if product.origin == OriginKind::GitHub => {
            let branch = product.origin.default_branch();
            info!(
                "Bootstrap of {} will use the most recent tag of {}",
                product.name, branch
            );
            Ok(Resolution::Describe(ResolvedVersion::default_branch(
                product.origin,
                branch,
            )))
        }
        None => Err(Error::VersionNotFound {
            product: product.name.clone(),
            version: NO_TAG_VERSION.to_string(),
        }),
    }
}

fn release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+").expect("release pattern is valid"))
}

/// Most recent release tag reachable from the checkout in `work`.
///
/// Only tags starting with `MAJOR.MINOR.PATCH` count; anything else yields
/// `None`.
pub fn describe_latest_tag(runner: &dyn CommandRunner, work: &Path) -> Result<Option<String>> {
    let spec = CommandSpec::new("git")
        .args(["describe", "--tags", "--abbrev=0"])
        .current_dir(work);
    let output = runner.run(&spec)?;
    if !output.success() {
        warn!("No tag found in {}: {}", work.display(), output.stderr.trim());
        return Ok(None);
    }
    let tag = output.stdout.trim();
    if release_pattern().is_match(tag) {
        Ok(Some(tag.to_string()))
    } else {
        warn!("Most recent tag {} is not a release tag", tag);
        Ok(None)
    }
}

/// Probes a GitHub remote with `git ls-remote`.
pub struct GitRemoteProbe<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> GitRemoteProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    fn ls_remote(&self, url: &str, kind: &str, pattern: Option<&str>) -> Result<CommandOutput> {
        let mut spec = CommandSpec::new("git")
            .arg("ls-remote")
            .arg(kind)
            .arg(url)
            .env("GIT_TERMINAL_PROMPT", "0");
        if let Some(pattern) = pattern {
            spec = spec.arg(pattern);
        }
        let output = self.runner.run(&spec)?;
        if output.stderr.contains(PUBLICKEY_DENIED) {
            return Err(Error::PublicKeyDenied {
                url: url.to_string(),
            });
        }
        if !output.success() && !is_missing_repository(&output.stderr) {
            return Err(Error::GitCommand {
                command: spec.to_string(),
                url: url.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    fn has_ref(&self, product: &Product, kind: &str, full_ref: &str, name: &str) -> Result<bool> {
        let output = self.ls_remote(&product.remote_url, kind, Some(name))?;
        Ok(output.success()
            && output.stdout.lines().any(|line| {
                line.split_whitespace()
                    .nth(1)
                    .is_some_and(|r| r == full_ref || r.strip_suffix("^{}") == Some(full_ref))
            }))
    }
}

fn is_missing_repository(stderr: &str) -> bool {
    const MARKERS: &[&str] = &[
        "Repository not found",
        "does not appear to be a git repository",
        "could not read Username",
        "terminal prompts disabled",
    ];
    MARKERS.iter().any(|marker| stderr.contains(marker))
}

impl VersionProbe for GitRemoteProbe<'_> {
    fn product_exists(&self, product: &Product) -> Result<bool> {
        let output = self.ls_remote(&product.remote_url, "--heads", None)?;
        if !output.success() {
            debug!("{}", output.stderr.trim());
        }
        Ok(output.success())
    }

    fn branch_exists(&self, product: &Product, branch: &str) -> Result<bool> {
        self.has_ref(product, "--heads", &format!("refs/heads/{}", branch), branch)
    }

    fn tag_exists(&self, product: &Product, tag: &str) -> Result<bool> {
        self.has_ref(product, "--tags", &format!("refs/tags/{}", tag), tag)
    }

    fn latest_tag(&self, _product: &Product) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Probes GitHub through the GraphQL collections of the product's
/// organization.
pub struct GraphqlProbe<'a> {
    transport: &'a dyn QueryTransport,
    templates: QueryTemplates,
}

impl<'a> GraphqlProbe<'a> {
    pub fn new(transport: &'a dyn QueryTransport, templates: QueryTemplates) -> Self {
        Self {
            transport,
            templates,
        }
    }
}

impl VersionProbe for GraphqlProbe<'_> {
    fn product_exists(&self, product: &Product) -> Result<bool> {
        let repositories =
            fetch_all::<Repositories>(self.transport, &self.templates, &product.organization, "")?;
        Ok(repositories.iter().any(|name| *name == product.name))
    }

    fn branch_exists(&self, product: &Product, branch: &str) -> Result<bool> {
        let branches = fetch_all::<Branches>(
            self.transport,
            &self.templates,
            &product.organization,
            &product.name,
        )?;
        Ok(branches.iter().any(|name| name == branch))
    }

    fn tag_exists(&self, product: &Product, tag: &str) -> Result<bool> {
        let tags = fetch_all::<Tags>(
            self.transport,
            &self.templates,
            &product.organization,
            &product.name,
        )?;
        Ok(tags.iter().any(|t| t.name == tag))
    }

    fn latest_tag(&self, product: &Product) -> Result<Option<String>> {
        let tags = fetch_all::<Tags>(
            self.transport,
            &self.templates,
            &product.organization,
            &product.name,
        )?;
        Ok(most_recent_by_date(&tags).map(|t| t.name.clone()))
    }
}

/// Probes an SVN product with `svn ls`.
pub struct SvnProbe<'a> {
    runner: &'a dyn CommandRunner,
    username: Option<String>,
}

impl<'a> SvnProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner, username: Option<String>) -> Self {
        Self { runner, username }
    }

    fn ls(&self, url: &str) -> Result<Option<String>> {
        let spec = svn_command(self.username.as_deref())
            .arg("ls")
            .arg(url);
        let output = self.runner.run(&spec)?;
        if output.success() {
            return Ok(Some(output.stdout));
        }
        if is_missing_svn_path(&output.stderr) {
            debug!("Nonexistent URL at {}", url);
            return Ok(None);
        }
        Err(Error::SvnCommand {
            command: spec.to_string(),
            url: url.to_string(),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// `svn`, with `--username` when one is configured.
pub fn svn_command(username: Option<&str>) -> CommandSpec {
    let spec = CommandSpec::new("svn");
    match username {
        Some(user) => spec.args(["--username", user]),
        None => spec,
    }
}

fn is_missing_svn_path(stderr: &str) -> bool {
    const MARKERS: &[&str] = &["E170000", "E200009", "non-existent", "doesn't exist", "path not found"];
    MARKERS.iter().any(|marker| stderr.contains(marker))
}

impl VersionProbe for SvnProbe<'_> {
    fn product_exists(&self, product: &Product) -> Result<bool> {
        info!("Contacting {}", product.remote_url);
        Ok(self.ls(&product.remote_url)?.is_some())
    }

    fn branch_exists(&self, product: &Product, branch: &str) -> Result<bool> {
        Ok(self
            .ls(&product.svn_url(&format!("branches/{}", branch)))?
            .is_some())
    }

    fn tag_exists(&self, product: &Product, tag: &str) -> Result<bool> {
        Ok(self.ls(&product.svn_url(&format!("tags/{}", tag)))?.is_some())
    }

    fn latest_tag(&self, product: &Product) -> Result<Option<String>> {
        let listing = self.ls(&product.svn_url("tags"))?.unwrap_or_default();
        Ok(latest_svn_tag(listing.lines()).map(|tag| tag.entry))
    }
}
