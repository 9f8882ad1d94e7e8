//! # External Dependencies
//!
//! A product may declare other GitHub products it needs at build time, in a
//! JSON file passed with `--external-dependencies`:
//!
//! ```json
//! {
//!   "idlutils": {
//!     "install_product": {"url": "https://github.com/sdss/idlutils", "version": "v5_5_36"},
//!     "paths": {"idl": ["pro"], "shell": ["bin"]}
//!   }
//! }
//! ```
//!
//! Each dependency is classified and fetched like a top-level product, into
//! `<root>/external/<product>/<version>`, and its declared subdirectories are
//! prepended to `PATH`, `PYTHONPATH` or `IDL_PATH`. Dependencies are handled
//! in name order.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};
use serde::Deserialize;
use url::Url;

use crate::classify::{classify, Resolution, ResolvedVersion, VersionProbe};
use crate::config::OriginKind;
use crate::error::{Error, Result};
use crate::fetch::FetchEngine;
use crate::layout::refuse_if_inside;
use crate::product::Product;

const SVN_HOST: &str = "svn.sdss.org";

/// Where and which version to fetch.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InstallProduct {
    pub url: String,
    #[serde(default)]
    pub version: String,
}

/// One declared dependency.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExternalProduct {
    pub install_product: InstallProduct,
    /// Path kind to subdirectories of the installed product.
    #[serde(default)]
    pub paths: BTreeMap<String, Vec<String>>,
}

/// Dependencies by name, iterated in sorted order.
pub type Dependencies = BTreeMap<String, ExternalProduct>;

/// Parse a dependency declaration.
pub fn parse_dependencies(json: &str) -> Result<Dependencies> {
    Ok(serde_json::from_str(json)?)
}

/// Read a dependency declaration file.
pub fn load_dependencies(path: &Path) -> Result<Dependencies> {
    let text = fs::read_to_string(path).map_err(|e| Error::Configuration {
        message: format!("unable to read {}: {}", path.display(), e),
        hint: Some("check the --external-dependencies path".to_string()),
    })?;
    parse_dependencies(&text)
}

/// Search-path variable a dependency path is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathKind {
    Shell,
    Python,
    Idl,
}

impl PathKind {
    pub fn variable(self) -> &'static str {
        match self {
            PathKind::Shell => "PATH",
            PathKind::Python => "PYTHONPATH",
            PathKind::Idl => "IDL_PATH",
        }
    }
}

impl FromStr for PathKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shell" => Ok(PathKind::Shell),
            "python" => Ok(PathKind::Python),
            "idl" => Ok(PathKind::Idl),
            other => Err(Error::Configuration {
                message: format!("unknown path kind {:?} in external dependencies", other),
                hint: Some("use one of shell, python, idl".to_string()),
            }),
        }
    }
}

/// A GitHub repository named by a dependency URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepository {
    pub organization: String,
    pub repository: String,
    pub clone_url: String,
}

/// Accept `https://github.com/<org>/<repo>[.git]` and
/// `git@github.com:<org>/<repo>[.git]`.
///
/// # Errors
///
/// `NotImplemented` for SVN-hosted dependencies; `UnsupportedDependencyUrl`
/// for anything else.
pub fn parse_dependency_url(raw: &str) -> Result<GitHubRepository> {
    let unsupported = || Error::UnsupportedDependencyUrl {
        url: raw.to_string(),
    };

    if let Some(rest) = raw.strip_prefix("git@github.com:") {
        return split_repository(rest)
            .map(|(organization, repository)| GitHubRepository {
                clone_url: format!("git@github.com:{}/{}.git", organization, repository),
                organization,
                repository,
            })
            .ok_or_else(unsupported);
    }

    let url = Url::parse(raw).map_err(|_| unsupported())?;
    match url.host_str() {
        Some("github.com") if url.scheme() == "https" => split_repository(url.path())
            .map(|(organization, repository)| GitHubRepository {
                clone_url: format!("https://github.com/{}/{}.git", organization, repository),
                organization,
                repository,
            })
            .ok_or_else(unsupported),
        Some(host) if host == SVN_HOST => Err(Error::NotImplemented {
            feature: format!(
                "SVN external dependency {}; please file a request for SVN support",
                raw
            ),
        }),
        _ => Err(unsupported()),
    }
}

fn split_repository(path: &str) -> Option<(String, String)> {
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (organization, repository) = path.split_once('/')?;
    if organization.is_empty() || repository.is_empty() || repository.contains('/') {
        return None;
    }
    Some((organization.to_string(), repository.to_string()))
}

/// Prepend `new` to a `:`-separated search path, unless already present.
pub fn prepend_path(current: Option<&str>, new: &str) -> String {
    match current.filter(|c| !c.is_empty()) {
        None => new.to_string(),
        Some(current) if current.split(':').any(|entry| entry == new) => current.to_string(),
        Some(current) => format!("{}:{}", new, current),
    }
}

/// A dependency after classification, and where it was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledDependency {
    pub name: String,
    pub version: ResolvedVersion,
    pub install_dir: PathBuf,
    pub search_paths: Vec<(PathKind, PathBuf)>,
}

/// Final values of every search path touched by `installed`.
///
/// `lookup` supplies the current value of a variable.
pub fn search_path_updates<F>(installed: &[InstalledDependency], lookup: F) -> Vec<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    let mut values: BTreeMap<&'static str, Option<String>> = BTreeMap::new();
    for dependency in installed {
        for (kind, path) in &dependency.search_paths {
            let variable = kind.variable();
            let current = values
                .entry(variable)
                .or_insert_with(|| lookup(variable));
            let updated = prepend_path(current.as_deref(), &path.display().to_string());
            *current = Some(updated);
        }
    }
    values
        .into_iter()
        .filter_map(|(variable, value)| value.map(|v| (variable, v)))
        .collect()
}

/// Set the search paths of `installed` in the process environment.
pub fn apply_search_paths(installed: &[InstalledDependency]) {
    for (variable, value) in search_path_updates(installed, |name| env::var(name).ok()) {
        debug!("{}={}", variable, value);
        env::set_var(variable, value);
    }
}

/// A dependency whose URL and path kinds have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDependency<'d> {
    pub name: &'d str,
    pub version: &'d str,
    pub repository: GitHubRepository,
    pub kinds: Vec<(PathKind, &'d [String])>,
}

/// Check the URL and path kinds of every dependency.
///
/// Nothing is classified or fetched, so a bad declaration fails before any
/// remote call.
pub fn prepare_dependencies(dependencies: &Dependencies) -> Result<Vec<PreparedDependency<'_>>> {
    let mut prepared = Vec::with_capacity(dependencies.len());
    for (name, dependency) in dependencies {
        let repository = parse_dependency_url(&dependency.install_product.url)?;
        let mut kinds = Vec::with_capacity(dependency.paths.len());
        for (kind, subpaths) in &dependency.paths {
            kinds.push((kind.parse::<PathKind>()?, subpaths.as_slice()));
        }
        prepared.push(PreparedDependency {
            name,
            version: &dependency.install_product.version,
            repository,
            kinds,
        });
    }
    Ok(prepared)
}

/// Installs declared dependencies below `<root>/external`.
pub struct ExternalDependencyResolver<'a> {
    probe: &'a dyn VersionProbe,
    fetcher: FetchEngine<'a>,
    root: PathBuf,
    test: bool,
}

impl<'a> ExternalDependencyResolver<'a> {
    pub fn new(
        probe: &'a dyn VersionProbe,
        fetcher: FetchEngine<'a>,
        root: impl Into<PathBuf>,
        test: bool,
    ) -> Self {
        Self {
            probe,
            fetcher,
            root: root.into(),
            test,
        }
    }

    /// Directory a dependency version is installed into.
    pub fn install_dir(&self, repository: &str, version: &str) -> PathBuf {
        self.root.join("external").join(repository).join(version)
    }

    /// Classify and fetch every prepared dependency.
    pub fn resolve(
        &self,
        prepared: &[PreparedDependency<'_>],
        cwd: &Path,
    ) -> Result<Vec<InstalledDependency>> {
        let mut installed = Vec::with_capacity(prepared.len());
        for dependency in prepared {
            let name = dependency.name;
            let repository = &dependency.repository;
            let product = dependency_product(repository, dependency.version);
            let version = match classify(self.probe, &product)? {
                Resolution::Resolved(version) => version,
                Resolution::Describe(version) => {
                    warn!(
                        "No version given for external dependency {}; using {}",
                        name, version.name
                    );
                    version
                }
            };

            let install_dir = self.install_dir(&repository.repository, &version.name);
            self.fetch(&product, &version, &install_dir, cwd)?;

            let dir = &install_dir;
            let search_paths = dependency
                .kinds
                .iter()
                .flat_map(|&(kind, subpaths)| subpaths.iter().map(move |sub| (kind, dir.join(sub))))
                .collect();
            installed.push(InstalledDependency {
                name: name.to_string(),
                version,
                install_dir,
                search_paths,
            });
        }
        Ok(installed)
    }

    fn fetch(
        &self,
        product: &Product,
        version: &ResolvedVersion,
        install_dir: &Path,
        cwd: &Path,
    ) -> Result<()> {
        if install_dir.exists() {
            refuse_if_inside(cwd, install_dir)?;
            if self.test {
                info!("Test mode: would replace {}", install_dir.display());
                return Ok(());
            }
            fs::remove_dir_all(install_dir)?;
        }
        if self.test {
            info!(
                "Test mode: would install {} {} into {}",
                product.name,
                version.name,
                install_dir.display()
            );
            return Ok(());
        }
        if let Some(parent) = install_dir.parent() {
            fs::create_dir_all(parent)?;
        }
        info!(
            "Installing external dependency {} {} into {}",
            product.name,
            version.name,
            install_dir.display()
        );
        self.fetcher.fetch_github(product, version, install_dir)
    }
}

fn dependency_product(repository: &GitHubRepository, version: &str) -> Product {
    let version = version.trim();
    Product {
        name: repository.repository.clone(),
        path: repository.repository.clone(),
        requested_version: (!version.is_empty()).then(|| version.to_string()),
        origin: OriginKind::GitHub,
        organization: repository.organization.clone(),
        remote_url: repository.clone_url.clone(),
    }
}
