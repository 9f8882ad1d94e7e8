//! # Directory Planning
//!
//! Every install run works with three directories, computed once by
//! [`DirectoryPlan::new`]:
//!
//! - `root`: the install root plus its repository-type segment (`github` or
//!   `svn`), or the `SDSS_GIT_ROOT`/`SDSS_SVN_ROOT` override. Long-path mode
//!   appends the product's parent path.
//! - `install`: `root/<name>/<version>`. GitHub products may drop the version
//!   segment with `--skip-git-verdirs`; SVN products always keep it.
//! - `work`: where the fetch lands, `<cwd>/<name>-<version>`, or `install`
//!   itself in module-only mode.
//!
//! Deleting an existing install is guarded: it is refused when the current
//! directory is inside the install directory, or when the work and install
//! directories overlap.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::classify::ResolvedVersion;
use crate::config::{
    Environment, InstallOptions, OriginKind, ENV_INSTALL_DIR, ENV_LONGPATH, ENV_PRODUCT_ROOT,
    ENV_WORKING_DIR,
};
use crate::error::{Error, Result};
use crate::product::Product;

/// The directories of one install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPlan {
    /// Directory the run started in.
    pub original: PathBuf,
    pub root: PathBuf,
    pub install: PathBuf,
    pub work: PathBuf,
}

impl DirectoryPlan {
    /// Compute the plan for `product` at `version`.
    ///
    /// # Errors
    ///
    /// `Configuration` when neither an install root nor a per-origin root
    /// override is configured.
    pub fn new(
        product: &Product,
        version: &ResolvedVersion,
        options: &InstallOptions,
        environment: &Environment,
        cwd: &Path,
    ) -> Result<Self> {
        let root = install_root(product, options, environment)?;
        let version_dir = product.version_dir(&version.name);
        let mut install = root.join(&product.name);
        if !(options.skip_version_dirs && product.origin == OriginKind::GitHub) {
            install.push(version_dir);
        }

        let work = if options.module_only {
            install.clone()
        } else {
            cwd.join(format!("{}-{}", product.name, version_dir))
        };

        let plan = Self {
            original: cwd.to_path_buf(),
            root,
            install,
            work,
        };
        debug!("{:?}", plan);
        Ok(plan)
    }

    /// Create the root directory if needed.
    ///
    /// # Errors
    ///
    /// `Configuration` when the root exists but is not a directory, or cannot
    /// be created.
    pub fn prepare_root(&self) -> Result<()> {
        check_root(&self.root)?;
        if self.root.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.root).map_err(|e| Error::Configuration {
            message: format!("unable to create {}: {}", self.root.display(), e),
            hint: Some(root_hint()),
        })?;
        info!("Creating {}", self.root.display());
        Ok(())
    }

    /// Refuse to continue if deleting `install` would pull the ground out
    /// from under `cwd` or the work directory.
    ///
    /// # Errors
    ///
    /// `DirectorySafety` when `cwd` is inside `install`; `Configuration` when
    /// `work` and `install` overlap.
    pub fn guard(&self, cwd: &Path) -> Result<()> {
        refuse_if_inside(cwd, &self.install)?;
        let install = resolved(&self.install);
        let work = resolved(&self.work);
        if work.starts_with(&install) || install.starts_with(&work) {
            return Err(Error::Configuration {
                message: format!(
                    "work directory {} overlaps install directory {}",
                    work.display(),
                    install.display()
                ),
                hint: Some("run from a directory outside the install root".to_string()),
            });
        }
        Ok(())
    }

    /// Remove a work directory left behind by an earlier run.
    pub fn clear_stale_work(&self) -> Result<()> {
        if self.work != self.install && self.work.exists() {
            info!("Removing existing working directory {}", self.work.display());
            fs::remove_dir_all(&self.work)?;
        }
        Ok(())
    }

    /// Handle an existing install directory before fetching.
    ///
    /// Without `force` an existing install is an error. With `force` the
    /// directory is guarded and then removed unless this is a dry run.
    pub fn clean_install(&self, cwd: &Path, force: bool, test: bool) -> Result<()> {
        if !self.install.exists() {
            return Ok(());
        }
        if !force {
            return Err(Error::InstallExists {
                install: self.install.clone(),
            });
        }
        self.guard(cwd)?;
        if test {
            info!("Test mode: would remove {}", self.install.display());
        } else {
            info!("Preparing to overwrite {}", self.install.display());
            fs::remove_dir_all(&self.install)?;
        }
        Ok(())
    }

    /// Variables exported to child build steps.
    pub fn exported_variables(&self, options: &InstallOptions) -> Vec<(&'static str, String)> {
        let mut variables = Vec::new();
        if let Some(root) = &options.root {
            variables.push((ENV_PRODUCT_ROOT, root.display().to_string()));
        }
        if options.longpath {
            variables.push((ENV_LONGPATH, "True".to_string()));
        }
        variables.push((ENV_WORKING_DIR, self.work.display().to_string()));
        variables.push((ENV_INSTALL_DIR, self.install.display().to_string()));
        variables
    }
}

/// The install root of `product`, without touching the filesystem.
///
/// # Errors
///
/// `Configuration` when neither an install root nor a per-origin root
/// override is configured.
pub fn install_root(
    product: &Product,
    options: &InstallOptions,
    environment: &Environment,
) -> Result<PathBuf> {
    let mut root = match (environment.origin_root(product.origin), &options.root) {
        (Some(origin_root), _) => origin_root.clone(),
        (None, Some(install_root)) => install_root.join(product.origin.root_segment()),
        (None, None) => return Err(missing_root()),
    };
    if options.longpath {
        if let Some(parent) = product.parent_path() {
            root.push(parent);
        }
    }
    Ok(root)
}

/// Fail when `root`, or the nearest existing directory above it, is not a
/// directory.
pub fn check_root(root: &Path) -> Result<()> {
    match root.ancestors().find(|path| path.exists()) {
        Some(existing) if !existing.is_dir() => Err(Error::Configuration {
            message: format!("{} exists but is not a directory", existing.display()),
            hint: Some(root_hint()),
        }),
        _ => Ok(()),
    }
}

fn root_hint() -> String {
    format!("set a valid --root or {}", ENV_PRODUCT_ROOT)
}

fn missing_root() -> Error {
    Error::Configuration {
        message: "no install root is configured".to_string(),
        hint: Some(root_hint()),
    }
}

/// Fail with `DirectorySafety` if `cwd` is `dir` or lies below it.
pub fn refuse_if_inside(cwd: &Path, dir: &Path) -> Result<()> {
    let install = resolved(dir);
    let cwd = resolved(cwd);
    if cwd.starts_with(&install) {
        return Err(Error::DirectorySafety { cwd, install });
    }
    Ok(())
}

/// Canonical form when the path exists, otherwise the path as given.
fn resolved(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
