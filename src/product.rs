//! # Products
//!
//! A [`Product`] is the install target named on the command line, normalized
//! for its origin:
//!
//! - SVN product paths live under one of the top-level trees `repo`, `data`
//!   or `deprecated`; a bare path such as `sdss/transfer` becomes
//!   `repo/sdss/transfer`.
//! - GitHub products are repository names within an organization.
//!
//! The product's name is always the last path segment, and the version
//! directory is the last segment of the requested version, so
//! `branches/test_branch` installs into `test_branch`.

use crate::config::{InstallOptions, OriginKind, BOOTSTRAP_PRODUCT};
use crate::error::{Error, Result};

const SVN_ROOTS: &[&str] = &["repo", "data", "deprecated"];

/// Bootstrap product path within the SVN tree.
pub const SVN_BOOTSTRAP_PRODUCT: &str = "sdss/sdss_install";

/// A product to install, with the location it is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Last segment of `path`.
    pub name: String,
    /// SVN path below the server root, or the GitHub repository name.
    pub path: String,
    /// Version as requested. `None` asks for bootstrap resolution.
    pub requested_version: Option<String>,
    pub origin: OriginKind,
    /// GitHub organization owning the repository.
    pub organization: String,
    /// SVN product URL, or the GitHub clone URL.
    pub remote_url: String,
}

impl Product {
    /// Build the product from the user's options.
    ///
    /// # Errors
    ///
    /// `Configuration` when no product (or no version outside bootstrap mode)
    /// was given.
    pub fn from_options(options: &InstallOptions) -> Result<Self> {
        let origin = options.origin;
        let raw = match options.product.as_deref().map(str::trim) {
            Some(product) if !product.is_empty() => product.to_string(),
            _ if options.bootstrap => match origin {
                OriginKind::GitHub => BOOTSTRAP_PRODUCT.to_string(),
                OriginKind::Svn => SVN_BOOTSTRAP_PRODUCT.to_string(),
            },
            _ => return Err(missing_product()),
        };

        let requested_version = options
            .version
            .as_deref()
            .map(|v| v.trim().trim_end_matches('/'))
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        if requested_version.is_none() && !options.bootstrap {
            return Err(missing_product());
        }

        let path = match origin {
            OriginKind::Svn => svn_product_path(&raw),
            OriginKind::GitHub => raw.trim_matches('/').to_string(),
        };
        let name = last_segment(&path).to_string();
        let remote_url = match origin {
            OriginKind::Svn => svn_product_url(options, &path),
            OriginKind::GitHub => github_remote_url(options, &name),
        };

        Ok(Self {
            name,
            path,
            requested_version,
            origin,
            organization: options.organization.clone(),
            remote_url,
        })
    }

    /// Directory name used for this version.
    pub fn version_dir<'a>(&self, version: &'a str) -> &'a str {
        last_segment(version)
    }

    /// Parent of the product path, used as the long-path segment.
    pub fn parent_path(&self) -> Option<&str> {
        self.path
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .filter(|parent| !parent.is_empty())
    }

    /// URL of a path within an SVN product, such as `tags/v1_0_0`.
    pub fn svn_url(&self, subpath: &str) -> String {
        format!("{}/{}", self.remote_url, subpath.trim_matches('/'))
    }
}

fn missing_product() -> Error {
    Error::Configuration {
        message: "You must specify a product and the version (after a space)!".to_string(),
        hint: Some("use --bootstrap to install the most recent sdss_install".to_string()),
    }
}

fn last_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Prefix `repo/` unless the path already starts with a known SVN tree.
pub fn svn_product_path(product: &str) -> String {
    let product = product.trim_matches('/');
    if SVN_ROOTS.iter().any(|root| product.starts_with(root)) {
        product.to_string()
    } else {
        format!("repo/{}", product)
    }
}

/// `<url>[/public]/<path>`.
pub fn svn_product_url(options: &InstallOptions, path: &str) -> String {
    let base = options.svn_url.trim_end_matches('/');
    if options.public {
        format!("{}/public/{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Clone URL for a repository of the configured organization.
pub fn github_remote_url(options: &InstallOptions, name: &str) -> String {
    match &options.github_url {
        Some(base) => format!("{}/{}.git", base.trim_end_matches('/'), name),
        None if options.https => {
            format!("https://github.com/{}/{}.git", options.organization, name)
        }
        None => format!("git@github.com:{}/{}.git", options.organization, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(origin: OriginKind, product: Option<&str>, version: Option<&str>) -> InstallOptions {
        InstallOptions {
            product: product.map(str::to_string),
            version: version.map(str::to_string),
            origin,
            ..InstallOptions::default()
        }
    }

    #[test]
    fn test_github_product_defaults_to_ssh_url() {
        let product =
            Product::from_options(&options(OriginKind::GitHub, Some("sdssdb"), Some("master")))
                .unwrap();
        assert_eq!(product.name, "sdssdb");
        assert_eq!(product.remote_url, "git@github.com:sdss/sdssdb.git");
        assert_eq!(product.requested_version.as_deref(), Some("master"));
        assert_eq!(product.parent_path(), None);
    }

    #[test]
    fn test_github_https_and_override_urls() {
        let mut opts = options(OriginKind::GitHub, Some("sdssdb"), Some("master"));
        opts.https = true;
        assert_eq!(
            Product::from_options(&opts).unwrap().remote_url,
            "https://github.com/sdss/sdssdb.git"
        );

        opts.github_url = Some("/tmp/remotes/".to_string());
        assert_eq!(
            Product::from_options(&opts).unwrap().remote_url,
            "/tmp/remotes/sdssdb.git"
        );
    }

    #[test]
    fn test_svn_product_gets_repo_prefix() {
        let product =
            Product::from_options(&options(OriginKind::Svn, Some("sdss/transfer/"), Some("trunk")))
                .unwrap();
        assert_eq!(product.path, "repo/sdss/transfer");
        assert_eq!(product.name, "transfer");
        assert_eq!(product.remote_url, "https://svn.sdss.org/repo/sdss/transfer");
        assert_eq!(product.parent_path(), Some("repo/sdss"));
    }

    #[test]
    fn test_svn_known_roots_are_kept() {
        assert_eq!(svn_product_path("data/sdss/platelist"), "data/sdss/platelist");
        assert_eq!(svn_product_path("deprecated/old"), "deprecated/old");
        assert_eq!(svn_product_path("sdss/tree"), "repo/sdss/tree");
    }

    #[test]
    fn test_svn_public_url() {
        let mut opts = options(OriginKind::Svn, Some("sdss/tree"), Some("trunk"));
        opts.public = true;
        let product = Product::from_options(&opts).unwrap();
        assert_eq!(product.remote_url, "https://svn.sdss.org/public/repo/sdss/tree");
        assert_eq!(
            product.svn_url("tags/v1_0_0/"),
            "https://svn.sdss.org/public/repo/sdss/tree/tags/v1_0_0"
        );
    }

    #[test]
    fn test_version_dir_is_last_segment() {
        let product =
            Product::from_options(&options(OriginKind::Svn, Some("sdss/tree"), Some("branches/dev/")))
                .unwrap();
        assert_eq!(product.requested_version.as_deref(), Some("branches/dev"));
        assert_eq!(product.version_dir("branches/dev"), "dev");
        assert_eq!(product.version_dir("trunk"), "trunk");
    }

    #[test]
    fn test_missing_product_or_version_is_configuration_error() {
        let result = Product::from_options(&options(OriginKind::GitHub, None, Some("master")));
        assert!(matches!(result, Err(Error::Configuration { .. })));

        let result = Product::from_options(&options(OriginKind::GitHub, Some("sdssdb"), None));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_bootstrap_default_products() {
        let mut opts = options(OriginKind::GitHub, None, None);
        opts.bootstrap = true;
        let product = Product::from_options(&opts).unwrap();
        assert_eq!(product.name, "sdss_install");
        assert!(product.requested_version.is_none());

        opts.origin = OriginKind::Svn;
        let product = Product::from_options(&opts).unwrap();
        assert_eq!(product.path, "repo/sdss/sdss_install");
    }
}
