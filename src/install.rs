//! # Install Pipeline
//!
//! [`Installer::run`] drives one install from start to finish:
//!
//! 1. Resolve the product, check the install root and dependency
//!    declarations, and classify the version against the remote.
//! 2. Plan the root, install and work directories.
//! 3. Guard and clear any previous install and work directories.
//! 4. Fetch into the work directory, resolving a bootstrap tag if needed.
//! 5. Install external dependencies and expose their search paths.
//! 6. Export the directory variables for the build stage.
//! 7. Stage the work tree into the install directory.
//!
//! Each step returns a `Result`; the first failure ends the run. Dry runs
//! (`--test`) resolve and validate everything but leave the filesystem alone.

use std::env;
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::classify::{
    classify, describe_latest_tag, GitRemoteProbe, GraphqlProbe, Resolution, ResolvedVersion,
    SvnProbe, VersionProbe,
};
use crate::client::{ApiClient, ApiKind, QueryTransport};
use crate::config::{
    Environment, InstallOptions, OriginKind, QueryApi, DEFAULT_GRAPHQL_ENDPOINT,
};
use crate::error::Result;
use crate::external::{
    apply_search_paths, load_dependencies, prepare_dependencies, ExternalDependencyResolver,
    InstalledDependency,
};
use crate::fetch::{FetchEngine, SvnMode};
use crate::layout::{check_root, install_root, DirectoryPlan};
use crate::process::CommandRunner;
use crate::product::Product;
use crate::query::QueryTemplates;
use crate::stage::stage;

/// Settings for SVN-hosted products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvnOrigin {
    pub url: String,
    pub public: bool,
    /// Sent as `--username`; never set for public access.
    pub username: Option<String>,
}

/// Settings for GitHub-hosted products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubOrigin {
    pub organization: String,
    pub https: bool,
    pub github_url: Option<String>,
    pub query_api: QueryApi,
}

/// Where the product comes from, chosen once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Svn(SvnOrigin),
    GitHub(GitHubOrigin),
}

impl Origin {
    pub fn from_options(options: &InstallOptions) -> Self {
        match options.origin {
            OriginKind::Svn => Origin::Svn(SvnOrigin {
                url: options.svn_url.clone(),
                public: options.public,
                username: options.username.clone().filter(|_| !options.public),
            }),
            OriginKind::GitHub => Origin::GitHub(GitHubOrigin {
                organization: options.organization.clone(),
                https: options.https,
                github_url: options.github_url.clone(),
                query_api: options.query_api,
            }),
        }
    }

    pub fn kind(&self) -> OriginKind {
        match self {
            Origin::Svn(_) => OriginKind::Svn,
            Origin::GitHub(_) => OriginKind::GitHub,
        }
    }
}

/// Whether GitHub lookups should go through GraphQL.
pub fn uses_graphql(query_api: QueryApi, environment: &Environment) -> bool {
    match query_api {
        QueryApi::Auto => environment.credentials.graphql_token.is_some(),
        QueryApi::Git => false,
        QueryApi::Graphql => true,
    }
}

/// Build the GraphQL client when GitHub lookups need one.
///
/// # Errors
///
/// `MissingCredential` when GraphQL was explicitly requested without a token.
pub fn graphql_client(
    options: &InstallOptions,
    environment: &Environment,
) -> Result<Option<ApiClient>> {
    let queries_github =
        options.origin == OriginKind::GitHub || options.external_dependencies.is_some();
    if !queries_github || !uses_graphql(options.query_api, environment) {
        return Ok(None);
    }
    ApiClient::new(
        ApiKind::Graphql,
        DEFAULT_GRAPHQL_ENDPOINT,
        &environment.credentials,
        options.http_timeout,
    )
    .map(Some)
}

/// What an install run did.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub product: String,
    pub version: String,
    pub resolved: ResolvedVersion,
    pub plan: DirectoryPlan,
    pub dependencies: Vec<InstalledDependency>,
    pub test: bool,
}

/// The final status line of a run.
pub fn status_line(success: bool, test: bool, skip_module: bool) -> String {
    let mut line = match (test, success) {
        (false, true) => "Done!".to_string(),
        (false, false) => "Fail!".to_string(),
        (true, true) => "Test Done".to_string(),
        (true, false) => "Test Fail".to_string(),
    };
    if skip_module {
        line.push_str(" (skipped modules)");
    }
    line
}

/// Runs one install.
pub struct Installer<'a> {
    options: &'a InstallOptions,
    environment: &'a Environment,
    runner: &'a dyn CommandRunner,
    transport: Option<&'a dyn QueryTransport>,
}

impl<'a> Installer<'a> {
    pub fn new(
        options: &'a InstallOptions,
        environment: &'a Environment,
        runner: &'a dyn CommandRunner,
        transport: Option<&'a dyn QueryTransport>,
    ) -> Self {
        Self {
            options,
            environment,
            runner,
            transport,
        }
    }

    /// Install from the process's current directory.
    pub fn run(&self) -> Result<InstallReport> {
        let cwd = env::current_dir()?;
        self.run_in(&cwd)
    }

    /// Install with `cwd` as the starting directory.
    pub fn run_in(&self, cwd: &Path) -> Result<InstallReport> {
        let options = self.options;
        let origin = Origin::from_options(options);
        let product = Product::from_options(options)?;
        check_root(&install_root(&product, options, self.environment)?)?;
        let dependencies = options
            .external_dependencies
            .as_deref()
            .map(load_dependencies)
            .transpose()?;
        let prepared = dependencies
            .as_ref()
            .map(prepare_dependencies)
            .transpose()?;

        let templates = QueryTemplates::new(self.environment.graphql_dir.clone());
        let github_probe = self.github_probe(templates);
        let svn_probe;
        let probe: &dyn VersionProbe = match &origin {
            Origin::Svn(svn) => {
                svn_probe = SvnProbe::new(self.runner, svn.username.clone());
                &svn_probe
            }
            Origin::GitHub(_) => github_probe.as_ref(),
        };

        let resolution = classify(probe, &product)?;
        let mut version = resolution.version().clone();
        info!(
            "Installing {} {} ({:?})",
            product.name, version.name, version.classification
        );

        let mut plan = DirectoryPlan::new(&product, &version, options, self.environment, cwd)?;
        if options.test {
            info!("Test mode: using root {}", plan.root.display());
        } else {
            plan.prepare_root()?;
        }

        let fetcher = FetchEngine::new(self.runner);
        let fetching = !options.test && !options.module_only;
        // A bootstrap install directory is only known once the tag is.
        let provisional = matches!(resolution, Resolution::Describe(_));
        if !options.module_only {
            if !provisional && options.force && plan.install.exists() {
                plan.guard(cwd)?;
            }
            if !options.test {
                plan.clear_stale_work()?;
            }
            if !provisional {
                plan.clean_install(cwd, options.force, options.test)?;
            }
        }

        if fetching {
            match &origin {
                Origin::GitHub(_) => fetcher.fetch_github(&product, &version, &plan.work)?,
                Origin::Svn(svn) => fetcher.fetch_svn(
                    &product,
                    &version,
                    &plan.work,
                    SvnMode::for_version(&version, svn.public),
                    svn.username.as_deref(),
                )?,
            }
        }

        if let Resolution::Describe(_) = resolution {
            if fetching {
                if let Some(tag) = describe_latest_tag(self.runner, &plan.work)? {
                    let tagged = ResolvedVersion::tag(&tag);
                    let retagged =
                        DirectoryPlan::new(&product, &tagged, options, self.environment, cwd)?;
                    retagged.clear_stale_work()?;
                    info!(
                        "Renaming {} to {}",
                        plan.work.display(),
                        retagged.work.display()
                    );
                    fs::rename(&plan.work, &retagged.work)?;
                    clean_fetched_install(&retagged, cwd, options)?;
                    fetcher.pin_tag(&retagged.work, &tag, &product.remote_url)?;
                    plan = retagged;
                    version = tagged;
                } else {
                    warn!(
                        "No release tag found for {}; installing {}",
                        product.name, version.name
                    );
                    clean_fetched_install(&plan, cwd, options)?;
                }
            } else {
                info!(
                    "Test mode: bootstrap tag of {} is resolved after fetching",
                    product.name
                );
            }
        }

        let mut installed = Vec::new();
        if let Some(prepared) = &prepared {
            let resolver = ExternalDependencyResolver::new(
                github_probe.as_ref(),
                FetchEngine::new(self.runner),
                &plan.root,
                options.test,
            );
            installed = resolver.resolve(prepared, cwd)?;
            apply_search_paths(&installed);
        }

        for (variable, value) in plan.exported_variables(options) {
            env::set_var(variable, value);
        }

        if fetching {
            stage(&plan.work, &plan.install, options.keep)?;
        }

        Ok(InstallReport {
            product: product.name,
            version: version.name.clone(),
            resolved: version,
            plan,
            dependencies: installed,
            test: options.test,
        })
    }

    fn github_probe(&self, templates: QueryTemplates) -> Box<dyn VersionProbe + 'a> {
        match self.transport {
            Some(transport) => Box::new(GraphqlProbe::new(transport, templates)),
            None => Box::new(GitRemoteProbe::new(self.runner)),
        }
    }
}

/// Handle an existing install once the fetched work tree is in place.
///
/// The work tree is removed when the install may not be replaced.
fn clean_fetched_install(plan: &DirectoryPlan, cwd: &Path, options: &InstallOptions) -> Result<()> {
    let cleaned = plan.clean_install(cwd, options.force, options.test);
    if cleaned.is_err() {
        if let Err(e) = fs::remove_dir_all(&plan.work) {
            warn!("Unable to remove {}: {}", plan.work.display(), e);
        }
    }
    cleaned
}
