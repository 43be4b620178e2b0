use std::time::Duration;

use clap::{Parser, Subcommand};
use log::info;
use relgate_core::{
    CachedReleaseSource, CheckOutcome, CheckRequest, DiskStore, GitHubReleaseSource,
    HttpArtifactFetcher, InstallOutcome, SemanticVersion, SystemOpener, UpdateError,
    UpdateStatus, check_for_update, install_update, read_update_status,
};
use relgate_platform::AppPaths;

use crate::host;
use crate::settings::AppSettings;

#[derive(Debug, Parser)]
#[command(name = "relgate", version, about = "Check for and install workflow updates")]
pub struct Cli {
    /// Write debug-level messages to the log
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look for a release newer than the installed version and remember it
    Check {
        /// Repository slug, e.g. `owner/name`
        repository: String,
        /// Currently installed version
        installed_version: String,
        /// Consider prereleases as update candidates
        #[arg(long)]
        prereleases: bool,
        /// Ignore the cached release list
        #[arg(long)]
        force_refresh: bool,
        /// Treat the host as able to install extended packages
        #[arg(long)]
        extended_format: bool,
    },
    /// Download and open the update found by the last check
    Install,
    /// Show the result of the last check
    Status,
}

/// Everything a command needs from the environment.
pub struct Context {
    pub paths: AppPaths,
    pub settings: AppSettings,
    pub client: reqwest::Client,
}

impl Context {
    pub fn new(paths: AppPaths, settings: AppSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .user_agent(format!("relgate/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            paths,
            settings,
            client,
        }
    }

    fn store(&self) -> DiskStore {
        DiskStore::new(self.paths.store_dir())
    }
}

impl Command {
    /// Run the command and describe its outcome in one line.
    ///
    /// # Errors
    /// Returns the failure of the underlying check or install step.
    pub async fn execute(self, context: &Context) -> Result<String, UpdateError> {
        match self {
            Self::Check {
                repository,
                installed_version,
                prereleases,
                force_refresh,
                extended_format,
            } => {
                let request = CheckRequest {
                    repository,
                    installed_version: installed_version.parse::<SemanticVersion>()?,
                    include_prereleases: prereleases,
                    host: host::detect(extended_format),
                    formats: context.settings.package_formats(),
                };
                run_check(context, &request, force_refresh).await
            }
            Self::Install => run_install(context).await,
            Self::Status => run_status(context),
        }
    }
}

async fn run_check(
    context: &Context,
    request: &CheckRequest,
    force_refresh: bool,
) -> Result<String, UpdateError> {
    let store = context.store();
    let source = CachedReleaseSource::new(
        GitHubReleaseSource::with_api_base(
            context.client.clone(),
            context.settings.api_base_url.clone(),
        ),
        &store,
        Duration::from_secs(context.settings.release_cache_ttl_secs),
    )
    .force_refresh(force_refresh);

    info!(
        "Checking {} for updates (installed {}, prereleases: {}, extended format: {})",
        request.repository,
        request.installed_version,
        request.include_prereleases,
        request.host.extended_format
    );

    Ok(match check_for_update(&source, &store, request).await? {
        CheckOutcome::UpdateAvailable { version, .. } => format!("Update available: {version}"),
        CheckOutcome::UpToDate => "Up to date".to_string(),
    })
}

async fn run_install(context: &Context) -> Result<String, UpdateError> {
    let outcome = install_update(
        &context.store(),
        &HttpArtifactFetcher::new(context.client.clone()),
        &SystemOpener,
        &context.settings.package_formats(),
        &context.paths.download_dir(),
    )
    .await?;

    Ok(match outcome {
        InstallOutcome::Installed { version } => format!("Installed update {version}"),
        InstallOutcome::NothingToInstall => "No update to install".to_string(),
    })
}

fn run_status(context: &Context) -> Result<String, UpdateError> {
    Ok(match read_update_status(&context.store())? {
        UpdateStatus::Available {
            version,
            download_url,
        } => format!("Update available: {version} ({download_url})"),
        UpdateStatus::NotAvailable => "No update available".to_string(),
    })
}
