use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;

use crate::error::{TransportStage, UpdateError};
use crate::release::PackageFormats;
use crate::status::{UpdateStatus, read_update_status, write_update_status};
use crate::store::KeyValueStore;

/// Downloads an artifact to a caller-chosen path.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), UpdateError>;
}

/// Hands a downloaded artifact to the host's default handler.
pub trait InstallTrigger: Send + Sync {
    /// # Errors
    /// Returns [`UpdateError::InstallTriggerFailed`] when the handoff fails.
    fn open(&self, path: &Path) -> Result<(), UpdateError>;
}

pub struct HttpArtifactFetcher {
    client: reqwest::Client,
}

impl HttpArtifactFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), UpdateError> {
        const OPERATION: &str = "download update";

        let response = self.client.get(url).send().await.map_err(|error| {
            UpdateError::transport(OPERATION, url, TransportStage::Request, error.to_string())
        })?;

        if !response.status().is_success() {
            return Err(UpdateError::transport(
                OPERATION,
                url,
                TransportStage::Status,
                format!("HTTP {}", response.status()),
            ));
        }

        let downloaded = save_stream(response.bytes_stream(), url, dest).await?;
        info!("Download complete: {downloaded} bytes");
        Ok(())
    }
}

/// Writes `stream` to `dest`, removing the partial file when any chunk or
/// write fails.
async fn save_stream<S, B, E>(mut stream: S, url: &str, dest: &Path) -> Result<u64, UpdateError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let result = write_stream(&mut stream, url, dest).await;
    if result.is_err()
        && let Err(error) = tokio::fs::remove_file(dest).await
        && error.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove partial download {}: {error}", dest.display());
    }
    result
}

async fn write_stream<S, B, E>(stream: &mut S, url: &str, dest: &Path) -> Result<u64, UpdateError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let mut file = tokio::fs::File::create(dest).await.map_err(|error| {
        UpdateError::io_with_path("failed to create download file", dest, &error)
    })?;

    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|error| {
            UpdateError::transport("download update", url, TransportStage::Body, error.to_string())
        })?;
        let chunk = chunk.as_ref();
        file.write_all(chunk).await.map_err(|error| {
            UpdateError::io_with_path("failed to write download data", dest, &error)
        })?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await.map_err(|error| {
        UpdateError::io_with_path("failed to flush download file", dest, &error)
    })?;
    Ok(downloaded)
}

/// Opens artifacts with the operating system's default application.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl InstallTrigger for SystemOpener {
    fn open(&self, path: &Path) -> Result<(), UpdateError> {
        open::that(path).map_err(|error| UpdateError::install_trigger_failed(path, error.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { version: String },
    NothingToInstall,
}

/// Install the update recorded by the last check, if any.
///
/// The status is reset only after the artifact was handed off, so a failed
/// download or handoff can be retried.
///
/// # Errors
/// Returns an error when the stored URL is not an installable package, or
/// when downloading, opening, or updating the status fails.
pub async fn install_update(
    store: &dyn KeyValueStore,
    fetcher: &dyn ArtifactFetcher,
    trigger: &dyn InstallTrigger,
    formats: &PackageFormats,
    download_dir: &Path,
) -> Result<InstallOutcome, UpdateError> {
    let UpdateStatus::Available {
        version,
        download_url,
    } = read_update_status(store)?
    else {
        info!("No update available");
        return Ok(InstallOutcome::NothingToInstall);
    };

    let local_path = artifact_path(&download_url, formats, download_dir)?;
    std::fs::create_dir_all(download_dir).map_err(|error| {
        UpdateError::io_with_path("failed to create download directory", download_dir, &error)
    })?;

    debug!(
        "Downloading updated workflow from `{download_url}` to `{}` ...",
        local_path.display()
    );
    fetcher.fetch(&download_url, &local_path).await?;

    info!("Installing updated workflow {version} ...");
    trigger.open(&local_path)?;

    write_update_status(store, &UpdateStatus::NotAvailable)?;
    Ok(InstallOutcome::Installed { version })
}

fn artifact_path(
    download_url: &str,
    formats: &PackageFormats,
    download_dir: &Path,
) -> Result<PathBuf, UpdateError> {
    let invalid = || UpdateError::InvalidArtifact {
        url: download_url.to_string(),
    };

    let raw_name = download_url.rsplit('/').next().ok_or_else(invalid)?;
    let file_name = Path::new(raw_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty() && !name.contains(".."))
        .ok_or_else(invalid)?;

    if formats.classify_url(file_name).is_none() {
        return Err(invalid());
    }

    Ok(download_dir.join(file_name))
}
