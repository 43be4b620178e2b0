use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::error::{TransportStage, UpdateError};
use crate::release::{Asset, Release};
use crate::repository::RepositoryId;
use crate::store::KeyValueStore;

pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Supplies the published releases of a repository, newest first.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn fetch_releases(&self, repository: &RepositoryId) -> Result<Vec<Release>, UpdateError>;
}

#[async_trait]
impl<T: ReleaseSource + ?Sized> ReleaseSource for &T {
    async fn fetch_releases(&self, repository: &RepositoryId) -> Result<Vec<Release>, UpdateError> {
        (**self).fetch_releases(repository).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAsset {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub browser_download_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

impl From<GitHubRelease> for Release {
    fn from(release: GitHubRelease) -> Self {
        let assets = release
            .assets
            .into_iter()
            .filter_map(|asset| match asset.browser_download_url {
                Some(url) if !url.is_empty() => Some(Asset::new(url)),
                _ => {
                    debug!("Skipping asset `{}` without download URL", asset.name);
                    None
                }
            })
            .collect();

        Self {
            tag: release.tag_name,
            prerelease: release.prerelease,
            assets,
        }
    }
}

pub struct GitHubReleaseSource {
    client: reqwest::Client,
    api_base: String,
}

impl GitHubReleaseSource {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_api_base(client, GITHUB_API_BASE)
    }

    pub fn with_api_base(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn releases_url(&self, repository: &RepositoryId) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_base,
            repository.owner(),
            repository.name()
        )
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleaseSource {
    async fn fetch_releases(&self, repository: &RepositoryId) -> Result<Vec<Release>, UpdateError> {
        const OPERATION: &str = "fetch releases";
        let url = self.releases_url(repository);
        info!("Retrieving releases for `{repository}` ...");

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "relgate")
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|error| {
                UpdateError::transport(OPERATION, &url, TransportStage::Request, error.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            return Err(UpdateError::transport(
                OPERATION,
                &url,
                TransportStage::Status,
                format!("HTTP {status}{body_snippet}"),
            ));
        }

        let releases: Vec<GitHubRelease> = response.json().await.map_err(|error| {
            UpdateError::transport(
                OPERATION,
                &url,
                TransportStage::ResponseParse,
                error.to_string(),
            )
        })?;

        debug!("{} releases listed for {repository}", releases.len());
        Ok(releases.into_iter().map(Release::from).collect())
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

/// Serves a repository's release list from the store while it is younger
/// than `max_age`, refetching from the wrapped source otherwise.
pub struct CachedReleaseSource<'a, S> {
    inner: S,
    store: &'a dyn KeyValueStore,
    max_age: Duration,
    force_refresh: bool,
}

impl<'a, S: ReleaseSource> CachedReleaseSource<'a, S> {
    pub fn new(inner: S, store: &'a dyn KeyValueStore, max_age: Duration) -> Self {
        Self {
            inner,
            store,
            max_age,
            force_refresh: false,
        }
    }

    /// Ignore any cached list and always ask the wrapped source.
    #[must_use]
    pub fn force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    fn cached(&self, key: &str) -> Option<Vec<Release>> {
        if self.force_refresh {
            return None;
        }

        let stored = match self.store.get(key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(error) => {
                warn!("Release cache unavailable: {error}");
                return None;
            }
        };
        if !stored.is_fresh(self.max_age) {
            debug!("Cached releases `{key}` are stale");
            return None;
        }

        match serde_json::from_value(stored.value) {
            Ok(releases) => Some(releases),
            Err(error) => {
                warn!("Ignoring unreadable cached releases `{key}`: {error}");
                None
            }
        }
    }
}

#[async_trait]
impl<S: ReleaseSource> ReleaseSource for CachedReleaseSource<'_, S> {
    async fn fetch_releases(&self, repository: &RepositoryId) -> Result<Vec<Release>, UpdateError> {
        let key = repository.cache_key();
        if let Some(releases) = self.cached(&key) {
            debug!("Using cached releases `{key}`");
            return Ok(releases);
        }

        let releases = self.inner.fetch_releases(repository).await?;

        match serde_json::to_value(&releases) {
            Ok(value) => {
                if let Err(error) = self.store.set(&key, value) {
                    warn!("Failed to cache releases `{key}`: {error}");
                }
            }
            Err(error) => warn!("Failed to encode releases `{key}`: {error}"),
        }

        Ok(releases)
    }
}
