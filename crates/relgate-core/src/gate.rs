use log::{debug, info};

use crate::error::UpdateError;
use crate::release::{HostCapabilities, PackageFormats, valid_releases};
use crate::repository::RepositoryId;
use crate::source::ReleaseSource;
use crate::status::{UpdateStatus, write_update_status};
use crate::store::KeyValueStore;
use crate::version::SemanticVersion;

#[derive(Debug, Clone)]
pub struct CheckRequest {
    /// Repository slug in `owner/name` form.
    pub repository: String,
    pub installed_version: SemanticVersion,
    pub include_prereleases: bool,
    pub host: HostCapabilities,
    pub formats: PackageFormats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    UpdateAvailable {
        version: SemanticVersion,
        download_url: String,
    },
    UpToDate,
}

/// Decide whether a newer release than the installed one is published and
/// record the decision for [`crate::install_update`].
///
/// Nothing is downloaded here.
///
/// # Errors
/// Returns [`UpdateError::InvalidIdentifier`] before any request when the
/// repository slug is malformed, [`UpdateError::NoValidReleases`] when no
/// published release survives validation, and transport or store errors from
/// the collaborators.
pub async fn check_for_update(
    source: &dyn ReleaseSource,
    store: &dyn KeyValueStore,
    request: &CheckRequest,
) -> Result<CheckOutcome, UpdateError> {
    let repository: RepositoryId = request.repository.parse()?;

    let releases = source.fetch_releases(&repository).await?;
    debug!("{} raw releases for {repository}", releases.len());

    let Some(latest) = valid_releases(
        releases,
        request.host,
        &request.formats,
        request.include_prereleases,
    )
    .next() else {
        return Err(UpdateError::NoValidReleases {
            repository: repository.to_string(),
        });
    };

    debug!(
        "Latest : {} Installed : {}",
        latest.version, request.installed_version
    );

    if latest.version > request.installed_version {
        info!(
            "Update available for {repository}: {} -> {}",
            request.installed_version, latest.version
        );
        write_update_status(
            store,
            &UpdateStatus::Available {
                version: latest.version.to_string(),
                download_url: latest.download_url.clone(),
            },
        )?;
        Ok(CheckOutcome::UpdateAvailable {
            version: latest.version,
            download_url: latest.download_url,
        })
    } else {
        info!(
            "{repository} is up to date at {}",
            request.installed_version
        );
        write_update_status(store, &UpdateStatus::NotAvailable)?;
        Ok(CheckOutcome::UpToDate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::release::{Asset, Release};
    use crate::status::read_update_status;
    use crate::store::MemoryStore;

    struct StaticSource {
        releases: Vec<Release>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(releases: Vec<Release>) -> Self {
            Self {
                releases,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReleaseSource for StaticSource {
        async fn fetch_releases(
            &self,
            _repository: &RepositoryId,
        ) -> Result<Vec<Release>, UpdateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.releases.clone())
        }
    }

    fn release(tag: &str, prerelease: bool, urls: &[&str]) -> Release {
        Release {
            tag: tag.to_string(),
            prerelease,
            assets: urls.iter().map(|url| Asset::new(*url)).collect(),
        }
    }

    fn request(installed: &str) -> CheckRequest {
        CheckRequest {
            repository: "owner/tool".to_string(),
            installed_version: installed.parse().expect("installed version should parse"),
            include_prereleases: false,
            host: HostCapabilities::default(),
            formats: PackageFormats::new("standardpkg", "extendedpkg"),
        }
    }

    #[tokio::test]
    async fn newer_release_is_recorded_as_available() {
        let url = "https://x/v1.3.0/Tool.standardpkg";
        let source = StaticSource::new(vec![release("v1.3.0", false, &[url])]);
        let store = MemoryStore::new();

        let outcome = check_for_update(&source, &store, &request("1.2.0"))
            .await
            .expect("check should succeed");

        assert_eq!(
            outcome,
            CheckOutcome::UpdateAvailable {
                version: SemanticVersion::new(1, 3, 0),
                download_url: url.to_string(),
            }
        );
        assert_eq!(
            read_update_status(&store).expect("status should be readable"),
            UpdateStatus::Available {
                version: "1.3.0".to_string(),
                download_url: url.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn repeated_checks_without_new_release_stay_up_to_date() {
        let source = StaticSource::new(vec![release(
            "v1.2.0",
            false,
            &["https://x/Tool.standardpkg"],
        )]);
        let store = MemoryStore::new();

        for _ in 0..2 {
            let outcome = check_for_update(&source, &store, &request("1.2.0"))
                .await
                .expect("check should succeed");
            assert_eq!(outcome, CheckOutcome::UpToDate);
            assert_eq!(
                read_update_status(&store).expect("status should be readable"),
                UpdateStatus::NotAvailable
            );
        }
    }

    #[tokio::test]
    async fn up_to_date_check_clears_previous_availability() {
        let source = StaticSource::new(vec![release(
            "1.2.0",
            false,
            &["https://x/Tool.standardpkg"],
        )]);
        let store = MemoryStore::new();
        write_update_status(
            &store,
            &UpdateStatus::Available {
                version: "1.2.0".to_string(),
                download_url: "https://x/Tool.standardpkg".to_string(),
            },
        )
        .expect("status should be written");

        check_for_update(&source, &store, &request("1.2.0"))
            .await
            .expect("check should succeed");

        assert!(
            !read_update_status(&store)
                .expect("status should be readable")
                .is_available()
        );
    }

    #[tokio::test]
    async fn filtered_out_prerelease_means_no_valid_releases() {
        let source = StaticSource::new(vec![release(
            "2.0.0-beta",
            true,
            &["https://x/Tool.standardpkg"],
        )]);
        let store = MemoryStore::new();

        let error = check_for_update(&source, &store, &request("2.0.0"))
            .await
            .expect_err("check should fail");

        assert_eq!(
            error,
            UpdateError::NoValidReleases {
                repository: "owner/tool".to_string()
            }
        );
        assert!(
            store
                .get(crate::status::UPDATE_STATUS_KEY)
                .expect("get should succeed")
                .is_none()
        );
    }

    #[tokio::test]
    async fn prerelease_is_considered_when_requested() {
        let url = "https://x/beta/Tool.standardpkg";
        let source = StaticSource::new(vec![
            release("2.1.0-beta", true, &[url]),
            release("2.0.0", false, &["https://x/Tool.standardpkg"]),
        ]);
        let store = MemoryStore::new();
        let mut request = request("2.0.0");
        request.include_prereleases = true;

        let outcome = check_for_update(&source, &store, &request)
            .await
            .expect("check should succeed");

        assert!(matches!(
            outcome,
            CheckOutcome::UpdateAvailable { ref download_url, .. } if download_url == url
        ));
    }

    #[tokio::test]
    async fn ambiguous_only_release_means_no_valid_releases() {
        let source = StaticSource::new(vec![release(
            "v9.0.0",
            false,
            &["https://x/a.standardpkg", "https://x/b.standardpkg"],
        )]);
        let store = MemoryStore::new();

        let error = check_for_update(&source, &store, &request("1.0.0"))
            .await
            .expect_err("check should fail");

        assert!(matches!(error, UpdateError::NoValidReleases { .. }));
    }

    #[tokio::test]
    async fn ambiguous_newest_release_falls_back_to_next_valid_one() {
        let url = "https://x/v1.5.0/Tool.standardpkg";
        let source = StaticSource::new(vec![
            release(
                "v2.0.0",
                false,
                &["https://x/a.standardpkg", "https://x/b.standardpkg"],
            ),
            release("v1.5.0", false, &[url]),
        ]);
        let store = MemoryStore::new();

        let outcome = check_for_update(&source, &store, &request("1.0.0"))
            .await
            .expect("check should succeed");

        assert_eq!(
            outcome,
            CheckOutcome::UpdateAvailable {
                version: SemanticVersion::new(1, 5, 0),
                download_url: url.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn malformed_repository_is_rejected_before_fetching() {
        let source = StaticSource::new(Vec::new());
        let store = MemoryStore::new();
        let mut request = request("1.0.0");
        request.repository = "not-a-slug".to_string();

        let error = check_for_update(&source, &store, &request)
            .await
            .expect_err("check should fail");

        assert_eq!(
            error,
            UpdateError::InvalidIdentifier {
                identifier: "not-a-slug".to_string()
            }
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn older_release_than_installed_is_up_to_date() {
        let source = StaticSource::new(vec![release(
            "v1.0.0",
            false,
            &["https://x/Tool.standardpkg"],
        )]);
        let store = MemoryStore::new();

        let outcome = check_for_update(&source, &store, &request("v1.10.0"))
            .await
            .expect("check should succeed");

        assert_eq!(outcome, CheckOutcome::UpToDate);
    }
}
