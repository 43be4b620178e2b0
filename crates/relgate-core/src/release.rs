use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::SemanticVersion;

/// A published release as reported by the release source, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub url: String,
}

impl Asset {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Lower-cased extension of the last URL segment, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.url)
    }
}

pub(crate) fn file_extension(url: &str) -> Option<String> {
    let file_name = url.rsplit('/').next()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageKind {
    Standard,
    Extended,
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// File extensions recognized as installable packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFormats {
    pub standard: String,
    pub extended: String,
}

impl Default for PackageFormats {
    fn default() -> Self {
        Self {
            standard: "alfredworkflow".to_string(),
            extended: "alfred3workflow".to_string(),
        }
    }
}

impl PackageFormats {
    pub fn new(standard: impl Into<String>, extended: impl Into<String>) -> Self {
        Self {
            standard: normalize_extension(&standard.into()),
            extended: normalize_extension(&extended.into()),
        }
    }

    #[must_use]
    pub fn classify(&self, extension: &str) -> Option<PackageKind> {
        if extension.eq_ignore_ascii_case(&self.standard) {
            Some(PackageKind::Standard)
        } else if extension.eq_ignore_ascii_case(&self.extended) {
            Some(PackageKind::Extended)
        } else {
            None
        }
    }

    #[must_use]
    pub fn classify_url(&self, url: &str) -> Option<PackageKind> {
        file_extension(url).and_then(|extension| self.classify(&extension))
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// What the running host is able to install.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCapabilities {
    pub extended_format: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRelease {
    pub version: SemanticVersion,
    pub download_url: String,
    pub kind: PackageKind,
    pub prerelease: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseRejection {
    #[error("{count} {kind} package files")]
    Ambiguous { kind: PackageKind, count: usize },
    #[error("no installable package file")]
    NoAsset,
    #[error("unparseable version tag `{tag}`")]
    UnparseableVersion { tag: String },
}

/// Reduce one release to the single asset the host should install.
///
/// # Errors
/// Returns the reason the release cannot be installed. A rejection only
/// disqualifies this release, never the batch it came from.
pub fn validate_release(
    release: &Release,
    host: HostCapabilities,
    formats: &PackageFormats,
) -> Result<ValidatedRelease, ReleaseRejection> {
    let mut standard = Vec::new();
    let mut extended = Vec::new();

    for asset in &release.assets {
        match asset
            .extension()
            .and_then(|extension| formats.classify(&extension))
        {
            Some(PackageKind::Standard) => standard.push(asset.url.as_str()),
            Some(PackageKind::Extended) if host.extended_format => {
                extended.push(asset.url.as_str());
            }
            Some(PackageKind::Extended) | None => {}
        }
    }

    for (kind, urls) in [
        (PackageKind::Standard, &standard),
        (PackageKind::Extended, &extended),
    ] {
        if urls.len() > 1 {
            return Err(ReleaseRejection::Ambiguous {
                kind,
                count: urls.len(),
            });
        }
    }

    let (kind, download_url) = match (extended.first(), standard.first()) {
        (Some(url), _) => (PackageKind::Extended, *url),
        (None, Some(url)) => (PackageKind::Standard, *url),
        (None, None) => return Err(ReleaseRejection::NoAsset),
    };

    let version = release
        .tag
        .parse::<SemanticVersion>()
        .map_err(|_| ReleaseRejection::UnparseableVersion {
            tag: release.tag.clone(),
        })?;

    debug!("Release `{}` : {download_url}", release.tag);

    Ok(ValidatedRelease {
        version,
        download_url: download_url.to_string(),
        kind,
        prerelease: release.prerelease,
    })
}

/// Validate `releases` in order, yielding only installable ones.
///
/// Rejected releases are logged and skipped. Prereleases are skipped unless
/// `include_prereleases` is set.
pub fn valid_releases<'a, I>(
    releases: I,
    host: HostCapabilities,
    formats: &'a PackageFormats,
    include_prereleases: bool,
) -> impl Iterator<Item = ValidatedRelease> + 'a
where
    I: IntoIterator<Item = Release> + 'a,
    I::IntoIter: 'a,
{
    releases
        .into_iter()
        .filter_map(move |release| match validate_release(&release, host, formats) {
            Ok(validated) => Some(validated),
            Err(rejection) => {
                warn!("Invalid release {} : {rejection}", release.tag);
                None
            }
        })
        .filter(move |release| {
            if release.prerelease && !include_prereleases {
                debug!("Ignoring prerelease : {}", release.version);
                false
            } else {
                true
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STANDARD_URL: &str = "https://example.com/dl/Tool.alfredworkflow";
    const EXTENDED_URL: &str = "https://example.com/dl/Tool.alfred3workflow";

    fn release(tag: &str, prerelease: bool, urls: &[&str]) -> Release {
        Release {
            tag: tag.to_string(),
            prerelease,
            assets: urls.iter().map(|url| Asset::new(*url)).collect(),
        }
    }

    fn extended_host() -> HostCapabilities {
        HostCapabilities {
            extended_format: true,
        }
    }

    #[test]
    fn asset_extension_is_lowercased_last_segment_suffix() {
        assert_eq!(
            Asset::new("https://x/y/Tool.AlfredWorkflow").extension(),
            Some("alfredworkflow".to_string())
        );
        assert_eq!(Asset::new("https://x/y/README").extension(), None);
        assert_eq!(Asset::new("https://x/y.z/README").extension(), None);
        assert_eq!(Asset::new("https://x/y/.hidden").extension(), None);
    }

    #[test]
    fn package_formats_normalize_configured_extensions() {
        let formats = PackageFormats::new(".StandardPkg", "extendedpkg ");
        assert_eq!(formats.standard, "standardpkg");
        assert_eq!(formats.extended, "extendedpkg");
        assert_eq!(
            formats.classify_url("https://x/Tool.standardpkg"),
            Some(PackageKind::Standard)
        );
        assert_eq!(formats.classify_url("https://x/Tool.zip"), None);
    }

    #[test]
    fn single_standard_asset_is_selected() {
        let validated = validate_release(
            &release("v1.3.0", false, &[STANDARD_URL, "https://x/notes.txt"]),
            HostCapabilities::default(),
            &PackageFormats::default(),
        )
        .expect("release should be valid");

        assert_eq!(validated.download_url, STANDARD_URL);
        assert_eq!(validated.kind, PackageKind::Standard);
        assert_eq!(validated.version, SemanticVersion::new(1, 3, 0));
        assert!(!validated.prerelease);
    }

    #[test]
    fn extended_asset_is_preferred_when_host_supports_it() {
        let validated = validate_release(
            &release("2.0", false, &[STANDARD_URL, EXTENDED_URL]),
            extended_host(),
            &PackageFormats::default(),
        )
        .expect("release should be valid");

        assert_eq!(validated.download_url, EXTENDED_URL);
        assert_eq!(validated.kind, PackageKind::Extended);
    }

    #[test]
    fn extended_asset_is_ignored_when_host_lacks_support() {
        let validated = validate_release(
            &release("2.0", false, &[EXTENDED_URL, STANDARD_URL]),
            HostCapabilities::default(),
            &PackageFormats::default(),
        )
        .expect("release should be valid");

        assert_eq!(validated.download_url, STANDARD_URL);
    }

    #[test]
    fn lone_extended_asset_is_rejected_without_host_support() {
        let rejection = validate_release(
            &release("2.0", false, &[EXTENDED_URL]),
            HostCapabilities::default(),
            &PackageFormats::default(),
        )
        .expect_err("release should be rejected");

        assert_eq!(rejection, ReleaseRejection::NoAsset);
    }

    #[test]
    fn duplicate_extension_is_ambiguous_regardless_of_urls() {
        for second in [STANDARD_URL, "https://mirror.example.org/other.alfredworkflow"] {
            let rejection = validate_release(
                &release("1.0.0", false, &[STANDARD_URL, second]),
                extended_host(),
                &PackageFormats::default(),
            )
            .expect_err("release should be rejected");

            assert_eq!(
                rejection,
                ReleaseRejection::Ambiguous {
                    kind: PackageKind::Standard,
                    count: 2
                }
            );
        }
    }

    #[test]
    fn duplicate_extended_assets_only_matter_when_supported() {
        let urls = [STANDARD_URL, EXTENDED_URL, "https://x/b.alfred3workflow"];

        let supported = validate_release(
            &release("1.0.0", false, &urls),
            extended_host(),
            &PackageFormats::default(),
        );
        assert!(matches!(
            supported,
            Err(ReleaseRejection::Ambiguous {
                kind: PackageKind::Extended,
                ..
            })
        ));

        let unsupported = validate_release(
            &release("1.0.0", false, &urls),
            HostCapabilities::default(),
            &PackageFormats::default(),
        )
        .expect("extended duplicates should be discarded");
        assert_eq!(unsupported.download_url, STANDARD_URL);
    }

    #[test]
    fn release_without_assets_is_rejected() {
        let rejection = validate_release(
            &release("1.0.0", false, &[]),
            extended_host(),
            &PackageFormats::default(),
        )
        .expect_err("release should be rejected");
        assert_eq!(rejection, ReleaseRejection::NoAsset);
    }

    #[test]
    fn unparseable_tag_is_rejected() {
        let rejection = validate_release(
            &release("nightly", false, &[STANDARD_URL]),
            HostCapabilities::default(),
            &PackageFormats::default(),
        )
        .expect_err("release should be rejected");
        assert_eq!(
            rejection,
            ReleaseRejection::UnparseableVersion {
                tag: "nightly".to_string()
            }
        );
    }

    #[test]
    fn filter_keeps_order_and_skips_invalid_releases() {
        let releases = vec![
            release("v3.0.0", false, &[STANDARD_URL, STANDARD_URL]),
            release("v2.1.0", false, &["https://x/v2.1.0/Tool.alfredworkflow"]),
            release("v2.0.0", false, &[]),
            release("v1.0.0", false, &["https://x/v1.0.0/Tool.alfredworkflow"]),
        ];
        let formats = PackageFormats::default();

        let versions: Vec<String> =
            valid_releases(releases, HostCapabilities::default(), &formats, false)
                .map(|release| release.version.to_string())
                .collect();

        assert_eq!(versions, vec!["2.1.0", "1.0.0"]);
    }

    #[test]
    fn filter_drops_prereleases_unless_requested() {
        let releases = vec![
            release("2.0.0-beta", true, &[STANDARD_URL]),
            release("1.9.0", false, &[STANDARD_URL]),
        ];
        let formats = PackageFormats::default();

        let stable: Vec<ValidatedRelease> = valid_releases(
            releases.clone(),
            HostCapabilities::default(),
            &formats,
            false,
        )
        .collect();
        assert_eq!(stable.len(), 1);
        assert_eq!(stable[0].version, SemanticVersion::new(1, 9, 0));

        let all: Vec<ValidatedRelease> =
            valid_releases(releases, HostCapabilities::default(), &formats, true).collect();
        assert_eq!(all.len(), 2);
        assert!(all[0].prerelease);
    }
}
