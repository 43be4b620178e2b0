//! Release selection and self-update gate for launcher workflows.
//!
//! This crate decides whether a newer release of a workflow is published and
//! installs it on request:
//! - Loose semantic version parsing and comparison.
//! - Per-release validation down to a single installable package.
//! - The check step, which records its decision in a key-value store.
//! - The install step, which consumes that decision at most once.
//!
//! Every collaborator (release source, store, downloader, opener) is passed in
//! by the caller.

mod error;
mod gate;
mod install;
mod release;
mod repository;
mod source;
mod status;
mod store;
mod version;

/// Error taxonomy shared by the check and install steps.
pub use error::{TransportStage, UpdateError};
/// Update check entry point and its request/outcome types.
pub use gate::{CheckOutcome, CheckRequest, check_for_update};
/// Update install entry point, downloader and opener seams.
pub use install::{
    ArtifactFetcher, HttpArtifactFetcher, InstallOutcome, InstallTrigger, SystemOpener,
    install_update,
};
/// Release model, validator and lazy filter.
pub use release::{
    Asset, HostCapabilities, PackageFormats, PackageKind, Release, ReleaseRejection,
    ValidatedRelease, valid_releases, validate_release,
};
pub use repository::RepositoryId;
/// Release list providers.
pub use source::{
    CachedReleaseSource, GITHUB_API_BASE, GitHubAsset, GitHubRelease, GitHubReleaseSource,
    ReleaseSource,
};
/// Persisted check result.
pub use status::{UPDATE_STATUS_KEY, UpdateStatus, read_update_status, write_update_status};
/// Key-value persistence.
pub use store::{DiskStore, KeyValueStore, MemoryStore, StoreError, StoredValue};
/// Version parsing and comparison.
pub use version::{SemanticVersion, VersionParseError};
