use std::path::Path;

use thiserror::Error;

use crate::store::StoreError;
use crate::version::VersionParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportStage {
    #[error("request")]
    Request,
    #[error("response status")]
    Status,
    #[error("response parse")]
    ResponseParse,
    #[error("response body")]
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error("Invalid repository identifier `{identifier}`: expected `owner/name`")]
    InvalidIdentifier { identifier: String },

    #[error(transparent)]
    InvalidVersion(#[from] VersionParseError),

    #[error("No valid releases for {repository}")]
    NoValidReleases { repository: String },

    #[error("Failed to {operation} from {url} ({stage}): {details}")]
    Transport {
        operation: &'static str,
        url: String,
        stage: TransportStage,
        details: String,
    },

    #[error("Download `{url}` is not an installable package")]
    InvalidArtifact { url: String },

    #[error("Failed to hand {path} to the system: {details}")]
    InstallTriggerFailed { path: String, details: String },

    #[error("{context} {path} ({kind}): {message}")]
    Io {
        context: &'static str,
        path: String,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl UpdateError {
    pub fn transport(
        operation: &'static str,
        url: &str,
        stage: TransportStage,
        details: impl Into<String>,
    ) -> Self {
        Self::Transport {
            operation,
            url: url.to_string(),
            stage,
            details: details.into(),
        }
    }

    pub fn install_trigger_failed(path: &Path, details: impl Into<String>) -> Self {
        Self::InstallTriggerFailed {
            path: path.display().to_string(),
            details: details.into(),
        }
    }

    pub(crate) fn io_with_path(context: &'static str, path: &Path, error: &std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.display().to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}
