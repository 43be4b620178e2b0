use log::warn;
use serde::{Deserialize, Serialize};

use crate::store::{KeyValueStore, StoreError};

/// Key the check step writes and the install step consumes.
pub const UPDATE_STATUS_KEY: &str = "__workflow_update_status";

/// Outcome of the most recent update check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UpdateStatus {
    #[default]
    NotAvailable,
    Available {
        version: String,
        download_url: String,
    },
}

impl UpdateStatus {
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// On-disk shape: `{"available": false}` or
/// `{"available": true, "version": .., "download_url": ..}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StatusRecord {
    #[serde(default)]
    available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    download_url: Option<String>,
}

impl From<&UpdateStatus> for StatusRecord {
    fn from(status: &UpdateStatus) -> Self {
        match status {
            UpdateStatus::NotAvailable => Self::default(),
            UpdateStatus::Available {
                version,
                download_url,
            } => Self {
                available: true,
                version: Some(version.clone()),
                download_url: Some(download_url.clone()),
            },
        }
    }
}

impl From<StatusRecord> for UpdateStatus {
    fn from(record: StatusRecord) -> Self {
        match record {
            StatusRecord {
                available: true,
                version: Some(version),
                download_url: Some(download_url),
            } => Self::Available {
                version,
                download_url,
            },
            StatusRecord {
                available: true, ..
            } => {
                warn!("Update status marked available without version or URL; ignoring it");
                Self::NotAvailable
            }
            StatusRecord { .. } => Self::NotAvailable,
        }
    }
}

/// Read the last persisted status, however old it is.
///
/// # Errors
/// Returns an error when the store cannot be read.
pub fn read_update_status(store: &dyn KeyValueStore) -> Result<UpdateStatus, StoreError> {
    let Some(stored) = store.get(UPDATE_STATUS_KEY)? else {
        return Ok(UpdateStatus::NotAvailable);
    };

    match serde_json::from_value::<StatusRecord>(stored.value) {
        Ok(record) => Ok(record.into()),
        Err(error) => {
            warn!("Ignoring malformed update status: {error}");
            Ok(UpdateStatus::NotAvailable)
        }
    }
}

/// # Errors
/// Returns an error when the store cannot be written.
pub fn write_update_status(
    store: &dyn KeyValueStore,
    status: &UpdateStatus,
) -> Result<(), StoreError> {
    let value =
        serde_json::to_value(StatusRecord::from(status)).map_err(|error| StoreError::Encode {
            key: UPDATE_STATUS_KEY.to_string(),
            message: error.to_string(),
        })?;
    store.set(UPDATE_STATUS_KEY, value)
}
