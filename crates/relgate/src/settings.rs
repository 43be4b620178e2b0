use std::path::{Path, PathBuf};

use relgate_core::{GITHUB_API_BASE, PackageFormats};
use relgate_platform::AppPaths;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Ignoring invalid settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_release_cache_ttl")]
    pub release_cache_ttl_secs: u64,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default = "default_standard_extension")]
    pub standard_extension: String,

    #[serde(default = "default_extended_extension")]
    pub extended_extension: String,
}

fn default_api_base_url() -> String {
    GITHUB_API_BASE.to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_release_cache_ttl() -> u64 {
    60
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_standard_extension() -> String {
    PackageFormats::default().standard
}

fn default_extended_extension() -> String {
    PackageFormats::default().extended
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            http_timeout_secs: default_http_timeout(),
            release_cache_ttl_secs: default_release_cache_ttl(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            standard_extension: default_standard_extension(),
            extended_extension: default_extended_extension(),
        }
    }
}

impl AppSettings {
    /// Reads `settings.json`, treating a missing file as all defaults.
    ///
    /// # Errors
    /// Returns [`SettingsError`] when the file exists but cannot be read or
    /// parsed; callers fall back to [`AppSettings::default`].
    pub fn load(paths: &AppPaths) -> Result<Self, SettingsError> {
        Self::load_from_path(&paths.settings_file())
    }

    fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn package_formats(&self) -> PackageFormats {
        PackageFormats::new(&self.standard_extension, &self.extended_extension)
    }
}
