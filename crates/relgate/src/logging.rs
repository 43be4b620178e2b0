#[cfg(debug_assertions)]
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use simplelog::{CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, WriteLogger};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use relgate_platform::AppPaths;

/// `Debug` when either the `--debug` flag or the `debug_logging` setting asks
/// for it, `Info` otherwise.
pub fn level_for(debug_flag: bool, debug_setting: bool) -> LevelFilter {
    if debug_flag || debug_setting {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn rotated_path(log_path: &Path) -> PathBuf {
    let mut rotated = log_path.as_os_str().to_owned();
    rotated.push(".1");
    PathBuf::from(rotated)
}

/// Moves a log that outgrew `max_log_size` to `<log>.1`, replacing the
/// previous rotation. Returns whether a rotation happened.
fn rotate_if_oversized(log_path: &Path, max_log_size: u64) -> io::Result<bool> {
    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    if size <= max_log_size {
        return Ok(false);
    }
    std::fs::rename(log_path, rotated_path(log_path))?;
    Ok(true)
}

fn log_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("relgate")
        .build()
}

fn build_loggers(log_path: &Path, level: LevelFilter) -> Vec<Box<dyn SharedLogger>> {
    let config = log_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    #[cfg(debug_assertions)]
    loggers.push(TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));

    match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
        Err(error) => eprintln!("Cannot open log file {}: {error}", log_path.display()),
    }

    loggers
}

/// Log to `relgate.log` in the data directory, and to stderr in debug builds.
pub fn init_logging(paths: &AppPaths, level: LevelFilter, max_log_size: u64) {
    if let Err(error) = paths.ensure_dirs() {
        eprintln!("Cannot create application directories: {error}");
    }
    let log_path = paths.log_file();

    let rotated = rotate_if_oversized(&log_path, max_log_size);

    let loggers = build_loggers(&log_path, level);
    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }

    match rotated {
        Ok(true) => log::info!("Rotated oversized log to {}", rotated_path(&log_path).display()),
        Ok(false) => {}
        Err(error) => log::warn!("Failed to rotate {}: {error}", log_path.display()),
    }
    log::debug!("Logging at {level}, log file: {}", log_path.display());
}
