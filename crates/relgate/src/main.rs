mod cli;
mod host;
mod logging;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use log::{error, warn};
use relgate_platform::AppPaths;

use crate::cli::{Cli, Context};
use crate::settings::AppSettings;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = match AppPaths::new() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (settings, settings_error) = match AppSettings::load(&paths) {
        Ok(settings) => (settings, None),
        Err(e) => (AppSettings::default(), Some(e)),
    };
    logging::init_logging(
        &paths,
        logging::level_for(cli.debug, settings.debug_logging),
        settings.max_log_size_bytes,
    );
    if let Some(e) = settings_error {
        warn!("{e}");
    }

    let context = Context::new(paths, settings);
    match cli.command.execute(&context).await {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
