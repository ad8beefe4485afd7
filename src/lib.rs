use std::env;
use std::path::PathBuf;
use clap::Parser;
use crate::config::io::ConfigIO;
use crate::gui::application::{run_application, ApplicationFlags};
use crate::error::AppRunError;

pub mod config;
pub mod device;
pub mod error;
pub mod gui;

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Shows the live reading of a DLG-CAP pressure sensor over Bluetooth LE", long_about = None)]
pub struct Args {
    /// Use this config file instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Start scanning as soon as the window opens
    #[arg(long)]
    pub scan: bool,

    /// Log debug messages
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Warn)
        .level_for("dlg_cap_link", level)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

pub fn run(args: Args) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync(args.config)?;

    run_application(ApplicationFlags {
        config_io,
        scan_on_start: args.scan,
    })?;
    Ok(())
}
