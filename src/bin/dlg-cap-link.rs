use clap::Parser;
use log::info;
use msgbox::IconType;
use dlg_cap_link::{init_logging, run, Args};
use dlg_cap_link::error::{error_msgbox, AppRunError, ConfigError};

// This embedded Info.plist is used when launching the binary directly, instead of an app bundle.
// Without it macOS refuses bluetooth access.
#[cfg(target_os = "macos")]
embed_plist::embed_info_plist!(concat!(env!("OUT_DIR"), "/Info.plist"));

fn main() -> Result<(), AppRunError> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!(concat!("DLG-CAP Link ", env!("CARGO_PKG_VERSION")));

    match run(args) {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            if let Err(err) = msgbox::create(
                concat!("DLG-CAP Link ", env!("CARGO_PKG_VERSION")),
                "This application has already been started",
                IconType::Error,
            ) {
                eprintln!("Failed to create msgbox: {:?}", err);
            }
            Ok(())
        },
        Err(err) => {
            error_msgbox("Unexpected error", &err);
            Err(err)
        }
        Ok(_) => Ok(())
    }
}
