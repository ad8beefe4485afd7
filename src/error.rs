use std::io;
use thiserror::Error;
use msgbox::IconType;
use std::fmt::{Debug, Display};
use std::str::Utf8Error;
use btleplug;
use iced;
use serde_json;

use crate::device::types::PeripheralId;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

impl ConfigError {
    pub fn is_file_not_found_error(&self) -> bool {
        match self {
            ConfigError::IOError { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (iced): {source}")]
    Iced { #[from] source: iced::Error },

    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No bluetooth adapter is available")]
    NoAdapter,

    #[error("The bluetooth radio is turned off")]
    RadioOff,

    #[error("Peripheral {0} has not been discovered")]
    UnknownPeripheral(PeripheralId),

    #[error("A required bluetooth characteristic is not available")]
    MissingCharacteristic,

    #[error("Scanning has not been started")]
    NotScanning,
}

pub fn error_msgbox<T: Display>(message: &'static str, error: &T) {
    let message = format!("{}: {}", message, error);
    eprintln!("{}", &message);
    if let Err(err) = msgbox::create(concat!("DLG-CAP Link ", env!("CARGO_PKG_VERSION")), &message, IconType::Error) {
        eprintln!("Failed to create msgbox: {:?}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_error() {
        let err = ConfigError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_file_not_found_error());

        let err = ConfigError::from(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(!err.is_file_not_found_error());
        assert!(!ConfigError::NoConfigPath.is_file_not_found_error());
    }

    #[test]
    fn test_device_error_messages() {
        let err = DeviceError::UnknownPeripheral(PeripheralId("hci0/dev_00_11".to_string()));
        assert_eq!(err.to_string(), "Peripheral hci0/dev_00_11 has not been discovered");
    }
}
