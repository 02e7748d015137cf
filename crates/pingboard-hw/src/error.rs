//! Error types for the pingboard hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the board.
#[derive(Error, Debug)]
pub enum Error {
    /// No serial port matched the requested descriptor.
    #[error("No device matching {0} could be found")]
    DeviceNotFound(String),

    /// Serial ports could not be enumerated.
    #[error("Failed to enumerate serial ports: {0}")]
    Enumerate(#[source] tokio_serial::Error),

    /// The serial port could not be opened.
    #[error("Failed to open serial port {port}")]
    Open {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// Serial I/O error.
    #[error("Serial I/O error: {0}")]
    SerialIo(#[from] std::io::Error),

    /// The board answered with something other than the acknowledgment.
    #[error("Something went wrong: {0}")]
    Rejected(String),

    /// No complete line arrived before the read timeout.
    #[error("Something went wrong: no response within timeout (received {partial:?})")]
    Timeout { partial: String },

    /// Switch number outside the range the board accepts.
    #[error("Switch number must be between 1 and 4, got {0}")]
    InvalidSwitch(u8),

    /// Unknown blink mode token.
    #[error("Mode must be one of SINGLE, SHORT, LONG, OFF, got {0:?}")]
    InvalidBlinkMode(String),

    /// USB id not in `VID:PID` hexadecimal form.
    #[error("Invalid USB id (expected VID:PID in hex): {0:?}")]
    InvalidUsbId(String),

    /// A wire line could not be parsed as a command.
    #[error("Invalid command line: {0}")]
    Parse(String),
}

impl Error {
    /// Raw response text carried by protocol failures, if any.
    pub fn response(&self) -> Option<&str> {
        match self {
            Error::Rejected(raw) => Some(raw),
            Error::Timeout { partial } => Some(partial),
            _ => None,
        }
    }
}
