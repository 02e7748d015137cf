//! Pingboard Hardware Library
//!
//! Frames commands for the pingboard LED indicator, locates the board among
//! the host's serial ports and runs the write-then-acknowledge handshake.

pub mod board;
pub mod error;
pub mod locator;

pub use board::{send, BlinkMode, Command, Link, Rgb, SerialLink, Switch, Transport, ACK_LINE};
pub use error::{Error, Result};
pub use locator::{
    enumerate, find_device, locate, locate_required, require_device, select, ByDescription,
    ByUsbId, DeviceMatcher, DeviceRef, PortDescriptor,
};

/// Descriptor the board reports during serial enumeration.
pub const BOARD_DESCRIPTOR: &str = "Arduino Micro";

/// Baud rate of the board's serial link.
pub const BAUD_RATE: u32 = 115_200;

/// How long to wait for the acknowledgment line, in milliseconds.
pub const READ_TIMEOUT_MS: u64 = 1000;
