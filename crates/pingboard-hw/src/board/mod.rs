//! Pingboard module.
//!
//! Command framing and the serial handshake with the board's firmware.

mod device;
mod protocol;

pub use device::{send, Link, SerialLink, Transport};
pub use protocol::{BlinkMode, Command, Rgb, Switch, ACK_LINE};
