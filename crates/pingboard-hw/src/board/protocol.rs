//! Pingboard wire protocol.
//!
//! One command per line, fields separated by exactly one space:
//! - `COL <switch> <red> <green> <blue>`
//! - `DIM <level>`
//! - `BLNK <switch> <mode> <red> <green> <blue>`
//!
//! The switch is a single digit; colour channels and the dim level are
//! three zero-padded decimal digits. Every line ends with `\n`.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Line the firmware sends after accepting a command.
pub const ACK_LINE: &str = "OK\n";

const BLINK_KEYWORD: &str = "BLNK";
const COLOR_KEYWORD: &str = "COL";
const DIM_KEYWORD: &str = "DIM";

/// A switch on the board (1-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch(u8);

impl Switch {
    /// Lowest switch number.
    pub const MIN: u8 = 1;
    /// Highest switch number.
    pub const MAX: u8 = 4;

    /// Creates a switch, rejecting numbers the firmware does not know.
    pub fn new(number: u8) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&number) {
            return Err(Error::InvalidSwitch(number));
        }
        Ok(Self(number))
    }

    /// Returns the switch number.
    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An RGB colour as sent to a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    /// All channels off.
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03} {:03} {:03}", self.red, self.green, self.blue)
    }
}

/// Blink modes understood by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkMode {
    /// One long flash, then back to the switch colour.
    Single,
    /// 4 Hz blinking.
    Short,
    /// 1 Hz blinking.
    Long,
    /// Stop blinking.
    Off,
}

impl FromStr for BlinkMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "single" => Ok(BlinkMode::Single),
            "short" => Ok(BlinkMode::Short),
            "long" => Ok(BlinkMode::Long),
            "off" => Ok(BlinkMode::Off),
            _ => Err(Error::InvalidBlinkMode(s.to_string())),
        }
    }
}

impl fmt::Display for BlinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlinkMode::Single => write!(f, "SINGLE"),
            BlinkMode::Short => write!(f, "SHORT"),
            BlinkMode::Long => write!(f, "LONG"),
            BlinkMode::Off => write!(f, "OFF"),
        }
    }
}

/// A single command for the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Blink a switch in the given colour.
    SetBlink {
        switch: Switch,
        mode: BlinkMode,
        color: Rgb,
    },
    /// Set the steady colour of a switch.
    SetColor { switch: Switch, color: Rgb },
    /// Set the global brightness.
    SetDim { level: u8 },
}

impl Command {
    /// Builds a blink command.
    pub fn blink(switch: u8, mode: BlinkMode, color: Rgb) -> Result<Self> {
        Ok(Command::SetBlink {
            switch: Switch::new(switch)?,
            mode,
            color,
        })
    }

    /// Builds the `OFF` blink shorthand, which carries no colour.
    pub fn blink_off(switch: u8) -> Result<Self> {
        Self::blink(switch, BlinkMode::Off, Rgb::OFF)
    }

    /// Builds a set-colour command.
    pub fn color(switch: u8, color: Rgb) -> Result<Self> {
        Ok(Command::SetColor {
            switch: Switch::new(switch)?,
            color,
        })
    }

    /// Builds a dim command.
    pub fn dim(level: u8) -> Self {
        Command::SetDim { level }
    }

    /// Frames the command as a newline-terminated wire line.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

/// Formats the line without its terminator.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetBlink {
                switch,
                mode,
                color,
            } => write!(f, "{BLINK_KEYWORD} {switch} {mode} {color}"),
            Command::SetColor { switch, color } => write!(f, "{COLOR_KEYWORD} {switch} {color}"),
            Command::SetDim { level } => write!(f, "{DIM_KEYWORD} {level:03}"),
        }
    }
}

/// Parses a wire line the same way the firmware does.
impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let mut fields = line.split(' ');
        let keyword = fields.next().unwrap_or_default();
        let args: Vec<&str> = fields.collect();

        match keyword {
            COLOR_KEYWORD => {
                let [switch, red, green, blue] = args[..] else {
                    return Err(Error::Parse(
                        "COL requires 4 arguments: <switch> <red> <green> <blue>".into(),
                    ));
                };
                Ok(Command::SetColor {
                    switch: parse_switch(switch)?,
                    color: parse_rgb(red, green, blue)?,
                })
            }
            DIM_KEYWORD => {
                let [level] = args[..] else {
                    return Err(Error::Parse("DIM requires 1 argument: <brightness>".into()));
                };
                Ok(Command::SetDim {
                    level: parse_value(level)?,
                })
            }
            BLINK_KEYWORD => {
                let [switch, mode, red, green, blue] = args[..] else {
                    return Err(Error::Parse(
                        "BLNK requires 5 arguments: <switch> <mode> <red> <green> <blue>".into(),
                    ));
                };
                if mode != mode.to_uppercase() {
                    return Err(Error::InvalidBlinkMode(mode.to_string()));
                }
                Ok(Command::SetBlink {
                    switch: parse_switch(switch)?,
                    mode: mode.parse()?,
                    color: parse_rgb(red, green, blue)?,
                })
            }
            _ => Err(Error::Parse(format!("Unknown command: {keyword:?}"))),
        }
    }
}

fn parse_switch(field: &str) -> Result<Switch> {
    match field.as_bytes() {
        [digit @ b'0'..=b'9'] => Switch::new(digit - b'0'),
        _ => Err(Error::Parse(format!("Switch must be one digit, got {field:?}"))),
    }
}

/// Parses a three-digit zero-padded value.
fn parse_value(field: &str) -> Result<u8> {
    if field.len() != 3 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Parse(format!(
            "Value must be three digits, got {field:?}"
        )));
    }
    field
        .parse()
        .map_err(|_| Error::Parse(format!("Value must be between 0 and 255, got {field}")))
}

fn parse_rgb(red: &str, green: &str, blue: &str) -> Result<Rgb> {
    Ok(Rgb::new(
        parse_value(red)?,
        parse_value(green)?,
        parse_value(blue)?,
    ))
}
