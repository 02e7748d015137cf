//! Pingboard Control Tool
//!
//! Sends one command to the pingboard and waits for its acknowledgment.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pingboard_hw::{
    enumerate, locate_required, select, BlinkMode, ByDescription, ByUsbId, Command,
    DeviceMatcher, DeviceRef, Error, Rgb, BOARD_DESCRIPTOR,
};
use tracing_subscriber::EnvFilter;

/// Exit status for usage errors and failed transactions.
const EXIT_FAILURE: i32 = -1;

#[derive(Parser)]
#[command(name = "pingboard")]
#[command(about = "Control tool for the pingboard LED indicator")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Description the board reports during serial port enumeration
    #[arg(long, default_value = BOARD_DESCRIPTOR)]
    descriptor: String,

    /// USB id (VID:PID in hex) to search for instead of the descriptor
    #[arg(long, value_name = "VID:PID")]
    usb_id: Option<ByUsbId>,

    /// Serial port to use instead of searching
    #[arg(long)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Blink a switch
    Blink {
        /// Switch number (1-4)
        switch: u8,
        /// Mode: single, short, long, off
        mode: BlinkMode,
        /// Red (0-255), may be omitted together with green and blue for mode off
        red: Option<u8>,
        /// Green (0-255)
        green: Option<u8>,
        /// Blue (0-255)
        blue: Option<u8>,
    },
    /// Set the colour of a switch
    Color {
        /// Switch number (1-4)
        switch: u8,
        /// Red (0-255)
        red: u8,
        /// Green (0-255)
        green: u8,
        /// Blue (0-255)
        blue: u8,
    },
    /// Set the brightness of all switches
    Dim {
        /// Brightness (0-255)
        level: u8,
    },
    /// List serial ports and show which one matches the descriptor
    Ports,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_FAILURE);
        }
    };

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli).await {
        eprintln!("{:#}", e);
        std::process::exit(EXIT_FAILURE);
    }
}

impl Cli {
    /// Picks how the board is recognised among the serial ports.
    fn matcher(&self) -> Box<dyn DeviceMatcher> {
        match self.usb_id {
            Some(usb_id) => Box::new(usb_id),
            None => Box::new(ByDescription::new(self.descriptor.as_str())),
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let matcher = cli.matcher();
    let command = match cli.command {
        Commands::Blink {
            switch,
            mode,
            red,
            green,
            blue,
        } => blink_command(switch, mode, red, green, blue)?,
        Commands::Color {
            switch,
            red,
            green,
            blue,
        } => Command::color(switch, Rgb::new(red, green, blue))?,
        Commands::Dim { level } => Command::dim(level),
        Commands::Ports => return handle_ports(matcher.as_ref()),
    };

    let device = match cli.port {
        Some(path) => DeviceRef::new(path),
        None => match locate_required(matcher.as_ref()) {
            Ok(device) => device,
            Err(e @ Error::DeviceNotFound(_)) => {
                // Not fatal: nothing was sent.
                println!("{}", e);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        },
    };

    let path = device.path().to_string();
    pingboard_hw::send(device, &command).await?;
    tracing::info!("{} sent to {}", command, path);

    Ok(())
}

/// Resolves the blink arguments, including the colourless `OFF` shorthand.
fn blink_command(
    switch: u8,
    mode: BlinkMode,
    red: Option<u8>,
    green: Option<u8>,
    blue: Option<u8>,
) -> Result<Command> {
    let command = match (mode, red, green, blue) {
        (_, Some(red), Some(green), Some(blue)) => {
            Command::blink(switch, mode, Rgb::new(red, green, blue))?
        }
        (BlinkMode::Off, None, None, None) => Command::blink_off(switch)?,
        _ => bail!("Must have five arguments: <switch> <mode> <red> <green> <blue>"),
    };
    Ok(command)
}

fn handle_ports(matcher: &dyn DeviceMatcher) -> Result<()> {
    let ports = enumerate().context("Failed to list serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    let selected = select(&ports, matcher).map(|port| port.path.as_str());

    println!("Serial ports (* matches {}):", matcher);
    for port in &ports {
        let marker = if selected == Some(port.path.as_str()) {
            "*"
        } else {
            " "
        };
        let ids = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!(" [{:04X}:{:04X}]", vid, pid),
            _ => String::new(),
        };
        println!(
            "{} {}  {}{}",
            marker,
            port.path,
            port.description.as_deref().unwrap_or("(no description)"),
            ids
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_blink_with_colour() {
        let cmd = blink_command(1, BlinkMode::Short, Some(255), Some(0), Some(9)).unwrap();
        assert_eq!(cmd.encode(), "BLNK 1 SHORT 255 000 009\n");
    }

    #[test]
    fn test_blink_off_without_colour() {
        let cmd = blink_command(2, BlinkMode::Off, None, None, None).unwrap();
        assert_eq!(cmd, Command::blink_off(2).unwrap());
    }

    #[test]
    fn test_blink_arity() {
        assert!(blink_command(2, BlinkMode::Long, None, None, None).is_err());
        assert!(blink_command(2, BlinkMode::Off, Some(1), None, None).is_err());
        assert!(blink_command(2, BlinkMode::Short, Some(1), Some(2), None).is_err());
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from(["pingboard", "color", "1", "255", "0", "128"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Color {
                switch: 1,
                red: 255,
                green: 0,
                blue: 128
            }
        ));
        assert_eq!(cli.descriptor, "Arduino Micro");

        let cli = Cli::try_parse_from(["pingboard", "blink", "2", "off"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Blink {
                switch: 2,
                mode: BlinkMode::Off,
                red: None,
                ..
            }
        ));
    }

    #[test]
    fn test_matcher_selection() {
        let cli = Cli::try_parse_from(["pingboard", "dim", "7"]).unwrap();
        assert_eq!(cli.matcher().to_string(), "\"Arduino Micro\"");

        let args = ["pingboard", "--descriptor", "Pro Micro", "dim", "7"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.matcher().to_string(), "\"Pro Micro\"");

        let args = ["pingboard", "--usb-id", "2341:8037", "dim", "7"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(
            cli.usb_id,
            Some(ByUsbId {
                vid: 0x2341,
                pid: 0x8037
            })
        );
        assert_eq!(cli.matcher().to_string(), "2341:8037");

        let args = ["pingboard", "--usb-id", "arduino", "dim", "7"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_reject_bad_arguments() {
        assert!(Cli::try_parse_from(["pingboard", "color", "1", "255", "0"]).is_err());
        assert!(Cli::try_parse_from(["pingboard", "dim"]).is_err());
        assert!(Cli::try_parse_from(["pingboard", "dim", "7", "8"]).is_err());
        assert!(Cli::try_parse_from(["pingboard", "dim", "1000"]).is_err());
        assert!(Cli::try_parse_from(["pingboard", "blink", "1", "fast"]).is_err());
    }
}
