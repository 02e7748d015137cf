//! Serial device discovery.
//!
//! Ports are enumerated once, reduced to [`PortDescriptor`]s and scanned in
//! enumeration order. The first port a [`DeviceMatcher`] accepts wins. No
//! port is opened while locating.

use crate::{Error, Result, BAUD_RATE, BOARD_DESCRIPTOR, READ_TIMEOUT_MS};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::debug;

/// What the OS reports about one serial port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Device path, e.g. `/dev/ttyACM0` or `COM3`.
    pub path: String,
    /// Human readable name (the USB product string).
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl From<SerialPortInfo> for PortDescriptor {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                path: info.port_name,
                description: usb.product,
                manufacturer: usb.manufacturer,
                serial_number: usb.serial_number,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
            },
            _ => Self {
                path: info.port_name,
                ..Self::default()
            },
        }
    }
}

/// Decides whether a port is the board.
pub trait DeviceMatcher: fmt::Display {
    fn matches(&self, port: &PortDescriptor) -> bool;
}

/// Matches ports whose description equals a descriptor exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByDescription(String);

impl ByDescription {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }
}

impl Default for ByDescription {
    fn default() -> Self {
        Self::new(BOARD_DESCRIPTOR)
    }
}

impl DeviceMatcher for ByDescription {
    fn matches(&self, port: &PortDescriptor) -> bool {
        port.description.as_deref() == Some(self.0.as_str())
    }
}

impl fmt::Display for ByDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Matches USB ports by vendor and product id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByUsbId {
    pub vid: u16,
    pub pid: u16,
}

impl DeviceMatcher for ByUsbId {
    fn matches(&self, port: &PortDescriptor) -> bool {
        port.vid == Some(self.vid) && port.pid == Some(self.pid)
    }
}

/// Parses `VID:PID` in hexadecimal, e.g. `2341:8037`.
impl FromStr for ByUsbId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |field: &str| u16::from_str_radix(field, 16).ok();
        match s.split_once(':') {
            Some((vid, pid)) => match (parse(vid), parse(pid)) {
                (Some(vid), Some(pid)) => Ok(Self { vid, pid }),
                _ => Err(Error::InvalidUsbId(s.to_string())),
            },
            None => Err(Error::InvalidUsbId(s.to_string())),
        }
    }
}

impl fmt::Display for ByUsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vid, self.pid)
    }
}

/// A located device plus the link settings used to talk to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    path: String,
    baud_rate: u32,
    timeout: Duration,
}

impl DeviceRef {
    /// Creates a handle for the port at `path` with the board's defaults.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: BAUD_RATE,
            timeout: Duration::from_millis(READ_TIMEOUT_MS),
        }
    }

    /// Overrides the response read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl From<&PortDescriptor> for DeviceRef {
    fn from(port: &PortDescriptor) -> Self {
        Self::new(port.path.clone())
    }
}

/// Lists the serial ports currently attached to the host.
pub fn enumerate() -> Result<Vec<PortDescriptor>> {
    let ports = tokio_serial::available_ports().map_err(Error::Enumerate)?;
    Ok(ports.into_iter().map(PortDescriptor::from).collect())
}

/// Returns the first port accepted by `matcher`, in the given order.
pub fn select<'a, M>(ports: &'a [PortDescriptor], matcher: &M) -> Option<&'a PortDescriptor>
where
    M: DeviceMatcher + ?Sized,
{
    ports.iter().find(|port| matcher.matches(port))
}

/// Like [`select`], but a missing device is an [`Error::DeviceNotFound`].
pub fn require_device<M>(ports: &[PortDescriptor], matcher: &M) -> Result<DeviceRef>
where
    M: DeviceMatcher + ?Sized,
{
    select(ports, matcher)
        .map(DeviceRef::from)
        .ok_or_else(|| Error::DeviceNotFound(matcher.to_string()))
}

/// Enumerates ports and returns the first one accepted by `matcher`.
pub fn locate<M>(matcher: &M) -> Result<Option<DeviceRef>>
where
    M: DeviceMatcher + ?Sized,
{
    match locate_required(matcher) {
        Ok(device) => Ok(Some(device)),
        Err(Error::DeviceNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Enumerates ports and fails with [`Error::DeviceNotFound`] when nothing
/// matches.
pub fn locate_required<M>(matcher: &M) -> Result<DeviceRef>
where
    M: DeviceMatcher + ?Sized,
{
    let ports = enumerate()?;
    for port in &ports {
        debug!(
            "Found serial port {} ({})",
            port.path,
            port.description.as_deref().unwrap_or("no description")
        );
    }

    let device = require_device(&ports, matcher)?;
    debug!("Device {} matched at {}", matcher, device.path());
    Ok(device)
}

/// Finds the port whose description equals `descriptor`.
///
/// `Ok(None)` means nothing matched, which callers treat as a normal outcome.
pub fn find_device(descriptor: &str) -> Result<Option<DeviceRef>> {
    locate(&ByDescription::new(descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_serial::UsbPortInfo;

    fn port(path: &str, description: Option<&str>) -> PortDescriptor {
        PortDescriptor {
            path: path.to_string(),
            description: description.map(str::to_string),
            ..PortDescriptor::default()
        }
    }

    #[test]
    fn test_no_match() {
        let ports = vec![
            port("/dev/ttyS0", None),
            port("/dev/ttyUSB0", Some("CP2102 USB to UART Bridge Controller")),
        ];
        assert_eq!(select(&ports, &ByDescription::default()), None);
        assert_eq!(select(&[], &ByDescription::default()), None);
    }

    #[test]
    fn test_first_match_wins() {
        let ports = vec![
            port("/dev/ttyUSB0", Some("Arduino Micro (bootloader)")),
            port("/dev/ttyACM1", Some("Arduino Micro")),
            port("/dev/ttyACM0", Some("Arduino Micro")),
        ];
        let found = select(&ports, &ByDescription::default()).unwrap();
        assert_eq!(found.path, "/dev/ttyACM1");
        assert_eq!(DeviceRef::from(found).path(), "/dev/ttyACM1");
    }

    #[test]
    fn test_description_is_exact() {
        let ports = vec![port("/dev/ttyACM0", Some("arduino micro"))];
        assert_eq!(select(&ports, &ByDescription::new("Arduino Micro")), None);
    }

    #[test]
    fn test_usb_id_match() {
        let mut micro = port("/dev/ttyACM0", Some("Arduino Micro"));
        micro.vid = Some(0x2341);
        micro.pid = Some(0x8037);
        let ports = vec![port("/dev/ttyS0", None), micro];

        let matcher = ByUsbId {
            vid: 0x2341,
            pid: 0x8037,
        };
        assert_eq!(select(&ports, &matcher).unwrap().path, "/dev/ttyACM0");
        assert_eq!(matcher.to_string(), "2341:8037");
    }

    #[test]
    fn test_require_device() {
        let ports = vec![port("/dev/ttyS0", None), port("/dev/ttyACM0", Some("Arduino Micro"))];

        let device = require_device(&ports, &ByDescription::default()).unwrap();
        assert_eq!(device.path(), "/dev/ttyACM0");

        let err = require_device(&ports[..1], &ByDescription::default()).unwrap_err();
        assert!(matches!(&err, Error::DeviceNotFound(name) if name == "\"Arduino Micro\""));
        assert_eq!(
            err.to_string(),
            "No device matching \"Arduino Micro\" could be found"
        );
    }

    #[test]
    fn test_usb_id_from_str() {
        let matcher: ByUsbId = "2341:8037".parse().unwrap();
        assert_eq!(
            matcher,
            ByUsbId {
                vid: 0x2341,
                pid: 0x8037
            }
        );
        assert_eq!("2341:803f".parse::<ByUsbId>().unwrap().pid, 0x803F);
        assert!("2341".parse::<ByUsbId>().is_err());
        assert!("2341:zz".parse::<ByUsbId>().is_err());
        assert!("12345:0001".parse::<ByUsbId>().is_err());
    }

    #[test]
    fn test_descriptor_from_usb_info() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyACM0".to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x2341,
                pid: 0x8037,
                serial_number: None,
                manufacturer: Some("Arduino LLC".to_string()),
                product: Some("Arduino Micro".to_string()),
            }),
        };
        let usb = PortDescriptor::from(info);
        assert_eq!(usb.description.as_deref(), Some("Arduino Micro"));
        assert_eq!(usb.vid, Some(0x2341));
        assert!(ByDescription::default().matches(&usb));

        let info = SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::Unknown,
        };
        assert_eq!(PortDescriptor::from(info), port("/dev/ttyS0", None));
    }

    #[test]
    fn test_device_ref_defaults() {
        let device = DeviceRef::new("/dev/ttyACM0");
        assert_eq!(device.baud_rate(), 115_200);
        assert_eq!(device.timeout(), Duration::from_secs(1));
    }
}
