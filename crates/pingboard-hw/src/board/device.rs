//! Board transport: one write-then-acknowledge handshake over a serial port.

use crate::locator::DeviceRef;
use crate::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info, warn};

use super::protocol::{Command, ACK_LINE};

/// Opens a byte stream to a located device.
///
/// The returned port is owned by a single transaction and closed when it is
/// dropped.
pub trait Link {
    type Port: AsyncRead + AsyncWrite + Unpin;

    fn open(&self, device: &DeviceRef) -> Result<Self::Port>;
}

/// Serial port link backed by tokio-serial.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialLink;

impl Link for SerialLink {
    type Port = SerialStream;

    fn open(&self, device: &DeviceRef) -> Result<SerialStream> {
        tokio_serial::new(device.path(), device.baud_rate())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(device.timeout())
            .open_native_async()
            .map_err(|source| Error::Open {
                port: device.path().to_string(),
                source,
            })
    }
}

/// Runs command transactions over a [`Link`].
#[derive(Debug, Clone, Default)]
pub struct Transport<L = SerialLink> {
    link: L,
}

impl<L: Link> Transport<L> {
    /// Creates a transport over the given link.
    pub fn new(link: L) -> Self {
        Self { link }
    }

    /// Sends one command and waits for the acknowledgment.
    ///
    /// The device handle is consumed: the port opened for it is closed before
    /// this returns, whatever the outcome.
    pub async fn send(&self, device: DeviceRef, command: &Command) -> Result<()> {
        let line = command.encode();

        let port = self.link.open(&device)?;
        debug!("Opened {} at {} baud", device.path(), device.baud_rate());

        let response = exchange(port, &line, &device).await?;
        debug!("Closed {}", device.path());

        match response {
            Reply::Line(raw) if raw == ACK_LINE => {
                info!("{} acknowledged by {}", command, device.path());
                Ok(())
            }
            Reply::Line(raw) => {
                warn!("{} rejected by {}: {:?}", command, device.path(), raw);
                Err(Error::Rejected(raw))
            }
            Reply::TimedOut(partial) => {
                warn!(
                    "No response from {} within {:?} (received {:?})",
                    device.path(),
                    device.timeout(),
                    partial
                );
                Err(Error::Timeout { partial })
            }
        }
    }
}

/// What came back from the board before the port was closed.
enum Reply {
    /// A terminated line, or whatever arrived before end of stream.
    Line(String),
    /// The read timeout elapsed; holds any partial text.
    TimedOut(String),
}

/// Writes the framed line and reads one response line.
///
/// Takes the port by value so it is dropped, and the connection closed, on
/// every return path.
async fn exchange<P>(port: P, line: &str, device: &DeviceRef) -> Result<Reply>
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    let mut port = BufReader::new(port);

    debug!("Sending to {}: {:?}", device.path(), line);
    port.write_all(line.as_bytes()).await?;
    port.flush().await?;

    // Garbled bytes are kept as text so they can be shown to the user.
    let mut response = Vec::new();
    let read = tokio::time::timeout(device.timeout(), port.read_until(b'\n', &mut response)).await;
    let text = String::from_utf8_lossy(&response).into_owned();
    match read {
        Ok(read) => {
            read?;
            debug!("Received from {}: {:?}", device.path(), text);
            Ok(Reply::Line(text))
        }
        Err(_) => Ok(Reply::TimedOut(text)),
    }
}

/// Sends a command over the real serial port of `device`.
pub async fn send(device: DeviceRef, command: &Command) -> Result<()> {
    Transport::new(SerialLink).send(device, command).await
}
