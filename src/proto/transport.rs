use futures::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{Decoder, Framed};

use super::codec::LineCodec;
use super::command::Command;
use super::{ProtoError, Result};

/// Byte channel underneath a [`Transport`].
pub trait SerialLink: AsyncRead + AsyncWrite + Unpin + Send {
    /// Drop unread input and unsent output held by the driver.
    fn discard_buffers(&mut self) -> Result<()>;
}

impl SerialLink for SerialStream {
    fn discard_buffers(&mut self) -> Result<()> {
        Ok(self.clear(ClearBuffer::All)?)
    }
}

/// Line framed serial channel.
///
/// A transport starts closed. Until it is opened the read timeout is zero,
/// so nothing ever blocks; every I/O call fails with [`ProtoError::NotOpen`].
pub struct Transport {
    stream: Option<Framed<Box<dyn SerialLink>, LineCodec>>,
    timeout: Duration,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            stream: None,
            timeout: Duration::ZERO,
        }
    }

    /// Opens the serial port and frames it.
    pub fn open(&mut self, com: impl AsRef<str>, baudrate: u32, timeout: Duration) -> Result<()> {
        if self.is_open() {
            return Err(ProtoError::AlreadyOpen);
        }
        #[allow(unused_mut)]
        let mut port = tokio_serial::new(com.as_ref(), baudrate)
            .timeout(timeout)
            .open_native_async()?;

        #[cfg(unix)]
        port.set_exclusive(false)?;

        self.attach(Box::new(port), timeout)
    }

    /// Frames an already opened link.
    pub fn attach(&mut self, link: Box<dyn SerialLink>, timeout: Duration) -> Result<()> {
        if self.is_open() {
            return Err(ProtoError::AlreadyOpen);
        }
        self.stream = Some(LineCodec.framed(link));
        self.timeout = timeout;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Releases the port. Closing a closed transport does nothing.
    pub fn close(&mut self) {
        self.stream = None;
        self.timeout = Duration::ZERO;
    }

    fn stream(&mut self) -> Result<&mut Framed<Box<dyn SerialLink>, LineCodec>> {
        self.stream.as_mut().ok_or(ProtoError::NotOpen)
    }

    /// Writes one command line. Nothing is read back.
    pub async fn send(&mut self, cmd: Command) -> Result<()> {
        debug!("> {}", cmd);
        self.stream()?.send(cmd).await?;
        Ok(())
    }

    /// Reads the next line.
    ///
    /// Returns an empty string when no complete line arrives within the
    /// read timeout.
    pub async fn receive(&mut self) -> Result<String> {
        let timeout = self.timeout;
        let stream = self.stream()?;
        match tokio::time::timeout(timeout, stream.next()).await {
            Ok(Some(Ok(line))) => {
                trace!("< {}", line);
                Ok(line)
            }
            Ok(Some(Err(ioerr))) => Err(ioerr.into()),
            Ok(None) => Err(ProtoError::Abort),
            Err(_elapsed) => {
                warn!("No reply within {:?}", timeout);
                Ok(String::new())
            }
        }
    }

    pub async fn send_and_receive(&mut self, cmd: Command) -> Result<String> {
        self.send(cmd).await?;
        self.receive().await
    }

    /// Discards buffered input and pending output on both sides of the codec.
    pub fn reset_buffer(&mut self) -> Result<()> {
        let stream = self.stream()?;
        stream.read_buffer_mut().clear();
        stream.write_buffer_mut().clear();
        stream.get_mut().discard_buffers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::fake::FakeBuffer;

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn faked(response: &str) -> (Transport, crate::proto::fake::WireLog) {
        let fake = FakeBuffer::new(response);
        let wire = fake.wire();
        let mut transport = Transport::new();
        transport.attach(Box::new(fake), TIMEOUT).unwrap();
        (transport, wire)
    }

    #[tokio::test]
    async fn closed_transport_refuses_io() {
        let mut transport = Transport::new();
        assert!(!transport.is_open());
        assert!(matches!(
            transport.send(Command::Trigger).await,
            Err(ProtoError::NotOpen)
        ));
        assert!(matches!(transport.receive().await, Err(ProtoError::NotOpen)));
        assert!(matches!(transport.reset_buffer(), Err(ProtoError::NotOpen)));
    }

    #[tokio::test]
    async fn send_writes_terminated_line() {
        let (mut transport, wire) = faked("");
        transport.send(Command::Trigger).await.unwrap();
        transport
            .send(Command::Raw(":DISP OFF".to_string()))
            .await
            .unwrap();
        assert_eq!(wire.lines(), vec!["*TRG", ":DISP OFF"]);
    }

    #[tokio::test]
    async fn query_reads_one_line() {
        let (mut transport, wire) = faked("1.00000E+03\r\nZ\r\n");
        let reply = transport
            .send_and_receive(Command::GetFrequency)
            .await
            .unwrap();
        assert_eq!(reply, "1.00000E+03");
        assert_eq!(wire.lines(), vec![":FREQ?"]);
        assert_eq!(transport.receive().await.unwrap(), "Z");
    }

    #[tokio::test]
    async fn silent_device_yields_empty_reply() {
        let (mut transport, _wire) = faked("");
        assert_eq!(transport.receive().await.unwrap(), "");
    }

    #[tokio::test]
    async fn reset_buffer_drops_unread_input() {
        let (mut transport, _wire) = faked("stale\r\n");
        transport.reset_buffer().unwrap();
        assert_eq!(transport.receive().await.unwrap(), "");
    }

    #[tokio::test]
    async fn attach_twice_fails() {
        let (mut transport, _wire) = faked("");
        assert!(matches!(
            transport.attach(Box::new(FakeBuffer::new("")), TIMEOUT),
            Err(ProtoError::AlreadyOpen)
        ));
        transport.close();
        assert!(!transport.is_open());
        transport.close();
    }
}
