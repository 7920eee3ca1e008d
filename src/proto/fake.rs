use std::pin::Pin;
use std::sync::{Arc, Mutex};

use super::transport::SerialLink;

/// Bytes written to a [`FakeBuffer`], shared with the test.
#[derive(Clone, Default)]
pub(crate) struct WireLog(Arc<Mutex<Vec<u8>>>);

impl WireLog {
    /// Lines written so far, without terminators.
    pub(crate) fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .split_terminator("\r\n")
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// In-memory serial port. Replies are handed out in order; once they run
/// out, reads stay pending like a silent instrument.
pub(crate) struct FakeBuffer {
    response_buf: Vec<u8>,
    written: WireLog,
    writes: usize,
    failing_write: Option<usize>,
}

impl FakeBuffer {
    pub(crate) fn new(response: &str) -> Self {
        Self {
            response_buf: response.as_bytes().to_vec(),
            written: WireLog::default(),
            writes: 0,
            failing_write: None,
        }
    }

    /// Makes the `nth` write (1-based) fail once with a broken pipe. The
    /// bytes stay queued in the framed writer and go out with the next one.
    pub(crate) fn fail_write_once(mut self, nth: usize) -> Self {
        self.failing_write = Some(nth);
        self
    }

    pub(crate) fn wire(&self) -> WireLog {
        self.written.clone()
    }
}

impl SerialLink for FakeBuffer {
    fn discard_buffers(&mut self) -> super::Result<()> {
        self.response_buf.clear();
        Ok(())
    }
}

impl tokio::io::AsyncRead for FakeBuffer {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        if self.response_buf.is_empty() {
            return std::task::Poll::Pending;
        }
        let c = if buf.remaining() < self.response_buf.len() {
            buf.remaining()
        } else {
            self.response_buf.len()
        };
        buf.put_slice(&self.response_buf[0..c]);
        self.response_buf.drain(0..c);
        std::task::Poll::Ready(Ok(()))
    }
}

impl tokio::io::AsyncWrite for FakeBuffer {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::result::Result<usize, std::io::Error>> {
        self.writes += 1;
        if self.failing_write == Some(self.writes) {
            return std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "write failed",
            )));
        }
        self.written.0.lock().unwrap().extend_from_slice(buf);
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}
