use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransportError};

/// Receive half of a byte transport.
///
/// The bridge reads one byte at a time so the incremental frame parser can
/// act on every byte as soon as it arrives.
pub trait TransportRx: Send {
    /// Block until one byte arrives.
    ///
    /// Returns `Ok(None)` when the transport's read timeout elapsed without
    /// data, which gives the caller a chance to check for shutdown.
    fn receive_one_byte(&mut self) -> Result<Option<u8>>;
}

/// Send half of a byte transport.
pub trait TransportTx: Send {
    /// Write all of `bytes` and wait until they have been transmitted.
    ///
    /// Returns the number of bytes written. A partial write is reported as
    /// [`TransportError::ShortWrite`].
    fn send(&mut self, bytes: &[u8]) -> Result<usize>;
}

/// Receive half over any `Read` stream.
#[derive(Debug)]
pub struct StreamReceiver<R> {
    inner: R,
}

impl<R: Read + Send> StreamReceiver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Consume the receiver and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Send> TransportRx for StreamReceiver<R> {
    fn receive_one_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

/// Send half over any `Write` stream.
///
/// `flush` stands in for the transmit drain of a real device.
#[derive(Debug)]
pub struct StreamSender<W> {
    inner: W,
}

impl<W: Write + Send> StreamSender<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the sender and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> TransportTx for StreamSender<W> {
    fn send(&mut self, bytes: &[u8]) -> Result<usize> {
        let written = write_fully(&mut self.inner, bytes)?;
        loop {
            match self.inner.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(written)
    }
}

/// Write loop shared by every sender: retries interrupted writes and turns
/// a stalled device into a short-write report.
pub(crate) fn write_fully<W: Write + ?Sized>(inner: &mut W, bytes: &[u8]) -> Result<usize> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) if offset == 0 => return Err(TransportError::Closed),
            Ok(0) => {
                return Err(TransportError::ShortWrite {
                    written: offset,
                    expected: bytes.len(),
                })
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if offset > 0 && err.kind() == ErrorKind::WouldBlock => {
                return Err(TransportError::ShortWrite {
                    written: offset,
                    expected: bytes.len(),
                })
            }
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn receives_bytes_in_order() {
        let mut rx = StreamReceiver::new(Cursor::new(vec![0xFE, 0x09, 0x01]));
        assert_eq!(rx.receive_one_byte().unwrap(), Some(0xFE));
        assert_eq!(rx.receive_one_byte().unwrap(), Some(0x09));
        assert_eq!(rx.receive_one_byte().unwrap(), Some(0x01));
        assert!(matches!(
            rx.receive_one_byte(),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn timeout_yields_no_data() {
        let mut rx = StreamReceiver::new(TimeoutThenByte { fired: false });
        assert_eq!(rx.receive_one_byte().unwrap(), None);
        assert_eq!(rx.receive_one_byte().unwrap(), Some(0x42));
    }

    #[test]
    fn send_writes_everything() {
        let mut tx = StreamSender::new(Vec::new());
        let written = tx.send(b"hello radio").unwrap();
        assert_eq!(written, 11);
        assert_eq!(tx.into_inner(), b"hello radio");
    }

    #[test]
    fn stalled_writer_reports_short_write() {
        let mut tx = StreamSender::new(StallAfter {
            budget: 4,
            sink: Vec::new(),
        });
        let err = tx.send(b"0123456789").unwrap_err();
        assert!(matches!(
            err,
            TransportError::ShortWrite {
                written: 4,
                expected: 10
            }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn closed_writer_is_fatal() {
        let mut tx = StreamSender::new(StallAfter {
            budget: 0,
            sink: Vec::new(),
        });
        let err = tx.send(b"x").unwrap_err();
        assert!(matches!(err, TransportError::Closed));
        assert!(err.is_fatal());
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut tx = StreamSender::new(left);
        let mut rx = StreamReceiver::new(right);

        tx.send(&[1, 2, 3]).unwrap();
        assert_eq!(rx.receive_one_byte().unwrap(), Some(1));
        assert_eq!(rx.receive_one_byte().unwrap(), Some(2));
        assert_eq!(rx.receive_one_byte().unwrap(), Some(3));
    }

    struct TimeoutThenByte {
        fired: bool,
    }

    impl Read for TimeoutThenByte {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.fired {
                self.fired = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            buf[0] = 0x42;
            Ok(1)
        }
    }

    struct StallAfter {
        budget: usize,
        sink: Vec<u8>,
    }

    impl Write for StallAfter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.sink.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
