use std::ffi::CString;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::baud::resolve_baud;
use crate::error::{Result, TransportError};
use crate::traits::{write_fully, TransportRx, TransportTx};

/// Serial line settings. The line is always 8N1 without flow control.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Requested baud rate. Unsupported values fall back to 115200.
    pub baud: u32,
    /// How long a read may wait for the first byte before reporting no data.
    ///
    /// Rounded to tenths of a second (termios `VTIME`), clamped to 0.1–25.5 s.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud: crate::baud::DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// A raw-mode serial port.
///
/// Implements both transport halves; use [`SerialPort::try_clone`] to give
/// each bridge pump its own handle on the same device.
pub struct SerialPort {
    file: File,
    path: PathBuf,
    baud: u32,
}

impl SerialPort {
    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| TransportError::Open {
            path: path.clone(),
            source: std::io::Error::new(ErrorKind::InvalidInput, "path contains a NUL byte"),
        })?;

        // O_NOCTTY keeps the port from becoming our controlling terminal;
        // O_NDELAY avoids blocking on DCD while opening.
        // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
        let fd = unsafe {
            libc::open(
                c_path.as_ptr(),
                libc::O_RDWR | libc::O_NOCTTY | libc::O_NDELAY,
            )
        };
        if fd < 0 {
            return Err(TransportError::Open {
                path,
                source: std::io::Error::last_os_error(),
            });
        }
        // SAFETY: `fd` was just returned by `open` and is owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        // Back to blocking reads; VTIME bounds how long they block.
        // SAFETY: `fd` is an open descriptor owned by this function.
        if unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, 0) } < 0 {
            return Err(TransportError::Open {
                path,
                source: std::io::Error::last_os_error(),
            });
        }

        let baud = resolve_baud(config.baud);
        let port = Self {
            file: File::from(fd),
            path,
            baud,
        };
        port.configure(baud, config.read_timeout)?;

        info!(path = ?port.path, baud, "serial port configured (8N1)");
        Ok(port)
    }

    fn configure(&self, baud: u32, read_timeout: Duration) -> Result<()> {
        let fd = self.file.as_raw_fd();
        // SAFETY: `fd` is an open descriptor owned by `self.file`.
        if unsafe { libc::isatty(fd) } != 1 {
            return Err(self.configure_error("file descriptor is not a serial port"));
        }

        // SAFETY: termios is a plain C struct; all-zero is a valid bit pattern
        // and `tcgetattr` overwrites it entirely on success.
        let mut tio: libc::termios = unsafe { std::mem::zeroed() };
        // SAFETY: `tio` is a valid writable termios.
        if unsafe { libc::tcgetattr(fd, &mut tio) } < 0 {
            return Err(self.configure_error("could not read port configuration"));
        }

        tio.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::ICRNL
            | libc::INLCR
            | libc::PARMRK
            | libc::INPCK
            | libc::ISTRIP
            | libc::IXON);
        tio.c_oflag = 0;
        tio.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::IEXTEN | libc::ISIG);
        tio.c_cflag &= !(libc::CSIZE | libc::PARENB);
        tio.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;

        // VMIN = 0 with VTIME set: a read returns after the first byte or
        // after the timeout with nothing.
        tio.c_cc[libc::VMIN] = 0;
        tio.c_cc[libc::VTIME] = deciseconds(read_timeout);

        let speed = speed_constant(baud)
            .ok_or_else(|| self.configure_error(&format!("baud rate {baud} unavailable")))?;
        // SAFETY: `tio` is a valid termios obtained from `tcgetattr`.
        let rc = unsafe {
            libc::cfsetispeed(&mut tio, speed) | libc::cfsetospeed(&mut tio, speed)
        };
        if rc < 0 {
            return Err(self.configure_error(&format!("could not set baud rate {baud}")));
        }

        // SAFETY: `fd` is open and `tio` is fully initialized.
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &tio) } < 0 {
            return Err(self.configure_error("could not apply port configuration"));
        }
        Ok(())
    }

    fn configure_error(&self, reason: &str) -> TransportError {
        TransportError::Configure {
            path: self.path.clone(),
            reason: format!("{reason}: {}", std::io::Error::last_os_error()),
        }
    }

    /// Duplicate the descriptor so another thread can own a handle.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
            baud: self.baud,
        })
    }

    /// Device path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Baud rate actually configured.
    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Block until every queued byte has left the UART.
    fn drain(&self) -> Result<()> {
        loop {
            // SAFETY: the descriptor is owned by `self.file` and open.
            if unsafe { libc::tcdrain(self.file.as_raw_fd()) } == 0 {
                return Ok(());
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != ErrorKind::Interrupted {
                return Err(TransportError::Io(err));
            }
        }
    }
}

impl TransportRx for SerialPort {
    fn receive_one_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.file.read(&mut byte) {
                // With VMIN = 0 a zero-length read is the VTIME timeout.
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl TransportTx for SerialPort {
    fn send(&mut self, bytes: &[u8]) -> Result<usize> {
        let written = write_fully(&mut self.file, bytes)?;
        self.drain()?;
        debug!(bytes = written, "serial write drained");
        Ok(written)
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("baud", &self.baud)
            .finish()
    }
}

fn deciseconds(timeout: Duration) -> libc::cc_t {
    let tenths = timeout.as_millis().div_ceil(100).clamp(1, 255);
    tenths as libc::cc_t
}

fn speed_constant(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        1800 => libc::B1800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115_200 => libc::B115200,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        460_800 => libc::B460800,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        921_600 => libc::B921600,
        _ => return None,
    };
    Some(speed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn open_missing_device_fails() {
        let result = SerialPort::open("/dev/mavrelay-does-not-exist", &SerialConfig::default());
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    fn open_non_tty_fails_configuration() {
        let result = SerialPort::open("/dev/null", &SerialConfig::default());
        assert!(matches!(result, Err(TransportError::Configure { .. })));
    }

    #[test]
    fn deciseconds_are_clamped() {
        assert_eq!(deciseconds(Duration::from_millis(0)), 1);
        assert_eq!(deciseconds(Duration::from_millis(150)), 2);
        assert_eq!(deciseconds(Duration::from_secs(1)), 10);
        assert_eq!(deciseconds(Duration::from_secs(60)), 255);
    }

    #[test]
    fn every_supported_rate_has_a_speed_constant() {
        for &rate in crate::baud::SUPPORTED_BAUD_RATES {
            assert!(speed_constant(rate).is_some(), "missing constant for {rate}");
        }
        assert!(speed_constant(4800).is_none());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn pty_roundtrip() {
        let (master, slave_path) = open_pty();
        let mut master = File::from(master);

        let config = SerialConfig {
            baud: 57600,
            read_timeout: Duration::from_millis(200),
        };
        let mut port = SerialPort::open(&slave_path, &config).unwrap();
        assert_eq!(port.baud(), 57600);

        master.write_all(&[0xFE, 0x01]).unwrap();
        assert_eq!(port.receive_one_byte().unwrap(), Some(0xFE));
        assert_eq!(port.receive_one_byte().unwrap(), Some(0x01));
        // Nothing left: the VTIME timeout reports no data.
        assert_eq!(port.receive_one_byte().unwrap(), None);

        let written = port.send(b"ok").unwrap();
        assert_eq!(written, 2);
        let mut buf = [0u8; 2];
        master.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ok");
    }

    #[cfg(target_os = "linux")]
    fn open_pty() -> (OwnedFd, PathBuf) {
        // SAFETY: plain libc pty allocation; every return value is checked.
        unsafe {
            let fd = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            assert!(fd >= 0, "posix_openpt failed");
            assert_eq!(libc::grantpt(fd), 0);
            assert_eq!(libc::unlockpt(fd), 0);
            let mut name = [0 as libc::c_char; 128];
            assert_eq!(libc::ptsname_r(fd, name.as_mut_ptr(), name.len()), 0);
            let path = std::ffi::CStr::from_ptr(name.as_ptr())
                .to_string_lossy()
                .into_owned();
            (OwnedFd::from_raw_fd(fd), PathBuf::from(path))
        }
    }
}
