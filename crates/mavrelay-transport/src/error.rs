use std::io::ErrorKind;
use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device or stream.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The device opened but could not be configured.
    #[error("failed to configure {path}: {reason}")]
    Configure { path: PathBuf, reason: String },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer bytes than requested reached the device.
    #[error("short write: wrote {written} bytes but should have written {expected}")]
    ShortWrite { written: usize, expected: usize },

    /// The peer hung up or the stream reached end of file.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Whether the transport is gone for good.
    ///
    /// Fatal errors end the pump that observed them. Everything else is a
    /// transient fault: it is logged and the next iteration proceeds.
    pub fn is_fatal(&self) -> bool {
        match self {
            TransportError::Open { .. } | TransportError::Configure { .. } => true,
            TransportError::Closed => true,
            TransportError::Io(err) => matches!(
                err.kind(),
                ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
            ),
            TransportError::ShortWrite { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
