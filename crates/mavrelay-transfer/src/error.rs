use std::path::PathBuf;

/// Errors from chunked transfers.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The payload needs more packets than a descriptor can announce.
    #[error("payload too large for one transfer ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    /// Nothing to send.
    #[error("empty payload")]
    Empty,

    /// A data packet index beyond the announced packet count.
    #[error("packet index {index} out of range (transfer has {packets} packets)")]
    IndexOutOfRange { index: u16, packets: u8 },

    /// A descriptor that contradicts itself.
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// Frame source I/O failed.
    #[error("failed to read frame {path}: {source}")]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] mavrelay_frame::FrameError),

    /// Bus error.
    #[error("bus error: {0}")]
    Bus(#[from] mavrelay_bus::BusError),
}

pub type Result<T> = std::result::Result<T, TransferError>;
