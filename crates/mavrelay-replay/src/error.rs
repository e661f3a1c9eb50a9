use std::path::PathBuf;

/// Errors from reading, writing, or replaying a session log.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The log file could not be opened or created.
    #[error("failed to open log {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error while reading or writing records.
    #[error("log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The log ends inside a record.
    #[error("log truncated at byte {offset}: need {need} more bytes")]
    Truncated { offset: u64, need: usize },

    /// An extended trailer longer than any sane record.
    #[error("extended trailer of {len} bytes exceeds {max}")]
    TrailerTooLarge { len: u32, max: u32 },

    /// An image file could not be read.
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The start timestamp never appeared in the log.
    #[error("start timestamp {start} not found in log")]
    StartNotReached { start: u64 },

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] mavrelay_frame::FrameError),

    /// Bus error.
    #[error("bus error: {0}")]
    Bus(#[from] mavrelay_bus::BusError),

    /// Image transfer error.
    #[error("transfer error: {0}")]
    Transfer(#[from] mavrelay_transfer::TransferError),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
