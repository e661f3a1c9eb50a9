use std::net::SocketAddr;

/// Errors from bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Failed to set up the bus socket.
    #[error("failed to join bus at {addr}: {source}")]
    Join {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Socket I/O failed.
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The message does not fit in one bus datagram.
    #[error("bus message too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    /// A received datagram could not be decoded.
    #[error("malformed bus datagram: {0}")]
    Malformed(String),

    /// The envelope could not be framed or unframed.
    #[error("frame error: {0}")]
    Frame(#[from] mavrelay_frame::FrameError),

    /// The bus went away.
    #[error("bus closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BusError>;
