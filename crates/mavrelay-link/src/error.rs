/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] mavrelay_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] mavrelay_frame::FrameError),

    /// Bus error.
    #[error("bus error: {0}")]
    Bus(#[from] mavrelay_bus::BusError),

    /// A pump thread could not be started.
    #[error("failed to spawn {name} pump: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    /// A pump thread panicked.
    #[error("{0} pump panicked")]
    PumpPanicked(&'static str),
}

pub type Result<T> = std::result::Result<T, LinkError>;
