/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame does not begin with the start byte.
    #[error("invalid start byte 0x{0:02x} (expected 0xfe)")]
    InvalidStart(u8),

    /// The payload exceeds what a single frame can carry.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The buffer ended before the frame did.
    #[error("incomplete frame ({have} of {need} bytes)")]
    Incomplete { have: usize, need: usize },

    /// The checksum does not match the frame contents.
    #[error("checksum mismatch for message {msg_id}: got 0x{got:04x}, expected 0x{expected:04x}")]
    Checksum { msg_id: u8, got: u16, expected: u16 },

    /// A typed payload is shorter than its message definition.
    #[error("message {msg_id} payload truncated ({actual} bytes, need {expected})")]
    Truncated {
        msg_id: u8,
        expected: usize,
        actual: usize,
    },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] mavrelay_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
