//! Message envelopes and MAVLink 1.0 framing.
//!
//! Every message on the wire is framed as:
//! - A start byte (`0xFE`) for stream synchronization
//! - A 5-byte header: length, sequence, system id, component id, message id
//! - Up to 255 payload bytes
//! - A 2-byte X.25 checksum, seeded per message type where the seed is known
//!
//! The [`FrameParser`] consumes one byte at a time and keeps a running count
//! of corrupted frames; [`FrameReader`] and [`FrameWriter`] bind the codec to
//! a transport half.

pub mod codec;
pub mod error;
pub mod message;
pub mod msgid;
pub mod parser;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Envelope, FrameConfig, Origin, CHECKSUM_SIZE, HEADER_SIZE,
    MAX_PACKET_LEN, MAX_PAYLOAD, STX,
};
pub use error::{FrameError, Result};
pub use message::{
    DataTransmissionHandshake, EncapsulatedData, ExtendedHeader, Heartbeat, ImageTriggered,
    Message, Ping, SystemTime, ENCAPSULATED_DATA_LEN,
};
pub use parser::{FrameParser, ParserStats};
pub use reader::{FrameReader, ReadEvent};
pub use writer::FrameWriter;

/// Wall-clock time in microseconds since the Unix epoch, as carried in
/// `time_usec` fields and log timestamps.
pub fn unix_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_micros_is_past_2020() {
        // 2020-01-01T00:00:00Z
        assert!(unix_micros() > 1_577_836_800_000_000);
    }
}
