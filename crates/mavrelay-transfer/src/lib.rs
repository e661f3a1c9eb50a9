//! Chunked transfer of payloads larger than one message.
//!
//! A transfer is a DATA_TRANSMISSION_HANDSHAKE descriptor followed by
//! `packets` ENCAPSULATED_DATA messages of [`PACKET_CAPACITY`] bytes each,
//! the last one zero-padded. Receivers reassemble per sending component and
//! accept packets in any order.

pub mod error;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod source;
pub mod streamer;

pub use error::{Result, TransferError};
pub use protocol::{
    normalize_quality, packet_count, DataType, TransferDescriptor, DEFAULT_QUALITY,
    MAX_TRANSFER_SIZE, PACKET_CAPACITY,
};
pub use receiver::{
    CompletedTransfer, HandshakeOutcome, PacketOutcome, ReceiverEvent, SessionTable, StreamKey,
};
pub use sender::{ChunkSender, SenderState, TriggerOutcome};
pub use source::{DirectoryFrameSource, FrameSource, ImageFrame, Orientation};
pub use streamer::{run_streamer, StreamerStats, TransferConfig};
