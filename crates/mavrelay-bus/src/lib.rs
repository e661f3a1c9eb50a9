//! Topic-based publish/subscribe bus shared by every mavrelay process.
//!
//! Two implementations sit behind the [`Bus`] trait:
//! - [`MemoryBus`]: in-process fan-out, for tests and embedding
//! - [`UdpBus`]: UDP multicast, so separate processes on a host share a bus
//!
//! Publishers receive their own messages, as any other subscriber would.

pub mod error;
pub mod memory;
pub mod message;
pub mod udp;

use std::time::Duration;

pub use error::{BusError, Result};
pub use memory::{MemoryBus, MemorySubscription};
pub use message::{decode_datagram, encode_datagram, BusMessage, LinkKind};
pub use udp::{BusConfig, UdpBus, UdpSubscription, DEFAULT_GROUP, DEFAULT_PORT};

/// Topic carrying every relayed message.
pub const MAVLINK: &str = "MAVLINK";

/// Topic carrying chunked image transfers.
pub const IMAGES: &str = "IMAGES";

/// A publish/subscribe bus.
pub trait Bus: Send + Sync {
    type Subscription: BusSubscription + 'static;

    /// Publish a message to every current subscriber of `topic`.
    fn publish(&self, topic: &str, message: &BusMessage) -> Result<()>;

    /// Start receiving messages published on `topic` from now on.
    fn subscribe(&self, topic: &str) -> Result<Self::Subscription>;
}

/// Receiving end of a topic subscription.
pub trait BusSubscription: Send {
    /// Wait up to `timeout` for the next message.
    ///
    /// Returns `Ok(None)` when the timeout elapses first.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<BusMessage>>;
}
