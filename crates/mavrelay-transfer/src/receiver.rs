use std::collections::HashMap;

use bytes::Bytes;
use mavrelay_frame::{EncapsulatedData, Envelope, Message, Origin};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, TransferError};
use crate::protocol::{TransferDescriptor, PACKET_CAPACITY};

/// Identifies one sending component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey {
    pub system_id: u8,
    pub component_id: u8,
}

impl From<Origin> for StreamKey {
    fn from(origin: Origin) -> Self {
        Self {
            system_id: origin.system_id,
            component_id: origin.component_id,
        }
    }
}

/// Which packet indices have arrived. 256 bits cover every u8 index.
#[derive(Debug, Clone, Default)]
struct DeliveryMask([u64; 4]);

impl DeliveryMask {
    /// Mark `index`; returns false if it was already set.
    fn insert(&mut self, index: u8) -> bool {
        let (word, bit) = (index as usize / 64, index as u32 % 64);
        let mask = 1u64 << bit;
        let fresh = self.0[word] & mask == 0;
        self.0[word] |= mask;
        fresh
    }

    fn count(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }
}

struct Session {
    descriptor: TransferDescriptor,
    buffer: Vec<u8>,
    delivered: DeliveryMask,
}

impl Session {
    fn new(descriptor: TransferDescriptor) -> Self {
        Self {
            buffer: vec![0; descriptor.packets as usize * PACKET_CAPACITY],
            delivered: DeliveryMask::default(),
            descriptor,
        }
    }
}

/// What a handshake did to the stream's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Opened,
    /// An incomplete session was discarded.
    Superseded { received: usize, packets: u8 },
    /// Zero-size handshakes are requests, not announcements.
    Ignored,
}

/// A fully reassembled payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub key: StreamKey,
    pub descriptor: TransferDescriptor,
    pub data: Bytes,
}

/// What a data packet did to the stream's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketOutcome {
    Pending { received: usize, packets: u8 },
    Complete(CompletedTransfer),
    /// Already seen; nothing changed.
    Duplicate,
    /// No handshake announced a transfer for this stream.
    NoSession,
}

/// Result of feeding an arbitrary envelope to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    Handshake(HandshakeOutcome),
    Packet(PacketOutcome),
}

/// Live reassembly sessions, at most one per sending component.
#[derive(Default)]
pub struct SessionTable {
    sessions: Mutex<HashMap<StreamKey, Session>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transfers in progress.
    pub fn live_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Open a session, replacing any incomplete one for the same stream.
    pub fn on_handshake(&self, key: StreamKey, descriptor: TransferDescriptor) -> HandshakeOutcome {
        if descriptor.packets == 0 {
            return HandshakeOutcome::Ignored;
        }
        let previous = self
            .sessions
            .lock()
            .insert(key, Session::new(descriptor));
        match previous {
            Some(old) => {
                let received = old.delivered.count();
                info!(
                    system = key.system_id,
                    component = key.component_id,
                    received,
                    packets = old.descriptor.packets,
                    "incomplete transfer superseded"
                );
                HandshakeOutcome::Superseded {
                    received,
                    packets: old.descriptor.packets,
                }
            }
            None => HandshakeOutcome::Opened,
        }
    }

    /// Store one data packet.
    ///
    /// An index at or beyond the announced packet count is an error and
    /// leaves the session untouched.
    pub fn on_packet(&self, key: StreamKey, packet: &EncapsulatedData) -> Result<PacketOutcome> {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(&key) else {
            return Ok(PacketOutcome::NoSession);
        };
        let packets = session.descriptor.packets;
        if packet.seqnr >= u16::from(packets) {
            return Err(TransferError::IndexOutOfRange {
                index: packet.seqnr,
                packets,
            });
        }
        let index = packet.seqnr as u8;
        if !session.delivered.insert(index) {
            return Ok(PacketOutcome::Duplicate);
        }

        let start = index as usize * PACKET_CAPACITY;
        let len = packet.data.len().min(PACKET_CAPACITY);
        session.buffer[start..start + len].copy_from_slice(&packet.data[..len]);

        let received = session.delivered.count();
        if received < packets as usize {
            return Ok(PacketOutcome::Pending { received, packets });
        }

        let Some(mut done) = sessions.remove(&key) else {
            return Ok(PacketOutcome::NoSession);
        };
        done.buffer.truncate(done.descriptor.size as usize);
        debug!(
            system = key.system_id,
            component = key.component_id,
            size = done.descriptor.size,
            "transfer complete"
        );
        Ok(PacketOutcome::Complete(CompletedTransfer {
            key,
            descriptor: done.descriptor,
            data: Bytes::from(done.buffer),
        }))
    }

    /// Route a handshake or data envelope; anything else yields `None`.
    ///
    /// Malformed descriptors and out-of-range indices are logged and dropped.
    pub fn handle(&self, envelope: &Envelope) -> Option<ReceiverEvent> {
        let key = StreamKey::from(envelope.origin());
        let message = match Message::decode(envelope) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "undecodable transfer message");
                return None;
            }
        };
        match message {
            Message::DataTransmissionHandshake(handshake) => {
                match TransferDescriptor::from_handshake(&handshake) {
                    Ok(descriptor) => {
                        Some(ReceiverEvent::Handshake(self.on_handshake(key, descriptor)))
                    }
                    Err(err) if handshake.size == 0 => {
                        debug!(error = %err, "ignoring transfer request");
                        Some(ReceiverEvent::Handshake(HandshakeOutcome::Ignored))
                    }
                    Err(err) => {
                        warn!(error = %err, "dropping handshake");
                        None
                    }
                }
            }
            Message::EncapsulatedData(packet) => match self.on_packet(key, &packet) {
                Ok(outcome) => Some(ReceiverEvent::Packet(outcome)),
                Err(err) => {
                    warn!(error = %err, "dropping data packet");
                    None
                }
            },
            _ => None,
        }
    }
}

impl std::fmt::Debug for SessionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTable")
            .field("live_sessions", &self.live_sessions())
            .finish()
    }
}
