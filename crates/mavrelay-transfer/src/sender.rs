use bytes::Bytes;
use mavrelay_frame::{EncapsulatedData, Envelope, Origin};
use tracing::{debug, info};

use crate::error::Result;
use crate::protocol::{DataType, TransferDescriptor, PACKET_CAPACITY};

/// Where the sender is in a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Idle,
    HandshakeSent,
    Streaming,
}

/// Result of asking the sender to start a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Transfer started; publish this handshake first.
    Started {
        handshake: Envelope,
        descriptor: TransferDescriptor,
    },
    /// A transfer is already in progress; the trigger was dropped.
    Dropped,
}

struct Active {
    descriptor: TransferDescriptor,
    data: Bytes,
    next_index: u8,
}

/// Splits one payload at a time into a handshake and data packets.
///
/// Idle → HandshakeSent → Streaming → Idle. Triggers that arrive while a
/// transfer is in progress are dropped and counted.
pub struct ChunkSender {
    origin: Origin,
    state: SenderState,
    active: Option<Active>,
    dropped: u64,
    completed: u64,
}

impl ChunkSender {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            state: SenderState::Idle,
            active: None,
            dropped: 0,
            completed: 0,
        }
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Triggers dropped because a transfer was in progress.
    pub fn dropped_triggers(&self) -> u64 {
        self.dropped
    }

    /// Transfers fully handed out.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Start a transfer of `data`, taking ownership of it until the last packet.
    pub fn begin(
        &mut self,
        data: Bytes,
        data_type: DataType,
        quality: u8,
        width: u16,
        height: u16,
    ) -> Result<TriggerOutcome> {
        if self.state != SenderState::Idle {
            self.dropped += 1;
            debug!(dropped = self.dropped, "transfer in progress, trigger dropped");
            return Ok(TriggerOutcome::Dropped);
        }
        let descriptor = TransferDescriptor::plan(data_type, data.len(), quality, width, height)?;
        let handshake = descriptor.to_handshake().to_envelope(self.origin);

        info!(
            size = descriptor.size,
            packets = descriptor.packets,
            quality = descriptor.quality,
            "starting transfer"
        );
        self.active = Some(Active {
            descriptor,
            data,
            next_index: 0,
        });
        self.state = SenderState::HandshakeSent;
        Ok(TriggerOutcome::Started {
            handshake,
            descriptor,
        })
    }

    /// Next data packet, in increasing index order.
    ///
    /// Returns `None` once every packet has been handed out; the sender is
    /// then idle again.
    pub fn next_packet(&mut self) -> Option<Envelope> {
        let active = self.active.as_mut()?;
        if active.next_index as usize >= active.descriptor.packets as usize {
            self.finish();
            return None;
        }

        let index = active.next_index;
        let start = index as usize * PACKET_CAPACITY;
        let len = active.descriptor.packet_len(index);
        let packet = EncapsulatedData {
            seqnr: u16::from(index),
            data: active.data.slice(start..start + len),
        };
        active.next_index = active.next_index.saturating_add(1);
        self.state = SenderState::Streaming;

        if active.next_index == active.descriptor.packets {
            self.finish();
        }
        Some(packet.to_envelope(self.origin))
    }

    fn finish(&mut self) {
        if self.active.take().is_some() {
            self.completed += 1;
        }
        self.state = SenderState::Idle;
    }
}

impl std::fmt::Debug for ChunkSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSender")
            .field("origin", &self.origin)
            .field("state", &self.state)
            .field("dropped", &self.dropped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use mavrelay_frame::{msgid, DataTransmissionHandshake, ENCAPSULATED_DATA_LEN};

    use super::*;

    fn payload(len: usize) -> Bytes {
        (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
    }

    #[test]
    fn streams_handshake_then_packets_in_order() {
        let mut sender = ChunkSender::new(Origin::new(42, 30));
        let TriggerOutcome::Started {
            handshake,
            descriptor,
        } = sender
            .begin(payload(10_000), DataType::Jpeg, 70, 640, 480)
            .unwrap()
        else {
            panic!("expected start");
        };
        assert_eq!(sender.state(), SenderState::HandshakeSent);
        assert_eq!(handshake.msg_id, msgid::DATA_TRANSMISSION_HANDSHAKE);
        let decoded = DataTransmissionHandshake::decode(&handshake.payload).unwrap();
        assert_eq!(decoded.packets, 40);
        assert_eq!(decoded.jpg_quality, 70);
        assert_eq!(descriptor.size, 10_000);

        let packets: Vec<Envelope> = std::iter::from_fn(|| sender.next_packet()).collect();
        assert_eq!(packets.len(), 40);
        for (i, packet) in packets.iter().enumerate() {
            let data = EncapsulatedData::decode(&packet.payload).unwrap();
            assert_eq!(data.seqnr as usize, i);
            assert_eq!(data.data.len(), ENCAPSULATED_DATA_LEN);
        }
        let tail = EncapsulatedData::decode(&packets[39].payload).unwrap();
        assert_eq!(tail.data[132], (9_999 % 251) as u8);
        assert!(tail.data[133..].iter().all(|&b| b == 0));
        assert_eq!(sender.state(), SenderState::Idle);
        assert_eq!(sender.completed(), 1);
    }

    #[test]
    fn triggers_while_busy_are_dropped() {
        let mut sender = ChunkSender::new(Origin::new(1, 1));
        assert!(matches!(
            sender.begin(payload(600), DataType::Raw, 60, 1, 1).unwrap(),
            TriggerOutcome::Started { .. }
        ));
        sender.next_packet().unwrap();
        assert_eq!(sender.state(), SenderState::Streaming);

        assert_eq!(
            sender.begin(payload(10), DataType::Raw, 60, 1, 1).unwrap(),
            TriggerOutcome::Dropped
        );
        assert_eq!(sender.dropped_triggers(), 1);

        while sender.next_packet().is_some() {}
        assert!(matches!(
            sender.begin(payload(10), DataType::Raw, 60, 1, 1).unwrap(),
            TriggerOutcome::Started { .. }
        ));
    }

    #[test]
    fn oversized_payload_leaves_sender_idle() {
        let mut sender = ChunkSender::new(Origin::new(1, 1));
        assert!(sender
            .begin(payload(255 * 253 + 1), DataType::Raw, 60, 1, 1)
            .is_err());
        assert_eq!(sender.state(), SenderState::Idle);
        assert!(sender.next_packet().is_none());
    }
}
