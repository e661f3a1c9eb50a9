//! Typed views of the messages this system produces or inspects.
//!
//! Everything else stays an opaque [`Message::Other`]; the bridge never needs
//! to look inside those payloads.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{Envelope, Origin};
use crate::error::{FrameError, Result};
use crate::msgid;

/// Data bytes carried by one ENCAPSULATED_DATA message.
pub const ENCAPSULATED_DATA_LEN: usize = 253;

/// Decoded message, one variant per type the system acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Heartbeat(Heartbeat),
    SystemTime(SystemTime),
    Ping(Ping),
    DataTransmissionHandshake(DataTransmissionHandshake),
    EncapsulatedData(EncapsulatedData),
    ImageTriggered(ImageTriggered),
    /// Housekeeping notice; the payload is never inspected.
    ImageAvailable,
    ExtendedMessage(ExtendedHeader),
    /// Any other type tag, relayed opaquely.
    Other(u8),
}

impl Message {
    /// Decode the payload of an envelope according to its type tag.
    pub fn decode(envelope: &Envelope) -> Result<Self> {
        let payload = envelope.payload.as_ref();
        let message = match envelope.msg_id {
            msgid::HEARTBEAT => Self::Heartbeat(Heartbeat::decode(payload)?),
            msgid::SYSTEM_TIME => Self::SystemTime(SystemTime::decode(payload)?),
            msgid::PING => Self::Ping(Ping::decode(payload)?),
            msgid::DATA_TRANSMISSION_HANDSHAKE => {
                Self::DataTransmissionHandshake(DataTransmissionHandshake::decode(payload)?)
            }
            msgid::ENCAPSULATED_DATA => {
                Self::EncapsulatedData(EncapsulatedData::decode(payload)?)
            }
            msgid::IMAGE_TRIGGERED => Self::ImageTriggered(ImageTriggered::decode(payload)?),
            msgid::IMAGE_AVAILABLE => Self::ImageAvailable,
            msgid::EXTENDED_MESSAGE => Self::ExtendedMessage(ExtendedHeader::decode(payload)?),
            other => Self::Other(other),
        };
        Ok(message)
    }
}

fn require(msg_id: u8, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() < expected {
        return Err(FrameError::Truncated {
            msg_id,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// HEARTBEAT: periodic liveness and state announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat {
    pub custom_mode: u32,
    pub vehicle_type: u8,
    pub autopilot: u8,
    pub base_mode: u8,
    pub system_status: u8,
    pub protocol_version: u8,
}

impl Heartbeat {
    pub const LEN: usize = 9;

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(msgid::HEARTBEAT, payload, Self::LEN)?;
        Ok(Self {
            custom_mode: payload.get_u32_le(),
            vehicle_type: payload.get_u8(),
            autopilot: payload.get_u8(),
            base_mode: payload.get_u8(),
            system_status: payload.get_u8(),
            protocol_version: payload.get_u8(),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u32_le(self.custom_mode);
        buf.put_u8(self.vehicle_type);
        buf.put_u8(self.autopilot);
        buf.put_u8(self.base_mode);
        buf.put_u8(self.system_status);
        buf.put_u8(self.protocol_version);
        buf.freeze()
    }

    pub fn to_envelope(&self, origin: Origin) -> Envelope {
        Envelope::new(msgid::HEARTBEAT, origin, self.encode())
    }
}

/// SYSTEM_TIME: wall clock and time since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemTime {
    pub time_unix_usec: u64,
    pub time_boot_ms: u32,
}

impl SystemTime {
    pub const LEN: usize = 12;

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(msgid::SYSTEM_TIME, payload, Self::LEN)?;
        Ok(Self {
            time_unix_usec: payload.get_u64_le(),
            time_boot_ms: payload.get_u32_le(),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u64_le(self.time_unix_usec);
        buf.put_u32_le(self.time_boot_ms);
        buf.freeze()
    }

    pub fn to_envelope(&self, origin: Origin) -> Envelope {
        Envelope::new(msgid::SYSTEM_TIME, origin, self.encode())
    }
}

/// PING: latency probe. Target 0/0 addresses every listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ping {
    pub time_usec: u64,
    pub seq: u32,
    pub target_system: u8,
    pub target_component: u8,
}

impl Ping {
    pub const LEN: usize = 14;

    pub fn is_broadcast(&self) -> bool {
        self.target_system == 0 && self.target_component == 0
    }

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(msgid::PING, payload, Self::LEN)?;
        Ok(Self {
            time_usec: payload.get_u64_le(),
            seq: payload.get_u32_le(),
            target_system: payload.get_u8(),
            target_component: payload.get_u8(),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u64_le(self.time_usec);
        buf.put_u32_le(self.seq);
        buf.put_u8(self.target_system);
        buf.put_u8(self.target_component);
        buf.freeze()
    }

    pub fn to_envelope(&self, origin: Origin) -> Envelope {
        Envelope::new(msgid::PING, origin, self.encode())
    }
}

/// DATA_TRANSMISSION_HANDSHAKE: announces (or requests) a chunked transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataTransmissionHandshake {
    pub size: u32,
    pub width: u16,
    pub height: u16,
    /// Carried as a u16 on the wire; transfers never exceed 255 packets.
    pub packets: u16,
    pub data_type: u8,
    pub payload: u8,
    pub jpg_quality: u8,
}

impl DataTransmissionHandshake {
    pub const LEN: usize = 13;

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(msgid::DATA_TRANSMISSION_HANDSHAKE, payload, Self::LEN)?;
        Ok(Self {
            size: payload.get_u32_le(),
            width: payload.get_u16_le(),
            height: payload.get_u16_le(),
            packets: payload.get_u16_le(),
            data_type: payload.get_u8(),
            payload: payload.get_u8(),
            jpg_quality: payload.get_u8(),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u32_le(self.size);
        buf.put_u16_le(self.width);
        buf.put_u16_le(self.height);
        buf.put_u16_le(self.packets);
        buf.put_u8(self.data_type);
        buf.put_u8(self.payload);
        buf.put_u8(self.jpg_quality);
        buf.freeze()
    }

    pub fn to_envelope(&self, origin: Origin) -> Envelope {
        Envelope::new(msgid::DATA_TRANSMISSION_HANDSHAKE, origin, self.encode())
    }
}

/// ENCAPSULATED_DATA: one fixed-size slice of a chunked transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncapsulatedData {
    pub seqnr: u16,
    pub data: Bytes,
}

impl EncapsulatedData {
    pub const LEN: usize = 2 + ENCAPSULATED_DATA_LEN;

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(msgid::ENCAPSULATED_DATA, payload, Self::LEN)?;
        let seqnr = payload.get_u16_le();
        Ok(Self {
            seqnr,
            data: Bytes::copy_from_slice(&payload[..ENCAPSULATED_DATA_LEN]),
        })
    }

    /// Encode, zero-padding `data` to the fixed slice size.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u16_le(self.seqnr);
        let take = self.data.len().min(ENCAPSULATED_DATA_LEN);
        buf.put_slice(&self.data[..take]);
        buf.put_bytes(0, ENCAPSULATED_DATA_LEN - take);
        buf.freeze()
    }

    pub fn to_envelope(&self, origin: Origin) -> Envelope {
        Envelope::new(msgid::ENCAPSULATED_DATA, origin, self.encode())
    }
}

/// IMAGE_TRIGGERED: a camera exposure happened at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageTriggered {
    /// Capture timestamp in microseconds; image files are named after it.
    pub timestamp: u64,
    pub seq: u32,
    /// roll, pitch, yaw, local_z, lat, lon, alt, ground_x, ground_y, ground_z
    pub pose: [f32; 10],
}

impl ImageTriggered {
    pub const LEN: usize = 8 + 4 + 10 * 4;

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(msgid::IMAGE_TRIGGERED, payload, Self::LEN)?;
        let timestamp = payload.get_u64_le();
        let seq = payload.get_u32_le();
        let mut pose = [0f32; 10];
        for value in &mut pose {
            *value = payload.get_f32_le();
        }
        Ok(Self {
            timestamp,
            seq,
            pose,
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u64_le(self.timestamp);
        buf.put_u32_le(self.seq);
        for value in self.pose {
            buf.put_f32_le(value);
        }
        buf.freeze()
    }

    pub fn to_envelope(&self, origin: Origin) -> Envelope {
        Envelope::new(msgid::IMAGE_TRIGGERED, origin, self.encode())
    }
}

/// Fixed part of an EXTENDED_MESSAGE; the trailer travels out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedHeader {
    pub target_system: u8,
    pub target_component: u8,
    pub protocol_flags: u8,
    /// Length of the trailer that follows the frame.
    pub extended_payload_len: u32,
}

impl ExtendedHeader {
    pub const LEN: usize = 7;

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(msgid::EXTENDED_MESSAGE, payload, Self::LEN)?;
        Ok(Self {
            target_system: payload.get_u8(),
            target_component: payload.get_u8(),
            protocol_flags: payload.get_u8(),
            extended_payload_len: payload.get_u32_le(),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u8(self.target_system);
        buf.put_u8(self.target_component);
        buf.put_u8(self.protocol_flags);
        buf.put_u32_le(self.extended_payload_len);
        buf.freeze()
    }

    pub fn to_envelope(&self, origin: Origin) -> Envelope {
        Envelope::new(msgid::EXTENDED_MESSAGE, origin, self.encode())
    }
}
