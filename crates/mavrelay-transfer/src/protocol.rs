use mavrelay_frame::{DataTransmissionHandshake, ENCAPSULATED_DATA_LEN};
use serde::Serialize;

use crate::error::{Result, TransferError};

/// Payload bytes per data packet.
pub const PACKET_CAPACITY: usize = ENCAPSULATED_DATA_LEN;

/// Transfers are capped at 255 packets.
pub const MAX_TRANSFER_SIZE: usize = u8::MAX as usize * PACKET_CAPACITY;

/// Quality used when a request asks for something outside 1..=100.
pub const DEFAULT_QUALITY: u8 = 60;

/// Kind of payload a transfer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Jpeg,
    Raw,
    Other(u8),
}

impl DataType {
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Jpeg => 1,
            Self::Raw => 2,
            Self::Other(value) => value,
        }
    }

    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => Self::Jpeg,
            2 => Self::Raw,
            other => Self::Other(other),
        }
    }

    /// File extension used when writing a received payload.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Raw => "bmp",
            Self::Other(_) => "bin",
        }
    }
}

/// Clamp a requested quality into 1..=100, falling back to the default.
pub fn normalize_quality(quality: u8) -> u8 {
    if (1..=100).contains(&quality) {
        quality
    } else {
        DEFAULT_QUALITY
    }
}

/// Number of packets needed for `size` bytes.
pub fn packet_count(size: usize) -> usize {
    size.div_ceil(PACKET_CAPACITY)
}

/// Everything a receiver needs to know before the data arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferDescriptor {
    pub data_type: DataType,
    pub size: u32,
    pub packets: u8,
    pub capacity: u8,
    pub quality: u8,
    pub width: u16,
    pub height: u16,
}

impl TransferDescriptor {
    /// Describe a payload of `size` bytes.
    pub fn plan(
        data_type: DataType,
        size: usize,
        quality: u8,
        width: u16,
        height: u16,
    ) -> Result<Self> {
        if size == 0 {
            return Err(TransferError::Empty);
        }
        if size > MAX_TRANSFER_SIZE {
            return Err(TransferError::TooLarge {
                size,
                max: MAX_TRANSFER_SIZE,
            });
        }
        Ok(Self {
            data_type,
            size: size as u32,
            packets: packet_count(size) as u8,
            capacity: PACKET_CAPACITY as u8,
            quality: normalize_quality(quality),
            width,
            height,
        })
    }

    /// Read a descriptor off the wire, checking it is self-consistent.
    pub fn from_handshake(handshake: &DataTransmissionHandshake) -> Result<Self> {
        if handshake.payload as usize != PACKET_CAPACITY {
            return Err(TransferError::MalformedDescriptor(format!(
                "packet capacity {} (expected {PACKET_CAPACITY})",
                handshake.payload
            )));
        }
        let expected = packet_count(handshake.size as usize);
        let packets = u8::try_from(handshake.packets)
            .ok()
            .filter(|&packets| packets as usize == expected)
            .ok_or_else(|| {
                TransferError::MalformedDescriptor(format!(
                    "{} packets announced for {} bytes (expected {expected})",
                    handshake.packets, handshake.size
                ))
            })?;
        Ok(Self {
            data_type: DataType::from_wire(handshake.data_type),
            size: handshake.size,
            packets,
            capacity: handshake.payload,
            quality: handshake.jpg_quality,
            width: handshake.width,
            height: handshake.height,
        })
    }

    pub fn to_handshake(&self) -> DataTransmissionHandshake {
        DataTransmissionHandshake {
            size: self.size,
            width: self.width,
            height: self.height,
            packets: u16::from(self.packets),
            data_type: self.data_type.to_wire(),
            payload: self.capacity,
            jpg_quality: self.quality,
        }
    }

    /// Bytes of payload in packet `index`, before padding.
    pub fn packet_len(&self, index: u8) -> usize {
        let start = index as usize * PACKET_CAPACITY;
        (self.size as usize).saturating_sub(start).min(PACKET_CAPACITY)
    }
}
