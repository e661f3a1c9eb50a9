use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::msgid;

/// Start-of-frame marker.
pub const STX: u8 = 0xFE;

/// Header after the start byte: length, sequence, system, component, message id.
pub const HEADER_SIZE: usize = 5;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD: usize = 255;

/// Checksum trailer size.
pub const CHECKSUM_SIZE: usize = 2;

/// Largest frame on the wire: start + header + payload + checksum.
pub const MAX_PACKET_LEN: usize = 1 + HEADER_SIZE + MAX_PAYLOAD + CHECKSUM_SIZE;

/// Sender identity carried in every frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Origin {
    pub system_id: u8,
    pub component_id: u8,
}

impl Origin {
    pub fn new(system_id: u8, component_id: u8) -> Self {
        Self {
            system_id,
            component_id,
        }
    }
}

/// A decoded message: type tag, sender, sequence and raw payload.
///
/// Immutable once built; pumps hand envelopes around by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub msg_id: u8,
    pub system_id: u8,
    pub component_id: u8,
    pub sequence: u8,
    pub payload: Bytes,
}

impl Envelope {
    /// Create an envelope with sequence number zero.
    pub fn new(msg_id: u8, origin: Origin, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_id,
            system_id: origin.system_id,
            component_id: origin.component_id,
            sequence: 0,
            payload: payload.into(),
        }
    }

    /// Same envelope with a different sequence number.
    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn origin(&self) -> Origin {
        Origin::new(self.system_id, self.component_id)
    }

    /// Message name for logs.
    pub fn name(&self) -> &'static str {
        msgid::name(self.msg_id)
    }

    /// The total wire size of this envelope once framed.
    pub fn wire_size(&self) -> usize {
        1 + HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE
    }
}

/// Codec settings.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Reject frames whose checksum does not match. Default: true.
    pub verify_checksums: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

/// Encode an envelope into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬─────┬─────┬───────┬────────┬───────┬───────────┬──────────┐
/// │ 0xFE │ len │ seq │ sysid │ compid │ msgid │ payload   │ crc (LE) │
/// │      │     │     │       │        │       │ (len B)   │          │
/// └──────┴─────┴─────┴───────┴────────┴───────┴───────────┴──────────┘
/// ```
pub fn encode_frame(envelope: &Envelope, dst: &mut BytesMut) -> Result<()> {
    let len = envelope.payload.len();
    if len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_PAYLOAD,
        });
    }
    let header = [
        len as u8,
        envelope.sequence,
        envelope.system_id,
        envelope.component_id,
        envelope.msg_id,
    ];
    let crc = frame_checksum(&header, &envelope.payload);

    dst.reserve(envelope.wire_size());
    dst.put_u8(STX);
    dst.put_slice(&header);
    dst.put_slice(&envelope.payload);
    dst.put_u16_le(crc);
    Ok(())
}

/// Decode one frame from the start of `src`.
///
/// Bytes past the end of the frame are ignored, which lets callers decode
/// from zero-padded fixed-size records. Returns the envelope and the number
/// of bytes the frame occupied.
pub fn decode_frame(src: &[u8], config: &FrameConfig) -> Result<(Envelope, usize)> {
    let Some(&start) = src.first() else {
        return Err(FrameError::Incomplete { have: 0, need: 1 });
    };
    if start != STX {
        return Err(FrameError::InvalidStart(start));
    }
    if src.len() < 1 + HEADER_SIZE {
        return Err(FrameError::Incomplete {
            have: src.len(),
            need: 1 + HEADER_SIZE,
        });
    }

    let len = src[1] as usize;
    let total = 1 + HEADER_SIZE + len + CHECKSUM_SIZE;
    if src.len() < total {
        return Err(FrameError::Incomplete {
            have: src.len(),
            need: total,
        });
    }

    let header = &src[1..1 + HEADER_SIZE];
    let payload = &src[1 + HEADER_SIZE..1 + HEADER_SIZE + len];
    let got = u16::from_le_bytes([src[total - 2], src[total - 1]]);
    if config.verify_checksums {
        let expected = frame_checksum(header, payload);
        if got != expected {
            return Err(FrameError::Checksum {
                msg_id: header[4],
                got,
                expected,
            });
        }
    }

    let envelope = Envelope {
        msg_id: header[4],
        system_id: header[2],
        component_id: header[3],
        sequence: header[1],
        payload: Bytes::copy_from_slice(payload),
    };
    Ok((envelope, total))
}

/// Checksum of a frame: header and payload, then the message's seed.
pub(crate) fn frame_checksum(header: &[u8], payload: &[u8]) -> u16 {
    let mut crc = CRC_INIT;
    for &byte in header.iter().chain(payload) {
        crc = crc_accumulate(byte, crc);
    }
    match msgid::crc_extra(header[4]) {
        Some(seed) => crc_accumulate(seed, crc),
        None => crc,
    }
}

pub(crate) const CRC_INIT: u16 = 0xFFFF;

/// One step of CRC-16/MCRF4XX (X.25 polynomial, reflected).
pub(crate) fn crc_accumulate(byte: u8, crc: u16) -> u16 {
    let mut tmp = byte ^ (crc & 0xFF) as u8;
    tmp ^= tmp << 4;
    let tmp = tmp as u16;
    (crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4)
}
