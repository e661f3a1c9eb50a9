use bytes::{Buf, BufMut, Bytes, BytesMut};
use mavrelay_frame::{decode_frame, encode_frame, Envelope, FrameConfig};

use crate::error::{BusError, Result};

/// Where a message entered the bus from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LinkKind {
    /// Published by a process on the bus itself.
    Bus = 0,
    /// Received on a vehicle serial link.
    Uart = 1,
    /// Received on an operator uplink serial link.
    UartUplink = 2,
}

impl LinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bus => "bus",
            Self::Uart => "uart",
            Self::UartUplink => "uart-uplink",
        }
    }
}

impl TryFrom<u8> for LinkKind {
    type Error = BusError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Bus),
            1 => Ok(Self::Uart),
            2 => Ok(Self::UartUplink),
            other => Err(BusError::Malformed(format!("unknown link kind {other}"))),
        }
    }
}

/// An envelope as carried on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub envelope: Envelope,
    pub link: LinkKind,
    /// Out-of-band trailer of an extended message.
    pub extended: Option<Bytes>,
}

impl BusMessage {
    /// A message originated on the bus.
    pub fn new(envelope: Envelope) -> Self {
        Self {
            envelope,
            link: LinkKind::Bus,
            extended: None,
        }
    }

    pub fn with_link(mut self, link: LinkKind) -> Self {
        self.link = link;
        self
    }

    pub fn with_extended(mut self, trailer: impl Into<Bytes>) -> Self {
        self.extended = Some(trailer.into());
        self
    }
}

/// Largest datagram the UDP bus will send.
pub const MAX_DATAGRAM: usize = 65_507;

/// Encode a topic and message into one datagram.
///
/// ```text
/// ┌───────────┬─────────┬──────┬─────────────┬──────────┬──────────────┐
/// │ topic len │ topic   │ link │ ext len     │ frame    │ ext trailer  │
/// │ (1B)      │ (UTF-8) │ (1B) │ (4B LE)     │ (wire)   │ (ext len B)  │
/// └───────────┴─────────┴──────┴─────────────┴──────────┴──────────────┘
/// ```
pub fn encode_datagram(topic: &str, message: &BusMessage) -> Result<Bytes> {
    let topic_len = u8::try_from(topic.len())
        .map_err(|_| BusError::Malformed(format!("topic too long: {}", topic.len())))?;
    let trailer = message.extended.as_deref().unwrap_or_default();

    let mut buf = BytesMut::with_capacity(
        1 + topic.len() + 1 + 4 + message.envelope.wire_size() + trailer.len(),
    );
    buf.put_u8(topic_len);
    buf.put_slice(topic.as_bytes());
    buf.put_u8(message.link as u8);
    buf.put_u32_le(trailer.len() as u32);
    encode_frame(&message.envelope, &mut buf)?;
    buf.put_slice(trailer);

    if buf.len() > MAX_DATAGRAM {
        return Err(BusError::TooLarge {
            size: buf.len(),
            max: MAX_DATAGRAM,
        });
    }
    Ok(buf.freeze())
}

/// Decode a datagram produced by [`encode_datagram`].
pub fn decode_datagram(mut src: &[u8]) -> Result<(String, BusMessage)> {
    let malformed = |what: &str| BusError::Malformed(what.to_string());

    if src.is_empty() {
        return Err(malformed("empty datagram"));
    }
    let topic_len = src.get_u8() as usize;
    if src.len() < topic_len + 5 {
        return Err(malformed("datagram shorter than its header"));
    }
    let topic = std::str::from_utf8(&src[..topic_len])
        .map_err(|_| malformed("topic is not UTF-8"))?
        .to_string();
    src.advance(topic_len);
    let link = LinkKind::try_from(src.get_u8())?;
    let ext_len = src.get_u32_le() as usize;

    let (envelope, used) = decode_frame(src, &FrameConfig::default())?;
    src.advance(used);
    if src.len() != ext_len {
        return Err(BusError::Malformed(format!(
            "trailer length {} does not match header {ext_len}",
            src.len()
        )));
    }
    let extended = (ext_len > 0).then(|| Bytes::copy_from_slice(src));

    Ok((
        topic,
        BusMessage {
            envelope,
            link,
            extended,
        },
    ))
}
