use mavrelay_transport::TransportRx;

use crate::codec::{Envelope, FrameConfig};
use crate::error::Result;
use crate::parser::FrameParser;

/// Outcome of feeding one transport byte to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// A complete, valid frame.
    Frame(Envelope),
    /// Byte consumed, frame still incomplete.
    Pending,
    /// The transport read timed out with no data.
    Idle,
    /// The byte completed a corrupted frame; `dropped` is the new total.
    Corrupted { dropped: u64 },
}

/// Reads envelopes from a transport receive half, one byte at a time.
pub struct FrameReader<T> {
    inner: T,
    parser: FrameParser,
}

impl<T: TransportRx> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            parser: FrameParser::new(config),
        }
    }

    /// Read and parse a single byte.
    ///
    /// Transport errors propagate unchanged; the parser state survives them,
    /// so the caller may keep reading after a transient failure.
    pub fn read_event(&mut self) -> Result<ReadEvent> {
        let Some(byte) = self.inner.receive_one_byte()? else {
            return Ok(ReadEvent::Idle);
        };
        let before = self.parser.drop_count();
        if let Some(envelope) = self.parser.push_byte(byte) {
            return Ok(ReadEvent::Frame(envelope));
        }
        let after = self.parser.drop_count();
        if after > before {
            Ok(ReadEvent::Corrupted { dropped: after })
        } else {
            Ok(ReadEvent::Pending)
        }
    }

    /// Read until a frame completes or the transport goes idle.
    ///
    /// Returns `Ok(None)` on idle.
    pub fn read_envelope(&mut self) -> Result<Option<Envelope>> {
        loop {
            match self.read_event()? {
                ReadEvent::Frame(envelope) => return Ok(Some(envelope)),
                ReadEvent::Idle => return Ok(None),
                ReadEvent::Pending | ReadEvent::Corrupted { .. } => {}
            }
        }
    }

    /// Frames dropped by the parser so far.
    pub fn drop_count(&self) -> u64 {
        self.parser.drop_count()
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
