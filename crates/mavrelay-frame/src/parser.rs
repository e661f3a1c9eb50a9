use bytes::Bytes;
use tracing::trace;

use crate::codec::{crc_accumulate, Envelope, FrameConfig, CRC_INIT, HEADER_SIZE, STX};
use crate::msgid;

/// Running parser counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames accepted.
    pub frames: u64,
    /// Frames discarded because of a checksum mismatch.
    pub dropped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Header,
    Payload,
    ChecksumLow,
    ChecksumHigh,
}

/// Byte-at-a-time frame parser.
///
/// Keeps partial state between calls, so bytes can be fed as they arrive
/// from the transport. A corrupted frame bumps [`ParserStats::dropped`] and
/// the parser hunts for the next start byte.
#[derive(Debug)]
pub struct FrameParser {
    config: FrameConfig,
    state: State,
    header: [u8; HEADER_SIZE],
    header_len: usize,
    payload: Vec<u8>,
    crc: u16,
    crc_low: u8,
    stats: ParserStats,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl FrameParser {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            header: [0; HEADER_SIZE],
            header_len: 0,
            payload: Vec::with_capacity(crate::codec::MAX_PAYLOAD),
            crc: CRC_INIT,
            crc_low: 0,
            stats: ParserStats::default(),
        }
    }

    /// Feed one byte. Returns an envelope when it completes a valid frame.
    pub fn push_byte(&mut self, byte: u8) -> Option<Envelope> {
        match self.state {
            State::Idle => {
                if byte == STX {
                    self.start();
                }
                None
            }
            State::Header => {
                self.header[self.header_len] = byte;
                self.header_len += 1;
                self.crc = crc_accumulate(byte, self.crc);
                if self.header_len == HEADER_SIZE {
                    self.state = if self.header[0] == 0 {
                        State::ChecksumLow
                    } else {
                        State::Payload
                    };
                }
                None
            }
            State::Payload => {
                self.payload.push(byte);
                self.crc = crc_accumulate(byte, self.crc);
                if self.payload.len() == self.header[0] as usize {
                    self.state = State::ChecksumLow;
                }
                None
            }
            State::ChecksumLow => {
                if let Some(seed) = msgid::crc_extra(self.header[4]) {
                    self.crc = crc_accumulate(seed, self.crc);
                }
                self.crc_low = byte;
                self.state = State::ChecksumHigh;
                None
            }
            State::ChecksumHigh => {
                let got = u16::from_le_bytes([self.crc_low, byte]);
                if self.config.verify_checksums && got != self.crc {
                    self.stats.dropped += 1;
                    trace!(
                        msg_id = self.header[4],
                        got,
                        expected = self.crc,
                        "dropping corrupted frame"
                    );
                    self.state = State::Idle;
                    return None;
                }
                self.stats.frames += 1;
                let envelope = Envelope {
                    msg_id: self.header[4],
                    system_id: self.header[2],
                    component_id: self.header[3],
                    sequence: self.header[1],
                    payload: Bytes::copy_from_slice(&self.payload),
                };
                self.state = State::Idle;
                Some(envelope)
            }
        }
    }

    /// Feed a slice, collecting every completed envelope.
    pub fn push_slice(&mut self, bytes: &[u8]) -> Vec<Envelope> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    /// Frames discarded so far.
    pub fn drop_count(&self) -> u64 {
        self.stats.dropped
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    fn start(&mut self) {
        self.state = State::Header;
        self.header_len = 0;
        self.payload.clear();
        self.crc = CRC_INIT;
    }
}
