use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use mavrelay_frame::{
    decode_frame, encode_frame, msgid, Envelope, FrameConfig, HEADER_SIZE, MAX_PACKET_LEN,
};
use tracing::{debug, warn};

use crate::error::{ReplayError, Result};

/// Bytes of the little-endian timestamp that opens every record.
pub const TIMESTAMP_LEN: usize = 8;

/// Size of one fixed record: timestamp plus a zero-padded frame slot.
pub const RECORD_LEN: usize = TIMESTAMP_LEN + MAX_PACKET_LEN;

/// Largest extended trailer accepted from a log.
pub const MAX_TRAILER_LEN: u32 = 16 * 1024 * 1024;

/// Offset of the trailer length inside an EXTENDED_MESSAGE payload.
const TRAILER_LEN_OFFSET: usize = 3;

/// One recorded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Recording time in microseconds.
    pub timestamp: u64,
    pub envelope: Envelope,
    /// Out-of-band trailer of an EXTENDED_MESSAGE.
    pub extended: Option<Bytes>,
}

/// Forward-only reader over a session log.
///
/// Records whose frame does not decode are skipped and counted; the fixed
/// record size keeps the stream aligned across them.
pub struct LogReader<R> {
    inner: R,
    config: FrameConfig,
    offset: u64,
    corrupt: u64,
}

impl LogReader<BufReader<File>> {
    /// Open a log file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, FrameConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: FrameConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ReplayError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_config(BufReader::new(file), config))
    }
}

impl<R: Read> LogReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            offset: 0,
            corrupt: 0,
        }
    }

    /// Records skipped because their frame did not decode.
    pub fn corrupt_records(&self) -> u64 {
        self.corrupt
    }

    /// Byte offset of the next record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next decodable record, or `None` at a clean end of log.
    pub fn next_record(&mut self) -> Result<Option<LogRecord>> {
        let mut raw = [0u8; RECORD_LEN];
        loop {
            if !self.fill(&mut raw)? {
                return Ok(None);
            }
            let timestamp = timestamp_of(&raw);
            let slot = &raw[TIMESTAMP_LEN..];

            // The trailer is consumed even when the frame is unreadable.
            let extended = match trailer_len(slot) {
                Some(len) => Some(self.read_trailer(len)?),
                None => None,
            };

            match decode_frame(slot, &self.config) {
                Ok((envelope, _)) => {
                    return Ok(Some(LogRecord {
                        timestamp,
                        envelope,
                        extended,
                    }))
                }
                Err(err) => {
                    self.corrupt += 1;
                    warn!(
                        timestamp,
                        offset = self.offset,
                        corrupt = self.corrupt,
                        error = %err,
                        "skipping unreadable log record"
                    );
                }
            }
        }
    }

    /// Read one fixed record. `false` on end of log before its first byte.
    fn fill(&mut self, raw: &mut [u8; RECORD_LEN]) -> Result<bool> {
        let mut filled = 0usize;
        while filled < RECORD_LEN {
            match self.inner.read(&mut raw[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(ReplayError::Truncated {
                        offset: self.offset,
                        need: RECORD_LEN - filled,
                    })
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ReplayError::Io(err)),
            }
        }
        self.offset += RECORD_LEN as u64;
        Ok(true)
    }

    fn read_trailer(&mut self, len: u32) -> Result<Bytes> {
        if len > MAX_TRAILER_LEN {
            return Err(ReplayError::TrailerTooLarge {
                len,
                max: MAX_TRAILER_LEN,
            });
        }
        let mut trailer = vec![0u8; len as usize];
        self.inner.read_exact(&mut trailer).map_err(|err| {
            if err.kind() == ErrorKind::UnexpectedEof {
                ReplayError::Truncated {
                    offset: self.offset,
                    need: len as usize,
                }
            } else {
                ReplayError::Io(err)
            }
        })?;
        self.offset += u64::from(len);
        debug!(len, "read extended trailer");
        Ok(Bytes::from(trailer))
    }
}

impl<R: Read> Iterator for LogReader<R> {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

fn timestamp_of(raw: &[u8; RECORD_LEN]) -> u64 {
    let mut stamp = [0u8; TIMESTAMP_LEN];
    stamp.copy_from_slice(&raw[..TIMESTAMP_LEN]);
    u64::from_le_bytes(stamp)
}

/// Trailer length announced by an EXTENDED_MESSAGE frame slot.
fn trailer_len(slot: &[u8]) -> Option<u32> {
    if slot.len() < 1 + HEADER_SIZE || slot[5] != msgid::EXTENDED_MESSAGE {
        return None;
    }
    let payload_len = slot[1] as usize;
    let start = 1 + HEADER_SIZE + TRAILER_LEN_OFFSET;
    if payload_len < TRAILER_LEN_OFFSET + 4 {
        return Some(0);
    }
    let mut len = [0u8; 4];
    len.copy_from_slice(&slot[start..start + 4]);
    Some(u32::from_le_bytes(len))
}

/// Append one record to `dst`: timestamp, zero-padded frame, then `extended`.
pub fn encode_record(
    timestamp: u64,
    envelope: &Envelope,
    extended: Option<&[u8]>,
    dst: &mut BytesMut,
) -> Result<()> {
    dst.reserve(RECORD_LEN + extended.map_or(0, <[u8]>::len));
    dst.put_u64_le(timestamp);
    let frame_start = dst.len();
    encode_frame(envelope, dst)?;
    let written = dst.len() - frame_start;
    dst.put_bytes(0, MAX_PACKET_LEN - written);
    if let Some(trailer) = extended {
        dst.put_slice(trailer);
    }
    Ok(())
}

/// Writes records in the format [`LogReader`] reads.
pub struct LogWriter<W: Write> {
    inner: W,
    buf: BytesMut,
    records: u64,
}

impl LogWriter<BufWriter<File>> {
    /// Create (or truncate) a log file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| ReplayError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> LogWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(RECORD_LEN),
            records: 0,
        }
    }

    pub fn write_record(
        &mut self,
        timestamp: u64,
        envelope: &Envelope,
        extended: Option<&[u8]>,
    ) -> Result<()> {
        self.buf.clear();
        encode_record(timestamp, envelope, extended, &mut self.buf)?;
        self.inner.write_all(&self.buf)?;
        self.records += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and return the inner writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use mavrelay_frame::{ExtendedHeader, Heartbeat, Origin};

    use super::*;

    fn heartbeat() -> Envelope {
        Heartbeat::default().to_envelope(Origin::new(1, 1))
    }

    #[test]
    fn records_are_fixed_size() {
        let mut buf = BytesMut::new();
        encode_record(42, &heartbeat(), None, &mut buf).unwrap();
        assert_eq!(buf.len(), RECORD_LEN);
        assert_eq!(RECORD_LEN, 271);
        assert_eq!(&buf[..8], &42u64.to_le_bytes());
        assert_eq!(buf[8], 0xFE);
    }

    #[test]
    fn reads_back_written_records() {
        let mut writer = LogWriter::new(Vec::new());
        writer.write_record(0, &heartbeat(), None).unwrap();
        writer.write_record(500_000, &heartbeat(), None).unwrap();
        assert_eq!(writer.records(), 2);
        let log = writer.into_inner().unwrap();

        let reader = LogReader::new(Cursor::new(log));
        let stamps: Vec<u64> = reader.map(|r| r.unwrap().timestamp).collect();
        assert_eq!(stamps, vec![0, 500_000]);
    }

    #[test]
    fn extended_trailer_is_consumed() {
        let trailer = b"point cloud bytes";
        let header = ExtendedHeader {
            extended_payload_len: trailer.len() as u32,
            ..Default::default()
        };
        let mut writer = LogWriter::new(Vec::new());
        writer
            .write_record(1, &header.to_envelope(Origin::new(1, 1)), Some(trailer))
            .unwrap();
        writer.write_record(2, &heartbeat(), None).unwrap();
        let log = writer.into_inner().unwrap();

        let mut reader = LogReader::new(Cursor::new(log));
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.extended.as_deref(), Some(&trailer[..]));
        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.timestamp, 2);
        assert_eq!(second.extended, None);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn partial_record_is_truncation() {
        let mut buf = BytesMut::new();
        encode_record(7, &heartbeat(), None, &mut buf).unwrap();
        let mut reader = LogReader::new(Cursor::new(buf[..100].to_vec()));
        assert!(matches!(
            reader.next_record(),
            Err(ReplayError::Truncated { offset: 0, need: 171 })
        ));
    }

    #[test]
    fn corrupt_record_is_skipped() {
        let mut buf = BytesMut::new();
        encode_record(1, &heartbeat(), None, &mut buf).unwrap();
        encode_record(2, &heartbeat(), None, &mut buf).unwrap();
        buf[TIMESTAMP_LEN + 7] ^= 0xFF;

        let mut reader = LogReader::new(Cursor::new(buf.to_vec()));
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.timestamp, 2);
        assert_eq!(reader.corrupt_records(), 1);
    }

    #[test]
    fn oversized_trailer_is_rejected() {
        let header = ExtendedHeader {
            extended_payload_len: MAX_TRAILER_LEN + 1,
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        encode_record(1, &header.to_envelope(Origin::new(1, 1)), None, &mut buf).unwrap();
        let mut reader = LogReader::new(Cursor::new(buf.to_vec()));
        assert!(matches!(
            reader.next_record(),
            Err(ReplayError::TrailerTooLarge { .. })
        ));
    }

    #[test]
    fn empty_log_has_no_records() {
        let mut reader = LogReader::new(Cursor::new(Vec::new()));
        assert!(reader.next_record().unwrap().is_none());
    }
}
