use bytes::{Bytes, BytesMut};
use mavrelay_transport::TransportTx;
use tracing::trace;

use crate::codec::{encode_frame, Envelope, Origin, MAX_PACKET_LEN};
use crate::error::Result;

/// Writes framed envelopes to a transport send half.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    sequence: u8,
}

impl<T: TransportTx> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_PACKET_LEN),
            sequence: 0,
        }
    }

    /// Frame and send an envelope as-is, keeping its sequence number.
    ///
    /// Returns the bytes written.
    pub fn write_envelope(&mut self, envelope: &Envelope) -> Result<usize> {
        self.buf.clear();
        encode_frame(envelope, &mut self.buf)?;
        let written = self.inner.send(&self.buf)?;
        trace!(
            msg_id = envelope.msg_id,
            name = envelope.name(),
            bytes = written,
            "frame written"
        );
        Ok(written)
    }

    /// Send a locally originated message, stamping the next sequence number.
    pub fn write_local(
        &mut self,
        msg_id: u8,
        origin: Origin,
        payload: impl Into<Bytes>,
    ) -> Result<usize> {
        let envelope = Envelope::new(msg_id, origin, payload).with_sequence(self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        self.write_envelope(&envelope)
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use mavrelay_transport::StreamSender;

    use super::*;
    use crate::codec::{decode_frame, FrameConfig};
    use crate::msgid;

    #[test]
    fn write_envelope_keeps_sequence() {
        let mut writer = FrameWriter::new(StreamSender::new(Vec::new()));
        let envelope =
            Envelope::new(msgid::PING, Origin::new(3, 4), vec![9u8; 14]).with_sequence(200);
        let written = writer.write_envelope(&envelope).unwrap();
        assert_eq!(written, envelope.wire_size());

        let bytes = writer.into_inner().into_inner();
        let (decoded, _) = decode_frame(&bytes, &FrameConfig::default()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn local_messages_get_increasing_sequence() {
        let mut writer = FrameWriter::new(StreamSender::new(Vec::new()));
        let origin = Origin::new(1, 1);
        writer
            .write_local(msgid::SYSTEM_TIME, origin, vec![0u8; 12])
            .unwrap();
        writer
            .write_local(msgid::SYSTEM_TIME, origin, vec![0u8; 12])
            .unwrap();

        let bytes = writer.into_inner().into_inner();
        let config = FrameConfig::default();
        let (first, used) = decode_frame(&bytes, &config).unwrap();
        let (second, _) = decode_frame(&bytes[used..], &config).unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
    }
}
