use std::io::Write;
use std::time::Duration;

use mavrelay_bus::{Bus, BusSubscription};
use mavrelay_frame::{msgid, unix_micros, ExtendedHeader};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;
use crate::log::LogWriter;

/// Counters for [`run_recorder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecorderStats {
    pub records: u64,
    /// Extended messages whose trailer did not match the announced length.
    pub skipped: u64,
}

/// Append everything published on `topic` to `writer` until cancelled.
///
/// Records are stamped with wall-clock microseconds so their timestamps are
/// comparable with trigger capture times.
pub fn run_recorder<B: Bus, W: Write>(
    bus: &B,
    topic: &str,
    writer: &mut LogWriter<W>,
    poll: Duration,
    cancel: &CancellationToken,
) -> Result<RecorderStats> {
    let mut sub = bus.subscribe(topic)?;
    let mut stats = RecorderStats::default();
    info!(topic, "recording");

    while !cancel.is_cancelled() {
        let Some(message) = sub.recv_timeout(poll)? else {
            continue;
        };
        let envelope = &message.envelope;
        let trailer = if envelope.msg_id == msgid::EXTENDED_MESSAGE {
            let announced = ExtendedHeader::decode(&envelope.payload)
                .map(|header| header.extended_payload_len as usize)
                .unwrap_or(0);
            let trailer = message.extended.as_deref().unwrap_or(&[]);
            if trailer.len() != announced {
                stats.skipped += 1;
                warn!(
                    announced,
                    actual = trailer.len(),
                    "extended trailer length mismatch, not recorded"
                );
                continue;
            }
            Some(trailer)
        } else {
            None
        };
        writer.write_record(unix_micros(), envelope, trailer)?;
        stats.records += 1;
    }

    writer.flush()?;
    info!(records = stats.records, skipped = stats.skipped, "recording stopped");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::thread;

    use bytes::Bytes;
    use mavrelay_bus::{BusMessage, MemoryBus, MAVLINK};
    use mavrelay_frame::{Heartbeat, Origin};

    use super::*;
    use crate::log::LogReader;

    #[test]
    fn records_until_cancelled() {
        let bus = MemoryBus::new();
        let cancel = CancellationToken::new();
        let before = unix_micros();

        let recorder_bus = bus.clone();
        let recorder_cancel = cancel.clone();
        let recorder = thread::spawn(move || {
            let mut writer = LogWriter::new(Vec::new());
            let stats = run_recorder(
                &recorder_bus,
                MAVLINK,
                &mut writer,
                Duration::from_millis(10),
                &recorder_cancel,
            )
            .unwrap();
            (stats, writer.into_inner().unwrap())
        });

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while bus.subscriber_count(MAVLINK) == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let origin = Origin::new(3, 1);
        bus.publish(MAVLINK, &BusMessage::new(Heartbeat::default().to_envelope(origin)))
            .unwrap();
        let good = ExtendedHeader {
            extended_payload_len: 4,
            ..Default::default()
        };
        bus.publish(
            MAVLINK,
            &BusMessage::new(good.to_envelope(origin)).with_extended(Bytes::from_static(b"abcd")),
        )
        .unwrap();
        let bad = ExtendedHeader {
            extended_payload_len: 9,
            ..Default::default()
        };
        bus.publish(MAVLINK, &BusMessage::new(bad.to_envelope(origin)))
            .unwrap();

        thread::sleep(Duration::from_millis(100));
        cancel.cancel();
        let (stats, log) = recorder.join().unwrap();
        let after = unix_micros();

        assert_eq!(stats.records, 2);
        assert_eq!(stats.skipped, 1);
        let records: Vec<_> = LogReader::new(Cursor::new(log))
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].extended.as_deref(), Some(&b"abcd"[..]));
        assert!(before <= records[0].timestamp);
        assert!(records[0].timestamp <= records[1].timestamp);
        assert!(records[1].timestamp <= after);
    }
}
