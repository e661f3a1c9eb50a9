use std::time::Duration;

use mavrelay_bus::{Bus, BusMessage, BusSubscription, IMAGES, MAVLINK};
use mavrelay_frame::{Envelope, Message, Origin};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::{normalize_quality, DataType};
use crate::sender::{ChunkSender, SenderState, TriggerOutcome};
use crate::source::FrameSource;

/// Image streamer settings.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Identity transfers are sent as.
    pub origin: Origin,
    /// Topic transfers are published on.
    pub topic: String,
    /// Data packets published per loop iteration.
    pub burst: usize,
    /// How long an idle streamer waits for requests before rechecking shutdown.
    pub poll: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            origin: Origin::new(42, 30),
            topic: IMAGES.to_string(),
            burst: 16,
            poll: Duration::from_millis(100),
        }
    }
}

/// Counters for [`run_streamer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamerStats {
    pub requests: u64,
    pub transfers: u64,
    /// Requests that arrived while a transfer was in progress.
    pub dropped: u64,
    /// Requests with no frame available.
    pub no_frame: u64,
    pub packets: u64,
    pub failed: u64,
}

/// Quality requested by a JPEG handshake from another system.
fn requested_quality(envelope: &Envelope, local: Origin) -> Option<u8> {
    if envelope.system_id == local.system_id {
        return None;
    }
    match Message::decode(envelope) {
        Ok(Message::DataTransmissionHandshake(request))
            if DataType::from_wire(request.data_type) == DataType::Jpeg =>
        {
            Some(normalize_quality(request.jpg_quality))
        }
        _ => None,
    }
}

/// Answer transfer requests on the MAVLINK topic with frames from `source`.
///
/// Runs until cancelled. Packets go out in bursts between request checks, so
/// a request that arrives mid-transfer is seen and dropped.
pub fn run_streamer<B: Bus, S: FrameSource>(
    bus: &B,
    source: &mut S,
    config: &TransferConfig,
    cancel: &CancellationToken,
) -> Result<StreamerStats> {
    let mut requests = bus.subscribe(MAVLINK)?;
    let mut sender = ChunkSender::new(config.origin);
    let mut stats = StreamerStats::default();

    info!(topic = %config.topic, "waiting for transfer requests");
    while !cancel.is_cancelled() {
        let timeout = if sender.state() == SenderState::Idle {
            config.poll
        } else {
            Duration::ZERO
        };
        if let Some(message) = requests.recv_timeout(timeout)? {
            if let Some(quality) = requested_quality(&message.envelope, config.origin) {
                stats.requests += 1;
                start_transfer(bus, source, &mut sender, quality, config, &mut stats)?;
            }
        }

        for _ in 0..config.burst {
            let Some(packet) = sender.next_packet() else {
                break;
            };
            bus.publish(&config.topic, &BusMessage::new(packet))?;
            stats.packets += 1;
        }
    }

    Ok(stats)
}

fn start_transfer<B: Bus, S: FrameSource>(
    bus: &B,
    source: &mut S,
    sender: &mut ChunkSender,
    quality: u8,
    config: &TransferConfig,
    stats: &mut StreamerStats,
) -> Result<()> {
    if sender.state() != SenderState::Idle {
        stats.dropped += 1;
        debug!(dropped = stats.dropped, "transfer in progress, request dropped");
        return Ok(());
    }
    let frame = match source.latest() {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            stats.no_frame += 1;
            warn!("transfer requested but no frame available");
            return Ok(());
        }
        Err(err) => {
            stats.failed += 1;
            warn!(error = %err, "frame source failed");
            return Ok(());
        }
    };

    match sender.begin(frame.data, frame.data_type, quality, frame.width, frame.height) {
        Ok(TriggerOutcome::Started { handshake, .. }) => {
            bus.publish(&config.topic, &BusMessage::new(handshake))?;
            stats.transfers += 1;
        }
        Ok(TriggerOutcome::Dropped) => stats.dropped += 1,
        Err(err) => {
            stats.failed += 1;
            warn!(error = %err, "cannot transfer frame");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::thread;

    use bytes::Bytes;
    use mavrelay_bus::MemoryBus;
    use mavrelay_frame::DataTransmissionHandshake;

    use super::*;
    use crate::receiver::{PacketOutcome, ReceiverEvent, SessionTable};
    use crate::source::{ImageFrame, Orientation};

    struct FixedSource(Bytes);

    impl FrameSource for FixedSource {
        fn latest(&mut self) -> Result<Option<ImageFrame>> {
            Ok(Some(ImageFrame {
                timestamp: 1,
                camera_id: 0,
                data: self.0.clone(),
                data_type: DataType::Jpeg,
                orientation: Orientation::Forward,
                stereo: None,
                width: 320,
                height: 240,
            }))
        }
    }

    fn request(system_id: u8, quality: u8) -> Envelope {
        DataTransmissionHandshake {
            data_type: 1,
            jpg_quality: quality,
            ..Default::default()
        }
        .to_envelope(Origin::new(system_id, 0))
    }

    #[test]
    fn only_foreign_jpeg_requests_count() {
        let local = Origin::new(42, 30);
        assert_eq!(requested_quality(&request(255, 0), local), Some(60));
        assert_eq!(requested_quality(&request(255, 90), local), Some(90));
        assert_eq!(requested_quality(&request(42, 90), local), None);

        let raw = DataTransmissionHandshake {
            data_type: 2,
            ..Default::default()
        }
        .to_envelope(Origin::new(255, 0));
        assert_eq!(requested_quality(&raw, local), None);
    }

    #[test]
    fn request_is_answered_with_a_complete_transfer() {
        let bus = MemoryBus::new();
        let mut images = bus.subscribe(IMAGES).unwrap();
        let cancel = CancellationToken::new();
        let data: Bytes = (0..2_000u32).map(|i| i as u8).collect::<Vec<_>>().into();

        let streamer_bus = bus.clone();
        let streamer_cancel = cancel.clone();
        let source_data = data.clone();
        let streamer = thread::spawn(move || {
            let config = TransferConfig {
                poll: Duration::from_millis(10),
                ..TransferConfig::default()
            };
            run_streamer(
                &streamer_bus,
                &mut FixedSource(source_data),
                &config,
                &streamer_cancel,
            )
            .unwrap()
        });

        // Wait for the streamer's subscription before asking.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while bus.subscriber_count(MAVLINK) == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        bus.publish(MAVLINK, &BusMessage::new(request(255, 75)))
            .unwrap();

        let table = SessionTable::new();
        let done = loop {
            let message = images
                .recv_timeout(Duration::from_secs(2))
                .unwrap()
                .expect("transfer traffic");
            if let Some(ReceiverEvent::Packet(PacketOutcome::Complete(done))) =
                table.handle(&message.envelope)
            {
                break done;
            }
        };
        cancel.cancel();
        let stats = streamer.join().unwrap();

        assert_eq!(done.data, data);
        assert_eq!(done.descriptor.quality, 75);
        assert_eq!((done.descriptor.width, done.descriptor.height), (320, 240));
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.transfers, 1);
        assert_eq!(stats.packets, 8);
    }
}
