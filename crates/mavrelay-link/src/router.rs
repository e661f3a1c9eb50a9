use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mavrelay_bus::{Bus, BusError, BusMessage, BusSubscription, LinkKind, MAVLINK};
use mavrelay_frame::{msgid, Envelope, FrameError, FrameReader, FrameWriter, ReadEvent};
use mavrelay_transport::{TransportRx, TransportTx};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::beacon::SystemTimeBeacon;
use crate::config::{BridgeConfig, LocalIdentity, Mode};
use crate::error::{LinkError, Result};
use crate::filter::{Direction, FilterRuleSet};
use crate::probe::maybe_echo;
use crate::unix_micros;

/// Pause after a failed transport or bus read before trying again.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// What the bus→transport side does with one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub to_transport: Option<Envelope>,
    pub to_bus: Option<Envelope>,
}

/// Decision logic of the bus→transport pump.
#[derive(Debug, Clone)]
pub struct BusToTransport {
    filter: Arc<FilterRuleSet>,
    identity: LocalIdentity,
    mode: Mode,
}

impl BusToTransport {
    pub fn new(filter: Arc<FilterRuleSet>, identity: LocalIdentity, mode: Mode) -> Self {
        Self {
            filter,
            identity,
            mode,
        }
    }

    /// Filter a bus message for the transport and apply the probe echo rule.
    ///
    /// The echo happens whether or not the filter lets the probe through.
    pub fn handle(&self, message: &BusMessage, now_usec: u64) -> Dispatch {
        let envelope = &message.envelope;
        let to_bus = if envelope.msg_id == msgid::PING {
            maybe_echo(envelope, self.identity.origin(), now_usec)
        } else {
            None
        };
        let permitted = self.filter.permits(
            envelope.msg_id,
            Direction::BusToTransport,
            envelope.origin(),
            &self.identity,
            self.mode,
        );
        Dispatch {
            to_transport: permitted.then(|| envelope.clone()),
            to_bus,
        }
    }
}

/// Decision logic of the transport→bus pump.
#[derive(Debug, Clone)]
pub struct TransportToBus {
    filter: Arc<FilterRuleSet>,
    identity: LocalIdentity,
    mode: Mode,
}

impl TransportToBus {
    pub fn new(filter: Arc<FilterRuleSet>, identity: LocalIdentity, mode: Mode) -> Self {
        Self {
            filter,
            identity,
            mode,
        }
    }

    /// Link kind stamped on everything this side publishes.
    pub fn link_kind(&self) -> LinkKind {
        match self.mode {
            Mode::Vehicle => LinkKind::Uart,
            Mode::OperatorUplink => LinkKind::UartUplink,
        }
    }

    /// Wrap a received envelope for the bus, or `None` if filtered out.
    pub fn handle(&self, envelope: Envelope) -> Option<BusMessage> {
        let permitted = self.filter.permits(
            envelope.msg_id,
            Direction::TransportToBus,
            envelope.origin(),
            &self.identity,
            self.mode,
        );
        permitted.then(|| BusMessage::new(envelope).with_link(self.link_kind()))
    }
}

/// Counters for one pump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PumpStats {
    pub received: u64,
    pub forwarded: u64,
    pub filtered: u64,
    pub echoed: u64,
    pub beacons: u64,
    /// Parser drop counter at exit.
    pub corrupted: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    /// Failed bus receives.
    pub bus_errors: u64,
    pub publish_errors: u64,
    /// The pump stopped because the transport went away.
    pub transport_closed: bool,
}

/// Final counters of both pumps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeReport {
    pub bus_to_transport: PumpStats,
    pub transport_to_bus: PumpStats,
}

/// A bus/transport bridge, ready to start.
pub struct Bridge<B> {
    config: BridgeConfig,
    filter: Arc<FilterRuleSet>,
    bus: Arc<B>,
}

impl<B: Bus + 'static> Bridge<B> {
    /// Bridge with the default rule tables.
    pub fn new(config: BridgeConfig, bus: Arc<B>) -> Self {
        Self {
            config,
            filter: Arc::new(FilterRuleSet::bridge_default()),
            bus,
        }
    }

    pub fn with_filter(mut self, filter: FilterRuleSet) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Start both pumps, each owning one half of the transport.
    ///
    /// The pumps stop when `cancel` fires or when either one ends.
    pub fn spawn<R, T>(&self, rx: R, tx: T, cancel: &CancellationToken) -> Result<BridgeHandle>
    where
        R: TransportRx + 'static,
        T: TransportTx + 'static,
    {
        let token = cancel.child_token();
        let identity = self.config.identity;
        let mode = self.config.mode;

        let subscription = self.bus.subscribe(MAVLINK)?;
        let outbound = {
            let pump = OutboundPump {
                bus: Arc::clone(&self.bus),
                handler: BusToTransport::new(Arc::clone(&self.filter), identity, mode),
                identity,
                writer: FrameWriter::new(tx),
                beacon: self
                    .config
                    .beacon_interval
                    .map(|interval| SystemTimeBeacon::new(interval, Instant::now())),
                poll: self.config.bus_poll,
            };
            let pump_token = token.clone();
            thread::Builder::new()
                .name("bus-to-transport".into())
                .spawn(move || {
                    let _guard = pump_token.clone().drop_guard();
                    pump.run(subscription, &pump_token)
                })
                .map_err(|source| LinkError::Spawn {
                    name: "bus-to-transport",
                    source,
                })?
        };

        let inbound = {
            let pump = InboundPump {
                bus: Arc::clone(&self.bus),
                handler: TransportToBus::new(Arc::clone(&self.filter), identity, mode),
                reader: FrameReader::with_config(rx, self.config.frame.clone()),
            };
            let pump_token = token.clone();
            let spawned = thread::Builder::new()
                .name("transport-to-bus".into())
                .spawn(move || {
                    let _guard = pump_token.clone().drop_guard();
                    pump.run(&pump_token)
                });
            match spawned {
                Ok(handle) => handle,
                Err(source) => {
                    token.cancel();
                    let _ = outbound.join();
                    return Err(LinkError::Spawn {
                        name: "transport-to-bus",
                        source,
                    });
                }
            }
        };

        info!(
            system_id = identity.system_id,
            component_id = identity.component_id,
            link_component_id = identity.link_component_id,
            mode = ?mode,
            "bridge running"
        );
        Ok(BridgeHandle {
            outbound,
            inbound,
            token,
        })
    }
}

/// Running bridge.
pub struct BridgeHandle {
    outbound: JoinHandle<PumpStats>,
    inbound: JoinHandle<PumpStats>,
    token: CancellationToken,
}

impl BridgeHandle {
    /// Ask both pumps to stop after their current iteration.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// True once either pump has ended or shutdown was requested.
    pub fn is_stopping(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for both pumps to finish.
    pub fn join(self) -> Result<BridgeReport> {
        let bus_to_transport = self
            .outbound
            .join()
            .map_err(|_| LinkError::PumpPanicked("bus-to-transport"))?;
        let transport_to_bus = self
            .inbound
            .join()
            .map_err(|_| LinkError::PumpPanicked("transport-to-bus"))?;
        Ok(BridgeReport {
            bus_to_transport,
            transport_to_bus,
        })
    }
}

struct OutboundPump<B, T> {
    bus: Arc<B>,
    handler: BusToTransport,
    identity: LocalIdentity,
    writer: FrameWriter<T>,
    beacon: Option<SystemTimeBeacon>,
    poll: Duration,
}

impl<B: Bus, T: TransportTx> OutboundPump<B, T> {
    fn run<S: BusSubscription>(
        mut self,
        mut subscription: S,
        cancel: &CancellationToken,
    ) -> PumpStats {
        let mut stats = PumpStats::default();

        while !cancel.is_cancelled() {
            if let Some(beacon) = self.beacon.as_mut() {
                if let Some(time) = beacon.poll(Instant::now(), unix_micros()) {
                    let result = self.writer.write_local(
                        msgid::SYSTEM_TIME,
                        self.identity.origin(),
                        time.encode(),
                    );
                    match record_write(result, &mut stats) {
                        WriteOutcome::Written => stats.beacons += 1,
                        WriteOutcome::Failed => {}
                        WriteOutcome::Fatal => break,
                    }
                }
            }

            let message = match subscription.recv_timeout(self.poll) {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(BusError::Closed) => {
                    warn!("bus closed");
                    break;
                }
                Err(err) => {
                    stats.bus_errors += 1;
                    warn!(error = %err, "bus receive failed");
                    thread::sleep(READ_ERROR_BACKOFF);
                    continue;
                }
            };
            stats.received += 1;

            let dispatch = self.handler.handle(&message, unix_micros());
            if let Some(reply) = dispatch.to_bus {
                match self.bus.publish(MAVLINK, &BusMessage::new(reply)) {
                    Ok(()) => stats.echoed += 1,
                    Err(err) => {
                        stats.publish_errors += 1;
                        warn!(error = %err, "failed to publish ping reply");
                    }
                }
            }

            let Some(envelope) = dispatch.to_transport else {
                stats.filtered += 1;
                continue;
            };
            debug!(
                msg_id = envelope.msg_id,
                name = envelope.name(),
                system = envelope.system_id,
                "forwarding bus message to transport"
            );
            let result = self.writer.write_envelope(&envelope);
            match record_write(result, &mut stats) {
                WriteOutcome::Written => stats.forwarded += 1,
                WriteOutcome::Failed => {}
                WriteOutcome::Fatal => break,
            }
        }

        debug!(?stats, "bus-to-transport pump stopped");
        stats
    }
}

enum WriteOutcome {
    Written,
    Failed,
    Fatal,
}

/// Classify a transport write, counting and logging failures.
///
/// Short writes and other transient errors are absorbed; a fatal error stops
/// the pump.
fn record_write(result: mavrelay_frame::Result<usize>, stats: &mut PumpStats) -> WriteOutcome {
    match result {
        Ok(_) => WriteOutcome::Written,
        Err(FrameError::Transport(err)) if err.is_fatal() => {
            error!(error = %err, "transport write failed; stopping");
            stats.transport_closed = true;
            WriteOutcome::Fatal
        }
        Err(err) => {
            stats.write_errors += 1;
            warn!(error = %err, "transport write failed");
            WriteOutcome::Failed
        }
    }
}

struct InboundPump<B, R> {
    bus: Arc<B>,
    handler: TransportToBus,
    reader: FrameReader<R>,
}

impl<B: Bus, R: TransportRx> InboundPump<B, R> {
    fn run(mut self, cancel: &CancellationToken) -> PumpStats {
        let mut stats = PumpStats::default();
        let link = self.handler.link_kind();

        while !cancel.is_cancelled() {
            let envelope = match self.reader.read_event() {
                Ok(ReadEvent::Frame(envelope)) => envelope,
                Ok(ReadEvent::Pending | ReadEvent::Idle) => continue,
                Ok(ReadEvent::Corrupted { dropped }) => {
                    stats.corrupted = dropped;
                    warn!(dropped, "dropped corrupted frames");
                    continue;
                }
                Err(FrameError::Transport(err)) if err.is_fatal() => {
                    error!(error = %err, "transport read failed; stopping");
                    stats.transport_closed = true;
                    break;
                }
                Err(err) => {
                    stats.read_errors += 1;
                    warn!(error = %err, "transport read failed");
                    thread::sleep(READ_ERROR_BACKOFF);
                    continue;
                }
            };
            stats.received += 1;

            let msg_id = envelope.msg_id;
            let Some(message) = self.handler.handle(envelope) else {
                stats.filtered += 1;
                continue;
            };
            debug!(
                msg_id,
                name = message.envelope.name(),
                system = message.envelope.system_id,
                link = link.as_str(),
                "forwarding transport message to bus"
            );
            match self.bus.publish(MAVLINK, &message) {
                Ok(()) => stats.forwarded += 1,
                Err(err) => {
                    stats.publish_errors += 1;
                    warn!(error = %err, "bus publish failed");
                }
            }
        }

        stats.corrupted = self.reader.drop_count();
        debug!(?stats, "transport-to-bus pump stopped");
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{Cursor, Read, Write};
    #[cfg(unix)]
    use std::os::unix::net::UnixStream;
    use std::sync::Mutex;

    use bytes::BytesMut;
    use mavrelay_bus::MemoryBus;
    use mavrelay_frame::{encode_frame, FrameParser, Origin, Ping};
    use mavrelay_transport::{StreamReceiver, StreamSender, TransportError};

    use super::*;

    fn identity() -> LocalIdentity {
        LocalIdentity::new(42, 110, 200)
    }

    fn handler(mode: Mode) -> BusToTransport {
        BusToTransport::new(Arc::new(FilterRuleSet::bridge_default()), identity(), mode)
    }

    fn wire(envelope: &Envelope) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(envelope, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn broadcast_ping_is_echoed_and_forwarded() {
        let ping = Ping {
            time_usec: 1,
            seq: 4,
            target_system: 0,
            target_component: 0,
        }
        .to_envelope(Origin::new(255, 30));
        let dispatch = handler(Mode::Vehicle).handle(&BusMessage::new(ping.clone()), 99);

        assert_eq!(dispatch.to_transport, Some(ping));
        let reply = dispatch.to_bus.unwrap();
        assert_eq!(reply.origin(), Origin::new(42, 110));
        let decoded = Ping::decode(&reply.payload).unwrap();
        assert_eq!((decoded.seq, decoded.time_usec), (4, 99));
        assert_eq!((decoded.target_system, decoded.target_component), (255, 30));
    }

    #[test]
    fn echo_ignores_the_filter() {
        // In uplink mode a remote PING is not forwarded, but still answered.
        let ping = Ping::default().to_envelope(Origin::new(9, 1));
        let dispatch = handler(Mode::OperatorUplink).handle(&BusMessage::new(ping), 0);
        assert!(dispatch.to_transport.is_none());
        assert!(dispatch.to_bus.is_some());
    }

    #[test]
    fn addressed_ping_is_not_echoed() {
        let ping = Ping {
            target_system: 3,
            target_component: 3,
            ..Ping::default()
        }
        .to_envelope(Origin::new(9, 1));
        let dispatch = handler(Mode::Vehicle).handle(&BusMessage::new(ping), 0);
        assert!(dispatch.to_bus.is_none());
    }

    #[test]
    fn transport_side_tags_link_kind() {
        let filter = Arc::new(FilterRuleSet::bridge_default());
        let envelope = Envelope::new(msgid::ATTITUDE, Origin::new(42, 200), vec![0u8; 28]);

        let vehicle = TransportToBus::new(Arc::clone(&filter), identity(), Mode::Vehicle);
        assert_eq!(vehicle.handle(envelope.clone()).unwrap().link, LinkKind::Uart);

        let uplink = TransportToBus::new(filter, identity(), Mode::OperatorUplink);
        assert_eq!(uplink.handle(envelope).unwrap().link, LinkKind::UartUplink);

        let closed = TransportToBus::new(
            Arc::new(FilterRuleSet::deny_all()),
            identity(),
            Mode::Vehicle,
        );
        assert!(closed
            .handle(Envelope::new(msgid::HEARTBEAT, Origin::new(1, 1), vec![0u8; 9]))
            .is_none());
    }

    #[test]
    #[cfg(unix)]
    fn bridge_relays_both_directions() {
        let bus = Arc::new(MemoryBus::new());
        let mut observer = bus.subscribe(MAVLINK).unwrap();
        let (device, bridge_side) = UnixStream::pair().unwrap();
        bridge_side
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        device
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let config = BridgeConfig {
            identity: identity(),
            beacon_interval: None,
            bus_poll: Duration::from_millis(20),
            ..BridgeConfig::default()
        };
        let cancel = CancellationToken::new();
        let handle = Bridge::new(config, Arc::clone(&bus))
            .spawn(
                StreamReceiver::new(bridge_side.try_clone().unwrap()),
                StreamSender::new(bridge_side),
                &cancel,
            )
            .unwrap();

        // Device -> bus.
        let attitude = Envelope::new(msgid::ATTITUDE, Origin::new(42, 200), vec![1u8; 28]);
        (&device).write_all(&wire(&attitude)).unwrap();
        let relayed = loop {
            let message = observer
                .recv_timeout(Duration::from_secs(2))
                .unwrap()
                .expect("relayed message");
            if message.link == LinkKind::Uart {
                break message;
            }
        };
        assert_eq!(relayed.envelope, attitude);

        // Bus -> device.
        let command = Envelope::new(msgid::COMMAND_LONG, Origin::new(255, 0), vec![0u8; 33]);
        bus.publish(MAVLINK, &BusMessage::new(command.clone())).unwrap();
        let mut parser = FrameParser::default();
        let mut byte = [0u8; 1];
        let received = loop {
            (&device).read_exact(&mut byte).unwrap();
            if let Some(envelope) = parser.push_byte(byte[0]) {
                break envelope;
            }
        };
        assert_eq!(received, command);

        cancel.cancel();
        let report = handle.join().unwrap();
        assert!(report.transport_to_bus.forwarded >= 1);
        // The relayed ATTITUDE came back around on the bus and was filtered.
        assert!(report.bus_to_transport.filtered >= 1);
        assert_eq!(report.bus_to_transport.forwarded, 1);
    }

    #[test]
    fn closed_transport_stops_both_pumps() {
        let bus = Arc::new(MemoryBus::new());
        let heartbeat = Envelope::new(msgid::HEARTBEAT, Origin::new(42, 200), vec![0u8; 9]);
        let mut bytes = wire(&heartbeat);
        bytes.extend([0xFE, 0x09, 0x00]);
        let sink = SharedSink::default();

        let config = BridgeConfig {
            identity: identity(),
            beacon_interval: Some(Duration::from_secs(60)),
            bus_poll: Duration::from_millis(10),
            ..BridgeConfig::default()
        };
        let cancel = CancellationToken::new();
        let handle = Bridge::new(config, bus)
            .spawn(
                StreamReceiver::new(Cursor::new(bytes)),
                StreamSender::new(sink.clone()),
                &cancel,
            )
            .unwrap();

        let report = handle.join().unwrap();
        assert!(report.transport_to_bus.transport_closed);
        assert_eq!(report.transport_to_bus.forwarded, 1);
        assert!(!cancel.is_cancelled(), "parent token must stay untouched");

        // The outbound pump may stop before its first beacon; whatever it
        // wrote must be SYSTEM_TIME.
        let written = sink.0.lock().unwrap().clone();
        let mut parser = FrameParser::default();
        let frames = parser.push_slice(&written);
        assert_eq!(frames.len() as u64, report.bus_to_transport.beacons);
        assert!(frames.iter().all(|f| f.msg_id == msgid::SYSTEM_TIME));
    }

    #[test]
    fn transient_read_error_backs_off_and_continues() {
        let bus = Arc::new(MemoryBus::new());
        let mut observer = bus.subscribe(MAVLINK).unwrap();
        let heartbeat = Envelope::new(msgid::HEARTBEAT, Origin::new(42, 200), vec![0u8; 9]);
        let mut script: VecDeque<_> = VecDeque::new();
        script.push_back(Err(TransportError::Io(std::io::Error::from(
            std::io::ErrorKind::TimedOut,
        ))));
        script.extend(wire(&heartbeat).into_iter().map(|b| Ok(Some(b))));
        let config = BridgeConfig {
            identity: identity(),
            beacon_interval: None,
            bus_poll: Duration::from_millis(10),
            ..BridgeConfig::default()
        };

        let started = Instant::now();
        let handle = Bridge::new(config, Arc::clone(&bus))
            .spawn(
                ScriptedRx(script),
                StreamSender::new(SharedSink::default()),
                &CancellationToken::new(),
            )
            .unwrap();
        let report = handle.join().unwrap();

        assert!(started.elapsed() >= READ_ERROR_BACKOFF);
        let inbound = &report.transport_to_bus;
        assert_eq!(inbound.read_errors, 1);
        assert_eq!(inbound.forwarded, 1);
        assert!(inbound.transport_closed, "script end closes the transport");
        let relayed = observer
            .recv_timeout(Duration::from_secs(1))
            .unwrap()
            .expect("heartbeat after the failed read");
        assert_eq!(relayed.envelope, heartbeat);
    }

    #[test]
    fn short_write_is_counted_and_pump_keeps_running() {
        let bus = Arc::new(MemoryBus::new());
        let sink = SharedSink::default();
        let config = BridgeConfig {
            identity: identity(),
            beacon_interval: None,
            bus_poll: Duration::from_millis(10),
            ..BridgeConfig::default()
        };
        let cancel = CancellationToken::new();
        let handle = Bridge::new(config, Arc::clone(&bus))
            .spawn(
                IdleRx,
                ShortOnceTx {
                    failed: false,
                    sink: sink.clone(),
                },
                &cancel,
            )
            .unwrap();

        let first = Envelope::new(msgid::COMMAND_LONG, Origin::new(255, 0), vec![1u8; 33]);
        let second = Envelope::new(msgid::COMMAND_LONG, Origin::new(255, 0), vec![2u8; 33]);
        bus.publish(MAVLINK, &BusMessage::new(first)).unwrap();
        bus.publish(MAVLINK, &BusMessage::new(second.clone())).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while sink.0.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        cancel.cancel();
        let report = handle.join().unwrap();

        let outbound = &report.bus_to_transport;
        assert_eq!(outbound.write_errors, 1);
        assert_eq!(outbound.forwarded, 1);
        assert!(!outbound.transport_closed);
        let written = sink.0.lock().unwrap().clone();
        assert_eq!(FrameParser::default().push_slice(&written), vec![second]);
    }

    #[test]
    fn bus_errors_back_off() {
        let sink = SharedSink::default();
        let pump = OutboundPump {
            bus: Arc::new(MemoryBus::new()),
            handler: handler(Mode::Vehicle),
            identity: identity(),
            writer: FrameWriter::new(StreamSender::new(sink)),
            beacon: None,
            poll: Duration::from_millis(10),
        };
        let cancel = CancellationToken::new();
        let pump_cancel = cancel.clone();
        let running = thread::spawn(move || pump.run(FailingSubscription, &pump_cancel));

        thread::sleep(Duration::from_millis(350));
        cancel.cancel();
        let stats = running.join().unwrap();

        assert!(stats.bus_errors >= 1);
        assert!(stats.bus_errors <= 5, "no backoff: {} errors", stats.bus_errors);
    }

    /// Receive half that replays a script, then reports the transport closed.
    struct ScriptedRx(VecDeque<mavrelay_transport::Result<Option<u8>>>);

    struct IdleRx;

    impl TransportRx for ScriptedRx {
        fn receive_one_byte(&mut self) -> mavrelay_transport::Result<Option<u8>> {
            self.0.pop_front().unwrap_or(Err(TransportError::Closed))
        }
    }

    impl TransportRx for IdleRx {
        fn receive_one_byte(&mut self) -> mavrelay_transport::Result<Option<u8>> {
            thread::sleep(Duration::from_millis(5));
            Ok(None)
        }
    }

    /// Send half whose first write stalls part way.
    struct ShortOnceTx {
        failed: bool,
        sink: SharedSink,
    }

    impl TransportTx for ShortOnceTx {
        fn send(&mut self, bytes: &[u8]) -> mavrelay_transport::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(TransportError::ShortWrite {
                    written: 3,
                    expected: bytes.len(),
                });
            }
            self.sink.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }
    }

    struct FailingSubscription;

    impl BusSubscription for FailingSubscription {
        fn recv_timeout(
            &mut self,
            _timeout: Duration,
        ) -> mavrelay_bus::Result<Option<BusMessage>> {
            Err(BusError::Io(std::io::Error::other("bus socket failed")))
        }
    }

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
