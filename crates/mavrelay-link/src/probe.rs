//! Round-trip latency probing with PING messages.
//!
//! A prober broadcasts sequenced probes (target 0/0). Every listener answers
//! a broadcast probe with a reply addressed to its sender, stamped with the
//! time it was received. The prober pairs replies with its send log by
//! sequence number.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use mavrelay_bus::{Bus, BusMessage, BusSubscription, MAVLINK};
use mavrelay_frame::{msgid, Envelope, Message, Origin, Ping};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::unix_micros;

/// Build the reply to a broadcast probe.
///
/// `from` is the prober, `responder` is whoever answers.
pub fn echo_reply(ping: &Ping, from: Origin, responder: Origin, now_usec: u64) -> Envelope {
    Ping {
        time_usec: now_usec,
        seq: ping.seq,
        target_system: from.system_id,
        target_component: from.component_id,
    }
    .to_envelope(responder)
}

/// A matched reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundTrip {
    pub seq: u32,
    pub responder_system: u8,
    pub responder_component: u8,
    pub rtt_us: u64,
}

/// What the prober made of an incoming envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// Someone else's broadcast probe; publish this reply.
    Echo(Envelope),
    RoundTrip(RoundTrip),
    /// A reply addressed to us for a probe we never sent.
    UnknownSequence { seq: u32, responder: Origin },
    Ignored,
}

/// Sends probes and matches replies.
#[derive(Debug)]
pub struct LatencyProber {
    identity: Origin,
    sent: Vec<u64>,
    answered: BTreeSet<u32>,
    replies: Vec<RoundTrip>,
    unknown: u64,
}

impl LatencyProber {
    pub fn new(identity: Origin) -> Self {
        Self {
            identity,
            sent: Vec::new(),
            answered: BTreeSet::new(),
            replies: Vec::new(),
            unknown: 0,
        }
    }

    /// Next broadcast probe, logging its send time.
    pub fn next_probe(&mut self, now_usec: u64) -> Envelope {
        let seq = self.sent.len() as u32;
        self.sent.push(now_usec);
        Ping {
            time_usec: now_usec,
            seq,
            target_system: 0,
            target_component: 0,
        }
        .to_envelope(self.identity)
    }

    /// Probes sent so far.
    pub fn sent(&self) -> usize {
        self.sent.len()
    }

    /// Classify an envelope seen on the bus.
    pub fn handle(&mut self, envelope: &Envelope, now_usec: u64) -> Result<ProbeEvent> {
        if envelope.msg_id != msgid::PING || envelope.origin() == self.identity {
            return Ok(ProbeEvent::Ignored);
        }
        let ping = Ping::decode(&envelope.payload)?;

        if ping.is_broadcast() {
            let reply = echo_reply(&ping, envelope.origin(), self.identity, now_usec);
            return Ok(ProbeEvent::Echo(reply));
        }
        if ping.target_system != self.identity.system_id
            || ping.target_component != self.identity.component_id
        {
            return Ok(ProbeEvent::Ignored);
        }

        let Some(&sent_at) = self.sent.get(ping.seq as usize) else {
            self.unknown += 1;
            return Ok(ProbeEvent::UnknownSequence {
                seq: ping.seq,
                responder: envelope.origin(),
            });
        };
        let round_trip = RoundTrip {
            seq: ping.seq,
            responder_system: envelope.system_id,
            responder_component: envelope.component_id,
            rtt_us: now_usec.saturating_sub(sent_at),
        };
        self.answered.insert(ping.seq);
        self.replies.push(round_trip);
        Ok(ProbeEvent::RoundTrip(round_trip))
    }

    /// Summary of everything seen so far.
    pub fn report(&self) -> ProbeReport {
        let rtts = self.replies.iter().map(|r| r.rtt_us);
        let received = self.replies.len();
        let total: u128 = rtts.clone().map(u128::from).sum();
        ProbeReport {
            sent: self.sent.len(),
            received,
            lost: self.sent.len() - self.answered.len(),
            unknown: self.unknown,
            min_rtt_us: rtts.clone().min(),
            avg_rtt_us: (received > 0).then(|| (total / received as u128) as u64),
            max_rtt_us: rtts.max(),
            replies: self.replies.clone(),
        }
    }
}

/// Outcome of a probing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub sent: usize,
    /// Replies matched, counting every responder.
    pub received: usize,
    /// Probes nobody answered.
    pub lost: usize,
    pub unknown: u64,
    pub min_rtt_us: Option<u64>,
    pub avg_rtt_us: Option<u64>,
    pub max_rtt_us: Option<u64>,
    pub replies: Vec<RoundTrip>,
}

/// Settings for [`run_prober`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub identity: Origin,
    pub count: u32,
    pub interval: Duration,
    /// How long to keep listening after the last probe.
    pub wait: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            identity: Origin::new(1, 30),
            count: 10,
            interval: Duration::from_millis(100),
            wait: Duration::from_secs(1),
        }
    }
}

/// Probe the bus and collect replies.
///
/// Also answers other probers' broadcasts while running. Ends after the
/// wait period following the last probe, or on cancellation.
pub fn run_prober<B: Bus>(
    bus: &B,
    config: &ProbeConfig,
    cancel: &CancellationToken,
) -> Result<ProbeReport> {
    let mut subscription = bus.subscribe(MAVLINK)?;
    let mut prober = LatencyProber::new(config.identity);
    let mut next_send = Instant::now();
    let mut last_sent: Option<Instant> = None;

    info!(count = config.count, interval = ?config.interval, "sending ping requests");

    while !cancel.is_cancelled() {
        let now = Instant::now();
        if prober.sent() < config.count as usize && now >= next_send {
            let probe = prober.next_probe(unix_micros());
            bus.publish(MAVLINK, &BusMessage::new(probe))?;
            debug!(seq = prober.sent() - 1, "sent ping");
            last_sent = Some(now);
            next_send = now + config.interval;
        }

        let done_sending = prober.sent() >= config.count as usize;
        // Keep listening for the whole wait: slower systems answer late.
        if done_sending
            && last_sent.is_none_or(|at| now.saturating_duration_since(at) >= config.wait)
        {
            break;
        }

        let timeout = if done_sending {
            Duration::from_millis(50)
        } else {
            next_send
                .saturating_duration_since(now)
                .min(Duration::from_millis(50))
        };
        let Some(message) = subscription.recv_timeout(timeout)? else {
            continue;
        };

        match prober.handle(&message.envelope, unix_micros()) {
            Ok(ProbeEvent::Echo(reply)) => bus.publish(MAVLINK, &BusMessage::new(reply))?,
            Ok(ProbeEvent::RoundTrip(rt)) => info!(
                system = rt.responder_system,
                component = rt.responder_component,
                seq = rt.seq,
                rtt_us = rt.rtt_us,
                "ping response"
            ),
            Ok(ProbeEvent::UnknownSequence { seq, responder }) => warn!(
                seq,
                system = responder.system_id,
                component = responder.component_id,
                "ping response for unknown sequence"
            ),
            Ok(ProbeEvent::Ignored) => {}
            Err(err) => warn!(error = %err, "undecodable ping"),
        }
    }

    Ok(prober.report())
}

/// Answer a decoded probe seen by a non-prober, if it is a broadcast.
pub(crate) fn maybe_echo(envelope: &Envelope, responder: Origin, now_usec: u64) -> Option<Envelope> {
    match Message::decode(envelope) {
        Ok(Message::Ping(ping)) if ping.is_broadcast() => {
            Some(echo_reply(&ping, envelope.origin(), responder, now_usec))
        }
        _ => None,
    }
}
