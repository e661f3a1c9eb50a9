use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{BusError, Result};
use crate::message::BusMessage;
use crate::{Bus, BusSubscription};

type Subscribers = HashMap<String, Vec<Sender<BusMessage>>>;

/// In-process bus. Clones share the same topics.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    topics: Arc<Mutex<Subscribers>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.lock().get(topic).map_or(0, Vec::len)
    }
}

impl Bus for MemoryBus {
    type Subscription = MemorySubscription;

    fn publish(&self, topic: &str, message: &BusMessage) -> Result<()> {
        let mut topics = self.topics.lock();
        if let Some(senders) = topics.get_mut(topic) {
            // Dropped subscriptions are pruned on the next publish.
            senders.retain(|tx| tx.send(message.clone()).is_ok());
            trace!(topic, subscribers = senders.len(), "published");
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<MemorySubscription> {
        let (tx, rx) = mpsc::channel();
        self.topics
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(MemorySubscription { rx })
    }
}

/// Subscription on a [`MemoryBus`].
#[derive(Debug)]
pub struct MemorySubscription {
    rx: Receiver<BusMessage>,
}

impl MemorySubscription {
    /// Take a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<BusMessage> {
        self.rx.try_recv().ok()
    }
}

impl BusSubscription for MemorySubscription {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<BusMessage>> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(BusError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use mavrelay_frame::{msgid, Envelope, Origin};

    use super::*;

    fn message(seq: u8) -> BusMessage {
        BusMessage::new(
            Envelope::new(msgid::HEARTBEAT, Origin::new(1, 1), vec![0u8; 9]).with_sequence(seq),
        )
    }

    #[test]
    fn fan_out_to_every_subscriber() {
        let bus = MemoryBus::new();
        let mut a = bus.subscribe(crate::MAVLINK).unwrap();
        let mut b = bus.subscribe(crate::MAVLINK).unwrap();

        bus.publish(crate::MAVLINK, &message(1)).unwrap();

        let timeout = Duration::from_millis(100);
        assert_eq!(a.recv_timeout(timeout).unwrap(), Some(message(1)));
        assert_eq!(b.recv_timeout(timeout).unwrap(), Some(message(1)));
    }

    #[test]
    fn topics_are_isolated() {
        let bus = MemoryBus::new();
        let mut images = bus.subscribe(crate::IMAGES).unwrap();
        bus.publish(crate::MAVLINK, &message(1)).unwrap();
        assert_eq!(images.recv_timeout(Duration::from_millis(20)).unwrap(), None);
    }

    #[test]
    fn order_is_preserved() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe(crate::MAVLINK).unwrap();
        for seq in 0..10 {
            bus.publish(crate::MAVLINK, &message(seq)).unwrap();
        }
        for seq in 0..10 {
            let got = sub.try_recv().unwrap();
            assert_eq!(got.envelope.sequence, seq);
        }
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let bus = MemoryBus::new();
        let sub = bus.subscribe(crate::MAVLINK).unwrap();
        assert_eq!(bus.subscriber_count(crate::MAVLINK), 1);
        drop(sub);
        bus.publish(crate::MAVLINK, &message(0)).unwrap();
        assert_eq!(bus.subscriber_count(crate::MAVLINK), 0);
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let bus = MemoryBus::new();
        bus.publish(crate::IMAGES, &message(0)).unwrap();
    }
}
