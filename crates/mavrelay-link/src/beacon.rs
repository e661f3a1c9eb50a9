use std::time::{Duration, Instant};

use mavrelay_frame::SystemTime;

/// Periodic SYSTEM_TIME message for the device on the serial link.
///
/// Fires on the first poll and then once per interval.
#[derive(Debug, Clone)]
pub struct SystemTimeBeacon {
    interval: Duration,
    started: Instant,
    last: Option<Instant>,
}

impl SystemTimeBeacon {
    pub fn new(interval: Duration, started: Instant) -> Self {
        Self {
            interval,
            started,
            last: None,
        }
    }

    /// Return the message to send if the beacon is due at `now`.
    pub fn poll(&mut self, now: Instant, unix_usec: u64) -> Option<SystemTime> {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        self.last = Some(now);
        let boot_ms = now.saturating_duration_since(self.started).as_millis();
        Some(SystemTime {
            time_unix_usec: unix_usec,
            time_boot_ms: u32::try_from(boot_ms).unwrap_or(u32::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_immediately_then_every_interval() {
        let start = Instant::now();
        let mut beacon = SystemTimeBeacon::new(Duration::from_secs(2), start);

        let first = beacon.poll(start, 1_000).unwrap();
        assert_eq!(first.time_unix_usec, 1_000);
        assert_eq!(first.time_boot_ms, 0);

        assert!(beacon.poll(start + Duration::from_millis(1_999), 2_000).is_none());

        let second = beacon.poll(start + Duration::from_secs(2), 3_000).unwrap();
        assert_eq!(second.time_boot_ms, 2_000);
        assert!(beacon.poll(start + Duration::from_millis(2_100), 4_000).is_none());
    }
}
