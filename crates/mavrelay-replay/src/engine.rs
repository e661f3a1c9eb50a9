use std::collections::BTreeSet;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use mavrelay_bus::{Bus, BusMessage, MAVLINK};
use mavrelay_frame::{msgid, FrameConfig, ImageTriggered};
use mavrelay_transfer::Orientation;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{ReplayError, Result};
use crate::index::ImageIndex;
use crate::log::{LogReader, LogRecord};
use crate::sink::ImageSink;

/// Replay settings.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Publish nothing until a trigger capture time or record time reaches this.
    pub start: Option<u64>,
    /// Message types never republished.
    pub suppressed: Vec<u8>,
    /// Publish EXTENDED_MESSAGE records together with their trailer.
    pub publish_extended: bool,
    /// Topic records are published on.
    pub topic: String,
    /// Codec settings for reading the log.
    pub frame: FrameConfig,
    /// Camera mounting reported with replayed images.
    pub orientation: Orientation,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            start: None,
            suppressed: vec![msgid::IMAGE_AVAILABLE],
            publish_extended: false,
            topic: MAVLINK.to_string(),
            frame: FrameConfig::default(),
            orientation: Orientation::Forward,
        }
    }
}

/// Image files to publish for one capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub timestamp: u64,
    pub left: PathBuf,
    /// Right image, in stereo mode when one was found.
    pub right: Option<PathBuf>,
    /// Resolved from an IMAGE_TRIGGERED record rather than by time sync.
    pub triggered: bool,
}

/// What to do for one log record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    /// Pause before publishing anything.
    pub wait: Duration,
    pub message: Option<BusMessage>,
    pub images: Vec<ImagePair>,
}

impl Step {
    /// Nothing to publish.
    pub fn is_idle(&self) -> bool {
        self.message.is_none() && self.images.is_empty()
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub records: u64,
    pub published: u64,
    pub suppressed: u64,
    pub skipped_before_start: u64,
    pub images_published: u64,
    pub missing_images: u64,
    pub image_failures: u64,
    pub publish_errors: u64,
    pub corrupt_records: u64,
    pub start: Option<u64>,
    pub start_reached: bool,
    pub cancelled: bool,
}

impl ReplayReport {
    /// Fail when a start timestamp was requested but never reached.
    pub fn ensure_start_reached(&self) -> Result<()> {
        match self.start {
            Some(start) if !self.start_reached => Err(ReplayError::StartNotReached { start }),
            _ => Ok(()),
        }
    }
}

/// Sync cursor over one image index: the last capture time consumed.
#[derive(Debug, Default)]
struct SyncCursor(Option<u64>);

/// Decides, record by record, what a replay publishes and when.
///
/// The engine does no I/O; [`run_replay`] sleeps, publishes and loads images
/// as each [`Step`] says.
#[derive(Debug)]
pub struct ReplayEngine {
    config: ReplayConfig,
    left: ImageIndex,
    right: ImageIndex,
    stereo: bool,
    started: bool,
    saw_trigger: bool,
    sync_left: SyncCursor,
    sync_right: SyncCursor,
    attached: BTreeSet<u64>,
    last_emit: Option<(u64, Duration)>,
    report: ReplayReport,
}

impl ReplayEngine {
    /// Stereo mode is on when the right index has any image.
    pub fn new(config: ReplayConfig, left: ImageIndex, right: ImageIndex) -> Self {
        let start = config.start.filter(|&start| start > 0);
        let stereo = !right.is_empty();
        info!(
            left = left.len(),
            right = right.len(),
            stereo,
            start = ?start,
            "replay engine ready"
        );
        Self {
            config: ReplayConfig { start, ..config },
            left,
            right,
            stereo,
            started: start.is_none(),
            saw_trigger: false,
            sync_left: SyncCursor::default(),
            sync_right: SyncCursor::default(),
            attached: BTreeSet::new(),
            last_emit: None,
            report: ReplayReport {
                start,
                start_reached: start.is_none(),
                ..ReplayReport::default()
            },
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn is_stereo(&self) -> bool {
        self.stereo
    }

    /// Plan the output for `record`, given the current clock reading.
    pub fn plan(&mut self, record: LogRecord, now: Duration) -> Step {
        let timestamp = record.timestamp;
        self.report.records += 1;
        self.latch(timestamp);

        let mut images = Vec::new();
        if record.envelope.msg_id == msgid::IMAGE_TRIGGERED {
            self.saw_trigger = true;
            match ImageTriggered::decode(&record.envelope.payload) {
                Ok(trigger) => {
                    self.latch(trigger.timestamp);
                    if let Some(pair) = self.resolve_trigger(&trigger) {
                        images.push(pair);
                    }
                }
                Err(err) => warn!(error = %err, "unreadable IMAGE_TRIGGERED, relaying as is"),
            }
        } else if self.started && !self.saw_trigger {
            if let Some(pair) = self.sync_images(timestamp) {
                images.push(pair);
            }
        }

        if !self.started {
            self.report.skipped_before_start += 1;
            return Step::default();
        }

        let message = self.outgoing(record);
        let mut step = Step {
            wait: Duration::ZERO,
            message,
            images,
        };
        if !step.is_idle() {
            step.wait = self.delay(timestamp, now);
        }
        step
    }

    /// Output for the record at `timestamp` went out at `now`.
    pub fn emitted(&mut self, timestamp: u64, now: Duration) {
        self.last_emit = Some((timestamp, now));
    }

    pub fn report(&self) -> &ReplayReport {
        &self.report
    }

    pub fn into_report(self) -> ReplayReport {
        self.report
    }

    fn latch(&mut self, timestamp: u64) {
        if self.started {
            return;
        }
        if self.config.start.is_some_and(|start| timestamp >= start) {
            info!(timestamp, "start timestamp reached, replaying from here");
            self.started = true;
            self.report.start_reached = true;
        }
    }

    fn start_at(&self) -> u64 {
        self.config.start.unwrap_or(0)
    }

    fn outgoing(&mut self, record: LogRecord) -> Option<BusMessage> {
        let id = record.envelope.msg_id;
        if self.config.suppressed.contains(&id) {
            self.report.suppressed += 1;
            return None;
        }
        if id == msgid::EXTENDED_MESSAGE {
            if !self.config.publish_extended {
                self.report.suppressed += 1;
                return None;
            }
            let message = BusMessage::new(record.envelope);
            return Some(match record.extended {
                Some(trailer) => message.with_extended(trailer),
                None => message,
            });
        }
        Some(BusMessage::new(record.envelope))
    }

    fn resolve_trigger(&mut self, trigger: &ImageTriggered) -> Option<ImagePair> {
        if !self.started || trigger.timestamp < self.start_at() {
            return None;
        }
        let capture = trigger.timestamp;
        let Some(left) = self.left.get(capture).map(|path| path.to_path_buf()) else {
            self.report.missing_images += 1;
            debug!(capture, "trigger without left image");
            return None;
        };
        let right = if self.stereo {
            let right = self.right.get(capture).map(|path| path.to_path_buf());
            if right.is_none() {
                self.report.missing_images += 1;
                debug!(capture, "trigger without right image, sending mono");
            }
            right
        } else {
            None
        };
        self.attached.insert(capture);
        Some(ImagePair {
            timestamp: capture,
            left,
            right,
            triggered: true,
        })
    }

    /// Next unpublished left image captured before `time`, paired with the
    /// next right image captured before `time` in stereo mode.
    fn sync_images(&mut self, time: u64) -> Option<ImagePair> {
        let start = self.start_at();
        let (capture, left) =
            next_sync(&self.left, &mut self.sync_left, start, &self.attached, time)?;
        let right = if self.stereo {
            next_sync(&self.right, &mut self.sync_right, start, &self.attached, time)
                .map(|(_, path)| path)
        } else {
            None
        };
        self.attached.insert(capture);
        Some(ImagePair {
            timestamp: capture,
            left,
            right,
            triggered: false,
        })
    }

    fn delay(&self, timestamp: u64, now: Duration) -> Duration {
        let Some((previous, emitted_at)) = self.last_emit else {
            return Duration::ZERO;
        };
        let gap = Duration::from_micros(timestamp.saturating_sub(previous));
        gap.saturating_sub(now.saturating_sub(emitted_at))
    }
}

fn next_sync(
    index: &ImageIndex,
    cursor: &mut SyncCursor,
    start: u64,
    attached: &BTreeSet<u64>,
    time: u64,
) -> Option<(u64, PathBuf)> {
    loop {
        let (capture, path) = index.next_after(cursor.0)?;
        if capture < start || attached.contains(&capture) {
            cursor.0 = Some(capture);
            continue;
        }
        if capture >= time {
            return None;
        }
        cursor.0 = Some(capture);
        return Some((capture, path.to_path_buf()));
    }
}

/// Replay every record of `reader` onto `bus`, paced by `clock`.
///
/// Stops early when `cancel` fires. The returned report says whether the
/// start timestamp was reached; see [`ReplayReport::ensure_start_reached`].
pub fn run_replay<B, R, C, S>(
    bus: &B,
    reader: &mut LogReader<R>,
    mut engine: ReplayEngine,
    clock: &C,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<ReplayReport>
where
    B: Bus,
    R: Read,
    C: Clock,
    S: ImageSink,
{
    let topic = engine.config().topic.clone();
    let mut published = 0u64;
    let mut publish_errors = 0u64;
    let mut images_published = 0u64;
    let mut image_failures = 0u64;
    let mut cancelled = false;

    while let Some(record) = reader.next_record()? {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        let timestamp = record.timestamp;
        let step = engine.plan(record, clock.now());
        if step.is_idle() {
            continue;
        }
        if !step.wait.is_zero() {
            clock.sleep(step.wait, cancel);
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
        }

        if let Some(message) = &step.message {
            match bus.publish(&topic, message) {
                Ok(()) => published += 1,
                Err(err) => {
                    publish_errors += 1;
                    warn!(error = %err, msg = message.envelope.name(), "publish failed");
                }
            }
        }
        for pair in &step.images {
            match sink.publish(pair) {
                Ok(()) => images_published += 1,
                Err(err) => {
                    image_failures += 1;
                    warn!(
                        capture = pair.timestamp,
                        path = %pair.left.display(),
                        error = %err,
                        "image not published"
                    );
                }
            }
        }
        engine.emitted(timestamp, clock.now());
    }

    let mut report = engine.into_report();
    report.published = published;
    report.publish_errors = publish_errors;
    report.images_published = images_published;
    report.image_failures = image_failures;
    report.corrupt_records = reader.corrupt_records();
    report.cancelled = cancelled;
    info!(
        records = report.records,
        published = report.published,
        images = report.images_published,
        start_reached = report.start_reached,
        "replay finished"
    );
    Ok(report)
}
