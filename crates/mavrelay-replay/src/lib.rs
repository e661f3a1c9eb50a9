//! Recorded sessions and their replay.
//!
//! A session log is a flat sequence of fixed 271-byte records (a
//! little-endian microsecond timestamp and one zero-padded wire frame),
//! with the trailer of an EXTENDED_MESSAGE following its record. Replay
//! republishes the records with their original spacing and reattaches
//! camera images, stored as `<capture timestamp>.bmp`, to the trigger
//! messages that announced them.

pub mod clock;
pub mod engine;
pub mod error;
pub mod index;
pub mod log;
pub mod recorder;
pub mod sink;

#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use engine::{run_replay, ImagePair, ReplayConfig, ReplayEngine, ReplayReport, Step};
pub use error::{ReplayError, Result};
pub use index::{default_image_dirs, ImageIndex, IMAGE_EXTENSION};
pub use log::{encode_record, LogReader, LogRecord, LogWriter, MAX_TRAILER_LEN, RECORD_LEN};
pub use recorder::{run_recorder, RecorderStats};
pub use sink::{ImageSink, TransferImageSink};
