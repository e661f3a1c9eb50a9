use std::fs;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use mavrelay_bus::{Bus, BusMessage, IMAGES};
use mavrelay_frame::Origin;
use mavrelay_transfer::{
    ChunkSender, DataType, ImageFrame, Orientation, TriggerOutcome, DEFAULT_QUALITY,
};
use tracing::debug;

use crate::engine::ImagePair;
use crate::error::{ReplayError, Result};

/// Where replayed images go.
pub trait ImageSink {
    fn publish(&mut self, image: &ImagePair) -> Result<()>;
}

/// Publishes replayed images as chunked transfers.
///
/// A stereo pair goes out as two consecutive transfers, left first.
pub struct TransferImageSink<B> {
    bus: Arc<B>,
    topic: String,
    sender: ChunkSender,
    orientation: Orientation,
    packets: u64,
}

impl<B: Bus> TransferImageSink<B> {
    pub fn new(bus: Arc<B>, origin: Origin, orientation: Orientation) -> Self {
        Self {
            bus,
            topic: IMAGES.to_string(),
            sender: ChunkSender::new(origin),
            orientation,
            packets: 0,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Data packets published so far.
    pub fn packets(&self) -> u64 {
        self.packets
    }

    fn transfer(&mut self, frame: ImageFrame) -> Result<()> {
        let outcome = self.sender.begin(
            frame.data,
            frame.data_type,
            DEFAULT_QUALITY,
            frame.width,
            frame.height,
        )?;
        let TriggerOutcome::Started { handshake, .. } = outcome else {
            debug!(capture = frame.timestamp, "sender busy, image skipped");
            return Ok(());
        };
        self.bus.publish(&self.topic, &BusMessage::new(handshake))?;
        while let Some(packet) = self.sender.next_packet() {
            self.bus.publish(&self.topic, &BusMessage::new(packet))?;
            self.packets += 1;
        }
        debug!(
            capture = frame.timestamp,
            camera = frame.camera_id,
            orientation = ?frame.orientation,
            "image transferred"
        );
        Ok(())
    }
}

impl<B: Bus> ImageSink for TransferImageSink<B> {
    fn publish(&mut self, image: &ImagePair) -> Result<()> {
        let left = load_frame(&image.left, image.timestamp, 0, self.orientation)?;
        let right = match &image.right {
            Some(path) => Some(load_frame(path, image.timestamp, 1, self.orientation)?),
            None => None,
        };
        self.transfer(left)?;
        if let Some(right) = right {
            self.transfer(right)?;
        }
        Ok(())
    }
}

fn load_frame(
    path: &Path,
    timestamp: u64,
    camera_id: u64,
    orientation: Orientation,
) -> Result<ImageFrame> {
    let data = fs::read(path).map_err(|source| ReplayError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = bmp_dimensions(&data).unwrap_or((0, 0));
    Ok(ImageFrame {
        timestamp,
        camera_id,
        data: Bytes::from(data),
        data_type: DataType::Raw,
        orientation,
        stereo: None,
        width,
        height,
    })
}

/// Width and height from a BMP info header.
fn bmp_dimensions(data: &[u8]) -> Option<(u16, u16)> {
    if data.len() < 26 || &data[..2] != b"BM" {
        return None;
    }
    let field =
        |at: usize| i32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
    // Height is negative for top-down bitmaps.
    let width = u16::try_from(field(18).unsigned_abs()).unwrap_or(u16::MAX);
    let height = u16::try_from(field(22).unsigned_abs()).unwrap_or(u16::MAX);
    Some((width, height))
}
