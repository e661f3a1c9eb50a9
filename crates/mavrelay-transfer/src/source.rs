use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransferError};
use crate::protocol::DataType;

/// Camera mounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Forward,
    Downward,
}

/// One captured image, owned by whoever transfers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    /// Capture time in microseconds.
    pub timestamp: u64,
    pub camera_id: u64,
    pub data: Bytes,
    pub data_type: DataType,
    pub orientation: Orientation,
    /// Right image of a stereo pair.
    pub stereo: Option<Bytes>,
    pub width: u16,
    pub height: u16,
}

/// Produces frames on demand.
pub trait FrameSource: Send {
    /// The most recent frame, or `None` if nothing is available yet.
    fn latest(&mut self) -> Result<Option<ImageFrame>>;
}

/// Serves the newest encoded image file in a directory.
///
/// Files ending in `.jpg`/`.jpeg` are sent as JPEG, `.bmp` as raw. A numeric
/// file stem is taken as the capture timestamp; otherwise the modification
/// time is used.
#[derive(Debug, Clone)]
pub struct DirectoryFrameSource {
    dir: PathBuf,
    camera_id: u64,
    orientation: Orientation,
    width: u16,
    height: u16,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            camera_id: 0,
            orientation: Orientation::Forward,
            width: 640,
            height: 480,
        }
    }

    pub fn with_camera(mut self, camera_id: u64, orientation: Orientation) -> Self {
        self.camera_id = camera_id;
        self.orientation = orientation;
        self
    }

    /// Dimensions announced in descriptors.
    pub fn with_dimensions(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> TransferError {
        TransferError::Source {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn data_type_for(path: &Path) -> Option<DataType> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some(DataType::Jpeg),
        "bmp" => Some(DataType::Raw),
        _ => None,
    }
}

impl FrameSource for DirectoryFrameSource {
    fn latest(&mut self) -> Result<Option<ImageFrame>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| self.io_error(&self.dir, e))?;

        let mut newest: Option<(u64, PathBuf, DataType)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(data_type) = data_type_for(&path) else {
                continue;
            };
            let stamp = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
                .or_else(|| {
                    let modified = entry.metadata().ok()?.modified().ok()?;
                    Some(modified.duration_since(UNIX_EPOCH).ok()?.as_micros() as u64)
                });
            let Some(stamp) = stamp else {
                continue;
            };
            if newest.as_ref().is_none_or(|(best, _, _)| stamp > *best) {
                newest = Some((stamp, path, data_type));
            }
        }

        let Some((timestamp, path, data_type)) = newest else {
            return Ok(None);
        };
        let data = fs::read(&path).map_err(|e| self.io_error(&path, e))?;
        debug!(path = %path.display(), bytes = data.len(), "frame loaded");
        Ok(Some(ImageFrame {
            timestamp,
            camera_id: self.camera_id,
            data: Bytes::from(data),
            data_type,
            orientation: self.orientation,
            stereo: None,
            width: self.width,
            height: self.height,
        }))
    }
}
