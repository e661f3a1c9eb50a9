use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ReplayError, Result};

/// Extension of indexed image files.
pub const IMAGE_EXTENSION: &str = "bmp";

/// Image files of one camera keyed by capture timestamp.
///
/// Built from `<timestamp>.bmp` names; anything else in the directory is
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageIndex {
    images: BTreeMap<u64, PathBuf>,
}

impl ImageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `dir`. A directory that does not exist yields an empty index.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "image directory missing, index empty");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(ReplayError::Open {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        let mut index = Self::new();
        for entry in entries {
            let path = entry?.path();
            if let Some(timestamp) = capture_timestamp(&path) {
                index.insert(timestamp, path);
            }
        }
        info!(dir = %dir.display(), images = index.len(), "indexed image directory");
        Ok(index)
    }

    pub fn insert(&mut self, timestamp: u64, path: impl Into<PathBuf>) {
        self.images.insert(timestamp, path.into());
    }

    /// Image captured exactly at `timestamp`.
    pub fn get(&self, timestamp: u64) -> Option<&Path> {
        self.images.get(&timestamp).map(PathBuf::as_path)
    }

    /// First image captured strictly after `after`, or the first image at all.
    pub fn next_after(&self, after: Option<u64>) -> Option<(u64, &Path)> {
        let lower = match after {
            Some(ts) => Bound::Excluded(ts),
            None => Bound::Unbounded,
        };
        self.images
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(ts, path)| (*ts, path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn capture_timestamp(path: &Path) -> Option<u64> {
    if path.extension()?.to_str()? != IMAGE_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Default left and right image directories for a log:
/// `<log path without extension>/left` and `/right`.
pub fn default_image_dirs(log: impl AsRef<Path>) -> (PathBuf, PathBuf) {
    let base = log.as_ref().with_extension("");
    (base.join("left"), base.join("right"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mavrelay-index-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    #[test]
    fn indexes_numeric_bmp_files_only() {
        let dir = unique_temp_dir("scan");
        for name in ["500000.bmp", "1000.bmp", "notes.bmp", "700.jpg", "900.bmp.tmp"] {
            fs::write(dir.join(name), b"BM").unwrap();
        }

        let index = ImageIndex::scan(&dir).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(500_000), Some(dir.join("500000.bmp").as_path()));
        assert!(index.get(700).is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_empty() {
        let index = ImageIndex::scan("/nonexistent/mavrelay/left").unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn next_after_walks_in_timestamp_order() {
        let mut index = ImageIndex::new();
        index.insert(30, "c.bmp");
        index.insert(10, "a.bmp");
        index.insert(20, "b.bmp");

        assert_eq!(index.next_after(None).map(|(ts, _)| ts), Some(10));
        assert_eq!(index.next_after(Some(10)).map(|(ts, _)| ts), Some(20));
        assert_eq!(index.next_after(Some(15)).map(|(ts, _)| ts), Some(20));
        assert!(index.next_after(Some(30)).is_none());
    }

    #[test]
    fn default_dirs_strip_the_log_extension() {
        let (left, right) = default_image_dirs("/data/flight7.mavlink");
        assert_eq!(left, PathBuf::from("/data/flight7/left"));
        assert_eq!(right, PathBuf::from("/data/flight7/right"));
    }
}
