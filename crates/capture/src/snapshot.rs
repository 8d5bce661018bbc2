use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use image::{ImageFormat, RgbImage};
use tracing::info;

use crate::error::{CaptureError, Result};

/// 12-hour clock, e.g. `2024-03-05-02-07-09` for 14:07:09
const SNAPSHOT_TIME_FORMAT: &str = "%Y-%m-%d-%I-%M-%S";

/// Default snapshot name for a moment in time, e.g. `2024-03-05-02-07-09`
pub fn snapshot_name_at<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format(SNAPSHOT_TIME_FORMAT).to_string()
}

/// Writes frames as JPEG files into a single directory
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    directory: PathBuf,
}

impl SnapshotWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Target path for a name, without touching the filesystem
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.contains('\0');
        if invalid {
            return Err(CaptureError::InvalidSnapshotName(name.to_string()));
        }
        Ok(self.directory.join(format!("{}.jpg", name)))
    }

    /// Save `frame` under `name`, or under the current local timestamp
    pub fn save(&self, frame: &RgbImage, name: Option<&str>) -> Result<PathBuf> {
        let name = match name {
            Some(name) => name.to_string(),
            None => snapshot_name_at(&Local::now()),
        };
        let path = self.path_for(&name)?;

        std::fs::create_dir_all(&self.directory)?;
        frame
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|source| CaptureError::Snapshot {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), "snapshot saved");
        Ok(path)
    }
}

impl Default for SnapshotWriter {
    fn default() -> Self {
        Self::new("images")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::Rgb;

    #[test]
    fn test_timestamp_name_uses_twelve_hour_clock() {
        let afternoon = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(snapshot_name_at(&afternoon), "2024-03-05-02-07-09");

        let midnight = Utc.with_ymd_and_hms(2023, 12, 31, 0, 30, 0).unwrap();
        assert_eq!(snapshot_name_at(&midnight), "2023-12-31-12-30-00");
    }

    #[test]
    fn test_path_validation() {
        let writer = SnapshotWriter::new("images");
        assert_eq!(writer.path_for("desk").expect("valid"), PathBuf::from("images/desk.jpg"));
        assert!(writer.path_for("").is_err());
        assert!(writer.path_for("../escape").is_err());
        assert!(writer.path_for("a/b").is_err());
        assert!(matches!(writer.path_for(".."), Err(CaptureError::InvalidSnapshotName(_))));
    }

    #[test]
    fn test_save_writes_jpeg() {
        let dir = std::env::temp_dir().join(format!("capture-snapshots-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let writer = SnapshotWriter::new(&dir);

        let frame = RgbImage::from_pixel(16, 12, Rgb([90, 120, 200]));
        let named = writer.save(&frame, Some("named")).expect("Should save");
        assert_eq!(named, dir.join("named.jpg"));

        let stamped = writer.save(&frame, None).expect("Should save");
        assert_eq!(stamped.extension().and_then(|e| e.to_str()), Some("jpg"));

        let loaded = image::open(&named).expect("Should decode").to_rgb8();
        assert_eq!(loaded.dimensions(), (16, 12));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
