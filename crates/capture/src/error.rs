use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Invalid camera configuration: {0}")]
    InvalidConfig(String),

    #[error("Camera error: {0}")]
    Device(String),

    #[error("Frame has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Invalid snapshot name '{0}': must be non-empty and contain no path separators")]
    InvalidSnapshotName(String),

    #[error("Failed to save snapshot to {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Detection failed: {0}")]
    Detection(#[from] shapes::ShapeError),

    #[error("Command error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
