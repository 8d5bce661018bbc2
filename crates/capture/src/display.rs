use std::path::PathBuf;
use std::sync::Arc;

use image::{ImageFormat, RgbImage};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Result;

/// Single-slot hand-off of the most recent frame to the display side.
///
/// The capture loop overwrites the slot on every frame; the display side only
/// ever sees the latest one, so at most one frame is in flight per role.
pub type FrameSlot = watch::Sender<Option<Arc<RgbImage>>>;
pub type FrameWatcher = watch::Receiver<Option<Arc<RgbImage>>>;

pub fn frame_slot() -> (FrameSlot, FrameWatcher) {
    watch::channel(None)
}

/// Something that presents finished frames to the user
pub trait FrameSink: Send {
    fn present(&mut self, frame: &RgbImage) -> Result<()>;

    /// Get a human-readable description of this sink
    fn description(&self) -> String;
}

/// Writes each presented frame to one JPEG file, replacing it atomically,
/// so any auto-reloading image viewer can follow the feed.
#[derive(Debug, Clone)]
pub struct PreviewFileSink {
    path: PathBuf,
}

impl PreviewFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSink for PreviewFileSink {
    fn present(&mut self, frame: &RgbImage) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let staging = self.path.with_extension("partial.jpg");
        frame.save_with_format(&staging, ImageFormat::Jpeg)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Preview file: {}", self.path.display())
    }
}

/// Only records that frames arrived
#[derive(Debug, Default)]
pub struct LogSink {
    presented: u64,
}

impl LogSink {
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl FrameSink for LogSink {
    fn present(&mut self, frame: &RgbImage) -> Result<()> {
        self.presented += 1;
        debug!(frame = self.presented, width = frame.width(), height = frame.height(), "frame presented");
        Ok(())
    }

    fn description(&self) -> String {
        "Log sink".to_string()
    }
}

/// Present frames from `watcher` until the capture side drops its slot.
///
/// Runs on the display task. Presentation is blocking I/O, so it is moved
/// off the async worker for each frame.
pub async fn run_display<S>(mut watcher: FrameWatcher, sink: S) -> Result<S>
where
    S: FrameSink + 'static,
{
    let mut sink = Some(sink);
    while watcher.changed().await.is_ok() {
        let Some(frame) = watcher.borrow_and_update().clone() else {
            continue;
        };
        let Some(mut current) = sink.take() else {
            break;
        };

        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = current.present(&frame);
            (current, outcome)
        })
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        if let Err(e) = outcome {
            warn!("failed to present frame: {}", e);
        }
        sink = Some(returned);
    }

    sink.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "display sink lost").into())
}
