use std::path::PathBuf;
use std::sync::Arc;

use image::RgbImage;
use shapes::ShapePipeline;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::{
    command::SessionCommand,
    display::FrameSlot,
    error::{CaptureError, Result},
    snapshot::SnapshotWriter,
    source::FrameSource,
};

/// What happened during one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub frames: u64,
    pub snapshots: Vec<PathBuf>,
    /// Regions classified across all frames processed with detection on
    pub detections: usize,
}

/// Result of a single loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    EndOfStream,
    Quit,
}

/// The capture loop: read a frame, apply pending commands, optionally detect
/// shapes, hand the frame to display.
///
/// Blocking; run it on a dedicated thread (e.g. `spawn_blocking`). The frame
/// source is released exactly once, when the session stops for any reason.
pub struct CaptureSession<S: FrameSource> {
    source: S,
    pipeline: ShapePipeline,
    snapshots: SnapshotWriter,
    commands: mpsc::Receiver<SessionCommand>,
    display: FrameSlot,
    detecting: bool,
    released: bool,
    report: SessionReport,
}

impl<S: FrameSource> CaptureSession<S> {
    pub fn new(
        source: S,
        pipeline: ShapePipeline,
        snapshots: SnapshotWriter,
        commands: mpsc::Receiver<SessionCommand>,
        display: FrameSlot,
    ) -> Self {
        Self {
            source,
            pipeline,
            snapshots,
            commands,
            display,
            detecting: false,
            released: false,
            report: SessionReport::default(),
        }
    }

    /// Start with detection already switched on or off
    pub fn with_detection(mut self, enabled: bool) -> Self {
        self.detecting = enabled;
        self
    }

    pub fn is_detecting(&self) -> bool {
        self.detecting
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    /// Run until quit, end of stream or error
    pub fn run(&mut self) -> Result<SessionReport> {
        info!(source = %self.source.description(), detecting = self.detecting, "capture session started");

        let outcome = loop {
            match self.step() {
                Ok(StepOutcome::Continue) => continue,
                Ok(stop) => break Ok(stop),
                Err(e) => break Err(e),
            }
        };
        self.release();

        match outcome {
            Ok(stop) => {
                info!(
                    ?stop,
                    frames = self.report.frames,
                    snapshots = self.report.snapshots.len(),
                    "capture session finished"
                );
                Ok(self.report.clone())
            }
            Err(e) => {
                error!("capture session failed: {}", e);
                Err(e)
            }
        }
    }

    /// Drain pending commands, then process one frame
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.released {
            return Ok(StepOutcome::EndOfStream);
        }

        let mut captures = Vec::new();
        loop {
            match self.commands.try_recv() {
                Ok(SessionCommand::Quit) => {
                    if !captures.is_empty() {
                        warn!(dropped = captures.len(), "quit requested before pending captures were taken");
                    }
                    return Ok(StepOutcome::Quit);
                }
                Ok(SessionCommand::ToggleDetection) => {
                    self.detecting = !self.detecting;
                    info!(detecting = self.detecting, "shape detection toggled");
                }
                Ok(SessionCommand::CaptureRequested { name }) => captures.push(name),
                // No control surface left; keep streaming until the source ends
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let Some(mut frame) = self.source.read_frame()? else {
            return Ok(StepOutcome::EndOfStream);
        };
        self.report.frames += 1;

        for name in captures {
            self.save_snapshot(&frame, name.as_deref())?;
        }

        if self.detecting {
            let detections = self.pipeline.annotate_frame(&mut frame)?;
            debug!(frame = self.report.frames, regions = detections.len(), "frame classified");
            self.report.detections += detections.len();
        }

        self.display.send_replace(Some(Arc::new(frame)));
        Ok(StepOutcome::Continue)
    }

    fn save_snapshot(&mut self, frame: &RgbImage, name: Option<&str>) -> Result<()> {
        match self.snapshots.save(frame, name) {
            Ok(path) => {
                self.report.snapshots.push(path);
                Ok(())
            }
            Err(CaptureError::InvalidSnapshotName(name)) => {
                warn!("ignoring capture with invalid name '{}'", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.source.release() {
            warn!("failed to release frame source: {}", e);
        }
    }
}

impl<S: FrameSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{command::command_channel, display::frame_slot, source::MemorySource};
    use image::Rgb;
    use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};

    fn square_frame() -> RgbImage {
        let mut frame = RgbImage::new(200, 160);
        draw_filled_rect_mut(&mut frame, Rect::at(40, 30).of_size(90, 90), Rgb([255, 255, 255]));
        frame
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("capture-session-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn session(
        frames: Vec<RgbImage>,
        images: &std::path::Path,
    ) -> (
        CaptureSession<MemorySource>,
        mpsc::Sender<SessionCommand>,
        crate::display::FrameWatcher,
    ) {
        let (tx, rx) = command_channel();
        let (slot, watcher) = frame_slot();
        let session = CaptureSession::new(
            MemorySource::new(frames),
            ShapePipeline::builder().build(),
            SnapshotWriter::new(images),
            rx,
            slot,
        );
        (session, tx, watcher)
    }

    #[test]
    fn test_runs_to_end_of_stream_and_releases_once() {
        let dir = temp_dir("eos");
        let (mut session, _tx, mut watcher) = session(vec![square_frame(); 3], &dir);

        let report = session.run().expect("Should run");
        assert_eq!(report.frames, 3);
        assert!(report.snapshots.is_empty());
        assert_eq!(session.source().release_count(), 1);

        // Frames pass through untouched while detection is off
        let shown = watcher.borrow_and_update().clone().expect("frame");
        assert_eq!(*shown, square_frame());
    }

    #[test]
    fn test_toggle_applies_to_the_next_frame() {
        let dir = temp_dir("toggle");
        let (mut session, tx, mut watcher) = session(vec![square_frame(); 2], &dir);

        tx.try_send(SessionCommand::ToggleDetection).expect("send");
        assert_eq!(session.step().expect("step"), StepOutcome::Continue);
        assert!(session.is_detecting());
        assert_eq!(session.report().detections, 1);

        let shown = watcher.borrow_and_update().clone().expect("frame");
        let outline = session.pipeline.annotator().outline_color;
        assert!(shown.pixels().any(|p| *p == outline));

        tx.try_send(SessionCommand::ToggleDetection).expect("send");
        session.step().expect("step");
        assert!(!session.is_detecting());
        let shown = watcher.borrow_and_update().clone().expect("frame");
        assert_eq!(*shown, square_frame());
    }

    #[test]
    fn test_capture_saves_raw_frame() {
        let dir = temp_dir("capture");
        let (session, tx, _watcher) = session(vec![square_frame(); 2], &dir);
        let mut session = session.with_detection(true);

        tx.try_send(SessionCommand::CaptureRequested { name: Some("desk".to_string()) })
            .expect("send");
        tx.try_send(SessionCommand::CaptureRequested { name: Some("../bad".to_string()) })
            .expect("send");

        let report = session.run().expect("Should run");
        assert_eq!(report.snapshots, vec![dir.join("desk.jpg")]);

        // Snapshots hold the camera image, not the overlay
        let saved = image::open(dir.join("desk.jpg")).expect("decode").to_rgb8();
        let outline = session.pipeline.annotator().outline_color;
        assert!(!saved.pixels().any(|p| *p == outline));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_quit_stops_before_reading() {
        let dir = temp_dir("quit");
        let (mut session, tx, watcher) = session(vec![square_frame(); 5], &dir);

        tx.try_send(SessionCommand::Quit).expect("send");
        let report = session.run().expect("Should run");

        assert_eq!(report.frames, 0);
        assert!(watcher.borrow().is_none());
        assert_eq!(session.source().release_count(), 1);
        assert_eq!(session.step().expect("step"), StepOutcome::EndOfStream);
    }

    #[test]
    fn test_closed_command_channel_keeps_streaming() {
        let dir = temp_dir("closed");
        let (mut session, tx, _watcher) = session(vec![square_frame(); 2], &dir);
        drop(tx);

        let report = session.run().expect("Should run");
        assert_eq!(report.frames, 2);
    }

    #[derive(Debug, Default)]
    struct FailingSource {
        released: usize,
    }

    impl FrameSource for FailingSource {
        fn read_frame(&mut self) -> Result<Option<RgbImage>> {
            Err(CaptureError::Device("unplugged".to_string()))
        }

        fn release(&mut self) -> Result<()> {
            self.released += 1;
            Ok(())
        }

        fn dimensions(&self) -> (u32, u32) {
            (0, 0)
        }

        fn description(&self) -> String {
            "failing".to_string()
        }
    }

    #[test]
    fn test_source_released_once_on_error() {
        let (_tx, rx) = command_channel();
        let (slot, _watcher) = frame_slot();
        let mut session = CaptureSession::new(
            FailingSource::default(),
            ShapePipeline::builder().build(),
            SnapshotWriter::default(),
            rx,
            slot,
        );

        assert!(matches!(session.run(), Err(CaptureError::Device(_))));
        assert_eq!(session.source().released, 1);
    }
}
