//! Camera plumbing around the shape pipeline: frame sources, the capture
//! loop, the command channel that drives it, snapshots and display hand-off.
//!
//! ```rust,no_run
//! use capture::{
//!     command_channel, frame_slot, CameraConfig, CaptureSession, FfmpegCamera,
//!     SessionCommand, SnapshotWriter,
//! };
//! use shapes::ShapePipeline;
//!
//! let camera = FfmpegCamera::open(&CameraConfig::default())?;
//! let (commands, inbox) = command_channel();
//! let (slot, _watcher) = frame_slot();
//!
//! let mut session = CaptureSession::new(
//!     camera,
//!     ShapePipeline::builder().build(),
//!     SnapshotWriter::default(),
//!     inbox,
//!     slot,
//! )
//! .with_detection(true);
//!
//! commands.try_send(SessionCommand::Quit)?;
//! let report = session.run()?;
//! println!("{} frames", report.frames);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod source;
pub mod command;
pub mod snapshot;
pub mod display;
pub mod session;

pub use error::{CaptureError, Result};
pub use source::{CameraConfig, FfmpegCamera, FrameSource, ImageSequenceSource, MemorySource};
pub use command::{command_channel, SessionCommand, COMMAND_QUEUE_DEPTH};
pub use snapshot::{snapshot_name_at, SnapshotWriter};
pub use display::{frame_slot, run_display, FrameSink, FrameSlot, FrameWatcher, LogSink, PreviewFileSink};
pub use session::{CaptureSession, SessionReport, StepOutcome};
