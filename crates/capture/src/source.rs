use std::collections::VecDeque;
use std::fmt::Debug;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use image::{imageops::FilterType, RgbImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CaptureError, Result};

/// A blocking supplier of fixed-size color frames
pub trait FrameSource: Debug + Send {
    /// Block until the next frame is available. `None` means the stream ended.
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Give the underlying device back. Called exactly once by the session.
    fn release(&mut self) -> Result<()>;

    /// Width and height of every frame this source yields
    fn dimensions(&self) -> (u32, u32);

    /// Get a human-readable description of this source
    fn description(&self) -> String;
}

/// Camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture device, e.g. `/dev/video0` (v4l2) or `0` (avfoundation).
    /// Platform default when unset.
    pub device: Option<String>,
    /// ffmpeg input format (`v4l2`, `avfoundation`, `dshow`). Platform default when unset.
    pub input_format: Option<String>,
    pub width: u32,
    pub height: u32,
    pub framerate: Option<u32>,
    /// Explicit ffmpeg executable; `ffmpeg` from PATH when unset
    pub ffmpeg_path: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            input_format: None,
            width: 640,
            height: 480,
            framerate: None,
            ffmpeg_path: None,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_frame_size(self.width, self.height)?;
        if self.framerate == Some(0) {
            return Err(CaptureError::InvalidConfig("framerate must be positive".to_string()));
        }
        Ok(())
    }

    pub fn resolved_input_format(&self) -> String {
        self.input_format.clone().unwrap_or_else(|| {
            if cfg!(target_os = "macos") {
                "avfoundation"
            } else if cfg!(target_os = "windows") {
                "dshow"
            } else {
                "v4l2"
            }
            .to_string()
        })
    }

    pub fn resolved_device(&self) -> String {
        self.device.clone().unwrap_or_else(|| {
            if cfg!(target_os = "macos") {
                "0"
            } else if cfg!(target_os = "windows") {
                "video=0"
            } else {
                "/dev/video0"
            }
            .to_string()
        })
    }
}

/// Webcam frames read from an ffmpeg child process as raw rgb24.
///
/// ffmpeg owns the device; frames are scaled to the configured size and
/// streamed over its stdout, one `width * height * 3` byte block per frame.
#[derive(Debug)]
pub struct FfmpegCamera {
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    device: String,
    width: u32,
    height: u32,
    frames_read: u64,
}

impl FfmpegCamera {
    pub fn open(config: &CameraConfig) -> Result<Self> {
        config.validate()?;
        let ffmpeg = config.ffmpeg_path.as_deref().unwrap_or("ffmpeg");

        let device = config.resolved_device();
        let mut command = Self::build_command(ffmpeg, config, &device);
        debug!(?command, "spawning ffmpeg capture");

        let mut child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                CaptureError::DeviceUnavailable(format!("ffmpeg executable not found: {}", ffmpeg))
            }
            _ => CaptureError::DeviceUnavailable(format!("failed to start {}: {}", ffmpeg, e)),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::DeviceUnavailable("ffmpeg stdout was not captured".to_string())
        })?;

        info!(device = %device, width = config.width, height = config.height, "camera opened");
        Ok(Self {
            child: Some(child),
            stdout: Some(stdout),
            device,
            width: config.width,
            height: config.height,
            frames_read: 0,
        })
    }

    fn build_command(ffmpeg: &str, config: &CameraConfig, device: &str) -> Command {
        let mut command = Command::new(ffmpeg);
        command.args(["-hide_banner", "-loglevel", "error", "-f"]);
        command.arg(config.resolved_input_format());
        if let Some(framerate) = config.framerate {
            command.args(["-framerate", &framerate.to_string()]);
        }
        command
            .args(["-i", device])
            .args(["-vf", &format!("scale={}:{}", config.width, config.height)])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        command
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl FrameSource for FfmpegCamera {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let expected = self.frame_len();
        let Some(stdout) = self.stdout.as_mut() else {
            return Err(CaptureError::Device("camera already released".to_string()));
        };

        let mut buffer = vec![0u8; expected];
        let mut filled = 0;
        while filled < expected {
            match stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            if self.frames_read == 0 {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "{} produced no frames",
                    self.device
                )));
            }
            return Ok(None);
        }
        if filled < expected {
            return Err(CaptureError::FrameSize { expected, actual: filled });
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.width, self.height, buffer)
            .map(Some)
            .ok_or(CaptureError::FrameSize { expected, actual: filled })
    }

    fn release(&mut self) -> Result<()> {
        self.stdout.take();
        if let Some(mut child) = self.child.take() {
            if child.try_wait()?.is_none() {
                child.kill()?;
            }
            child.wait()?;
            info!(device = %self.device, frames = self.frames_read, "camera released");
        }
        Ok(())
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn description(&self) -> String {
        format!("FFmpeg camera: {} ({}x{})", self.device, self.width, self.height)
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.release() {
                warn!("failed to release camera on drop: {}", e);
            }
        }
    }
}

fn ensure_frame_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(CaptureError::InvalidConfig(format!(
            "frame size must be non-zero, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

/// Frames decoded from image files in a directory, in file name order.
///
/// Every image is resized to the configured dimensions so downstream code
/// sees the same fixed frame size a camera would deliver.
#[derive(Debug)]
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    next: usize,
    looping: bool,
    width: u32,
    height: u32,
    directory: PathBuf,
}

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

impl ImageSequenceSource {
    pub fn open(directory: impl AsRef<Path>, width: u32, height: u32, looping: bool) -> Result<Self> {
        ensure_frame_size(width, height)?;
        let directory = directory.as_ref().to_path_buf();
        let mut files: Vec<PathBuf> = std::fs::read_dir(&directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "no images found in {}",
                directory.display()
            )));
        }

        info!(directory = %directory.display(), frames = files.len(), looping, "image sequence opened");
        Ok(Self {
            files,
            next: 0,
            looping,
            width,
            height,
            directory,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.next >= self.files.len() {
            if !self.looping || self.files.is_empty() {
                return Ok(None);
            }
            self.next = 0;
        }

        let path = &self.files[self.next];
        self.next += 1;

        let frame = image::open(path)?.to_rgb8();
        if frame.dimensions() == (self.width, self.height) {
            return Ok(Some(frame));
        }
        Ok(Some(image::imageops::resize(&frame, self.width, self.height, FilterType::Triangle)))
    }

    fn release(&mut self) -> Result<()> {
        self.files.clear();
        Ok(())
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn description(&self) -> String {
        format!("Image sequence: {} ({} frames)", self.directory.display(), self.files.len())
    }
}

/// Pre-decoded frames held in memory
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<RgbImage>,
    dimensions: (u32, u32),
    released: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        let dimensions = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            frames: frames.into(),
            dimensions,
            released: 0,
        }
    }

    /// How many times `release` has been called
    pub fn release_count(&self) -> usize {
        self.released
    }
}

impl FrameSource for MemorySource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) -> Result<()> {
        self.released += 1;
        self.frames.clear();
        Ok(())
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn description(&self) -> String {
        format!("Memory source: {} frames left", self.frames.len())
    }
}
