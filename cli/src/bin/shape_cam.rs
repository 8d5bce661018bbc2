use clap::{Parser, Subcommand};
use cli::AppConfig;
use color_eyre::eyre::{eyre, Result};
use capture::{
    command_channel, frame_slot, run_display, CaptureSession, FfmpegCamera, FrameSink, FrameSource,
    FrameWatcher, ImageSequenceSource, LogSink, PreviewFileSink, SessionCommand, SnapshotWriter,
};
use shapes::{PipelineBuilder, ShapePipeline};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Webcam shape detection demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream the camera, detect shapes on demand and save snapshots.
    ///
    /// Control lines on stdin: `capture [name]`, `detect`, `quit`
    /// (or JSON commands, see `schema --commands`).
    Run {
        /// Configuration file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Capture device, overrides the configured one
        #[arg(long)]
        device: Option<String>,
        /// Replay a directory of images instead of opening the camera
        #[arg(long)]
        frames_dir: Option<PathBuf>,
        /// Restart the image directory when it runs out
        #[arg(long = "loop", requires = "frames_dir")]
        looping: bool,
        /// Start with shape detection on
        #[arg(long)]
        detect: bool,
        /// Font for shape captions instead of the bundled one
        #[arg(long)]
        font: Option<PathBuf>,
        /// Draw outlines without captions
        #[arg(long)]
        no_captions: bool,
        /// Keep the latest frame in this JPEG file
        #[arg(long)]
        preview: Option<PathBuf>,
        /// Directory for snapshots
        #[arg(long)]
        images_dir: Option<PathBuf>,
    },
    /// Detect shapes in a single image
    Detect {
        /// Input image
        input: PathBuf,
        /// Configuration file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the annotated image here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print detections as JSON
        #[arg(long)]
        json: bool,
        /// Treat the input as a mask, thresholded at this gray level, instead of finding edges
        #[arg(long)]
        mask_threshold: Option<u8>,
        /// Font for shape captions instead of the bundled one
        #[arg(long)]
        font: Option<PathBuf>,
        /// Draw outlines without captions
        #[arg(long)]
        no_captions: bool,
    },
    /// Print a JSON schema
    Schema {
        /// Schema of stdin control commands instead of the config file
        #[arg(long)]
        commands: bool,
    },
    /// Write a configuration file with every default filled in
    InitConfig {
        #[arg(default_value = "shape-cam.toml")]
        path: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            device,
            frames_dir,
            looping,
            detect,
            font,
            no_captions,
            preview,
            images_dir,
        } => {
            let mut config = load_config(config.as_deref())?;
            if device.is_some() {
                config.camera.device = device;
            }
            apply_caption_flags(&mut config, font, no_captions);
            if preview.is_some() {
                config.output.preview_path = preview;
            }
            if let Some(dir) = images_dir {
                config.output.images_dir = dir;
            }
            config.detect_on_start |= detect;

            run_camera(config, frames_dir, looping).await?;
        }
        Commands::Detect {
            input,
            config,
            output,
            json,
            mask_threshold,
            font,
            no_captions,
        } => {
            let mut config = load_config(config.as_deref())?;
            apply_caption_flags(&mut config, font, no_captions);
            detect_image(&input, &config, output.as_deref(), json, mask_threshold)?;
        }
        Commands::Schema { commands } => {
            let schema = if commands {
                serde_json::to_string_pretty(&SessionCommand::schema())?
            } else {
                serde_json::to_string_pretty(&AppConfig::schema())?
            };
            println!("{}", schema);
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(eyre!("{} already exists, pass --force to replace it", path.display()));
            }
            AppConfig::default().to_file(&path)?;
            info!("Configuration written to {:?}", path);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Ok(AppConfig::from_file(path)?)
        }
        None => Ok(AppConfig::default()),
    }
}

fn apply_caption_flags(config: &mut AppConfig, font: Option<PathBuf>, no_captions: bool) {
    if font.is_some() {
        config.detector.annotation.font_path = font;
    }
    if no_captions {
        config.detector.annotation.show_captions = false;
    }
}

async fn run_camera(config: AppConfig, frames_dir: Option<PathBuf>, looping: bool) -> Result<()> {
    let pipeline = PipelineBuilder::from_config(&config.detector)?.build();
    info!("{}", pipeline.info());

    match frames_dir {
        Some(dir) => {
            let source = ImageSequenceSource::open(&dir, config.camera.width, config.camera.height, looping)?;
            run_session(source, pipeline, &config).await
        }
        None => {
            let camera = FfmpegCamera::open(&config.camera)?;
            run_session(camera, pipeline, &config).await
        }
    }
}

async fn run_session<S>(source: S, pipeline: ShapePipeline, config: &AppConfig) -> Result<()>
where
    S: FrameSource + 'static,
{
    let (commands, inbox) = command_channel();
    let (slot, watcher) = frame_slot();

    let display = match &config.output.preview_path {
        Some(path) => {
            info!("Live preview at {:?}", path);
            tokio::spawn(present(watcher, PreviewFileSink::new(path)))
        }
        None => tokio::spawn(present(watcher, LogSink::default())),
    };

    let quit_on_interrupt = {
        let commands = commands.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping capture");
                let _ = commands.send(SessionCommand::Quit).await;
            }
        })
    };
    spawn_stdin_control(commands);
    info!("Controls: `capture [name]`, `detect`, `quit`");

    let session = CaptureSession::new(
        source,
        pipeline,
        SnapshotWriter::new(&config.output.images_dir),
        inbox,
        slot,
    )
    .with_detection(config.detect_on_start);

    let report = tokio::task::spawn_blocking(move || {
        let mut session = session;
        session.run()
    })
    .await??;

    quit_on_interrupt.abort();
    display.await?;

    info!(
        "✅ Session finished: {} frames, {} regions detected",
        report.frames, report.detections
    );
    for path in &report.snapshots {
        info!("📸 {:?}", path);
    }
    Ok(())
}

async fn present<S>(watcher: FrameWatcher, sink: S)
where
    S: FrameSink + 'static,
{
    match run_display(watcher, sink).await {
        Ok(sink) => info!("Display closed: {}", sink.description()),
        Err(e) => warn!("Display stopped: {}", e),
    }
}

/// Forward stdin control lines to the session.
///
/// A plain thread so a pending read never holds up runtime shutdown.
fn spawn_stdin_control(commands: mpsc::Sender<SessionCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match SessionCommand::parse_line(&line) {
                Ok(Some(command)) => {
                    info!("{} ({})", command, command.description());
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring control line: {}", e),
            }
        }
    });
}

fn detect_image(
    input: &Path,
    config: &AppConfig,
    output: Option<&Path>,
    json: bool,
    mask_threshold: Option<u8>,
) -> Result<()> {
    let mut builder = PipelineBuilder::from_config(&config.detector)?;
    if let Some(threshold) = mask_threshold {
        builder = builder.with_threshold_mask(threshold);
    }
    let pipeline = builder.build();

    let mut frame = image::open(input)?.to_rgb8();
    let detections = pipeline.annotate_frame(&mut frame)?;

    for (label, count) in detections.label_counts() {
        info!("{}: {}", label, count);
    }
    info!("Found {} shapes in {:?}", detections.len(), input);

    if let Some(output) = output {
        frame.save(output)?;
        info!("Annotated image saved to {:?}", output);
    }
    if json {
        println!("{}", detections.to_json()?);
    }
    Ok(())
}
