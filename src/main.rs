//! framecipher - Main Entry Point
//!
//! Encrypts a time window of a video stream frame by frame, leaving every
//! other frame untouched.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use crossbeam_channel::RecvTimeoutError;
use framecipher::{
    cipher::build_cipher,
    config::{CipherKind, InputConfig, MediaFormat, PipelineConfig, DEFAULT_CONFIG_FILE},
    media,
    pipeline::{CancelToken, Pipeline, PipelineError, PipelineEvent},
    FrameCipherError,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often the progress line is logged during a run.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Exit code for a run stopped by Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "framecipher", version)]
#[command(about = "Selectively encrypt video frames through a concurrent pipeline")]
struct Cli {
    /// Also write logs to a daily-rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the read → encrypt → write pipeline
    Run(RunArgs),
    /// Print resolution, rate and frame count of an input
    Info(InfoArgs),
    /// Encrypt (or decrypt) a single image
    EncryptImage(EncryptImageArgs),
    /// Write a default configuration file
    InitConfig(InitConfigArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Raw,
    Images,
}

impl From<FormatArg> for MediaFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Raw => MediaFormat::Raw,
            FormatArg::Images => MediaFormat::Images,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CipherArg {
    Logistic,
    Random,
}

impl From<CipherArg> for CipherKind {
    fn from(arg: CipherArg) -> Self {
        match arg {
            CipherArg::Logistic => CipherKind::Logistic,
            CipherArg::Random => CipherKind::Random,
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input path (raw file or image directory)
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(long, value_enum)]
    input_format: Option<FormatArg>,

    /// Output path (raw file or image directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum)]
    output_format: Option<FormatArg>,

    /// Frame width for raw input
    #[arg(long)]
    width: Option<u32>,

    /// Frame height for raw input
    #[arg(long)]
    height: Option<u32>,

    /// Input frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Start of the encrypted window, in seconds
    #[arg(long)]
    start_secs: Option<f64>,

    /// End of the encrypted window, in seconds
    #[arg(long)]
    end_secs: Option<f64>,

    /// First encrypted frame index (overrides --start-secs)
    #[arg(long)]
    start_frame: Option<u64>,

    /// Last encrypted frame index (overrides --end-secs)
    #[arg(long)]
    end_frame: Option<u64>,

    #[arg(long, value_enum)]
    cipher: Option<CipherArg>,

    /// Seed for the random cipher
    #[arg(long)]
    seed: Option<u64>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl RunArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        let input = &mut config.input;
        if let Some(path) = &self.input {
            input.path = path.clone();
        }
        if let Some(format) = self.input_format {
            input.format = format.into();
        }
        if let Some(width) = self.width {
            input.width = width;
        }
        if let Some(height) = self.height {
            input.height = height;
        }
        if let Some(fps) = self.fps {
            input.fps = fps;
        }

        let output = &mut config.output;
        if let Some(path) = &self.output {
            output.path = path.clone();
        }
        if let Some(format) = self.output_format {
            output.format = format.into();
        }

        let window = &mut config.window;
        if let Some(secs) = self.start_secs {
            window.start_secs = secs;
        }
        if let Some(secs) = self.end_secs {
            window.end_secs = secs;
        }
        if self.start_frame.is_some() {
            window.start_frame = self.start_frame;
        }
        if self.end_frame.is_some() {
            window.end_frame = self.end_frame;
        }

        if let Some(kind) = self.cipher {
            config.cipher.kind = kind.into();
        }
        if self.seed.is_some() {
            config.cipher.seed = self.seed;
        }
    }
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[arg(short, long)]
    input: PathBuf,

    #[arg(long, value_enum, default_value = "raw")]
    format: FormatArg,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    #[arg(long, default_value_t = 30.0)]
    fps: f64,
}

#[derive(Args, Debug)]
struct EncryptImageArgs {
    #[arg(short, long)]
    input: PathBuf,

    /// Output image; written as PNG
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value = "logistic")]
    cipher: CipherArg,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct InitConfigArgs {
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_dir.as_deref());

    let result = match cli.command {
        Command::Run(args) => run(args),
        Command::Info(args) => info(args),
        Command::EncryptImage(args) => encrypt_image(args),
        Command::InitConfig(args) => init_config(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if is_cancelled(&e) {
                tracing::warn!("Cancelled");
                ExitCode::from(EXIT_CANCELLED)
            } else {
                tracing::error!("{:#}", e);
                ExitCode::FAILURE
            }
        }
    }
}

/// Install the global subscriber. The returned guard flushes the log file on drop.
fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let registry = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,framecipher=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "framecipher.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn is_cancelled(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<PipelineError>(),
            Some(PipelineError::Cancelled)
        ) || matches!(
            cause.downcast_ref::<FrameCipherError>(),
            Some(FrameCipherError::Pipeline(PipelineError::Cancelled))
        )
    })
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let (source, video) = media::open_source(&config.input)
        .with_context(|| format!("Failed to open input {:?}", config.input.path))?;
    tracing::info!("Input: {}", video);

    let range = config.range();
    if range.is_empty() {
        tracing::warn!("Window {} selects no frames; output will equal input", range);
    } else if video.frame_count > 0 && range.start >= video.frame_count {
        tracing::warn!(
            "Window {} starts past the last frame ({})",
            range,
            video.frame_count
        );
    }

    let cipher = build_cipher(&config.cipher);
    let sink = media::open_sink(&config.output)
        .with_context(|| format!("Failed to create output {:?}", config.output.path))?;

    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("Interrupt received, stopping pipeline");
        handler_token.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let running = Pipeline::builder(range)
        .cancel_token(token)
        .events(tx)
        .build()
        .spawn(source, cipher, sink)?;

    let monitor = running.monitor();
    let progress = std::thread::Builder::new()
        .name("framecipher-progress".to_string())
        .spawn(move || loop {
            match rx.recv_timeout(PROGRESS_INTERVAL) {
                Ok(PipelineEvent::StageFailed { stage, message }) => {
                    tracing::warn!("{} stage failed: {}", stage, message)
                }
                Ok(event) => tracing::debug!("{:?}", event),
                Err(RecvTimeoutError::Timeout) => {
                    tracing::info!("{}: {}", monitor.state(), monitor.progress())
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        })
        .context("Failed to spawn progress thread")?;

    let result = running.wait();
    let _ = progress.join();
    let report = result?;

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {:?}", path))?;
    }
    println!("{}", report);
    Ok(())
}

fn info(args: InfoArgs) -> anyhow::Result<()> {
    let input = InputConfig {
        format: args.format.into(),
        path: args.input,
        width: args.width,
        height: args.height,
        fps: args.fps,
    };
    let (source, video) = media::open_source(&input)?;
    println!("{}", source.describe());
    println!("{}", video);
    Ok(())
}

fn encrypt_image(args: EncryptImageArgs) -> anyhow::Result<()> {
    let mut config = PipelineConfig::default();
    config.cipher.kind = args.cipher.into();
    config.cipher.seed = args.seed;

    let mut cipher = build_cipher(&config.cipher);
    let image = media::encrypt_image(&args.input, &args.output, cipher.as_mut())?;
    println!("{}x{} -> {}", image.width, image.height, args.output.display());
    Ok(())
}

fn init_config(args: InitConfigArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.output.display()
        );
    }
    PipelineConfig::default().save(&args.output)?;
    println!("Wrote {}", args.output.display());
    Ok(())
}
