use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use folio_transcode::{
    DirMediaStore, FfmpegCapabilities, FfmpegSink, FfmpegSource, Fps, GeometryPlan, OutputArtifact,
    SourceMedia, TranscodeOptions, Transcoder,
};

#[derive(Parser, Debug)]
#[command(name = "folio-transcode", version)]
struct Cli {
    /// Log pipeline decisions (repeat for trace-level output).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the output geometry for a source size as JSON.
    Plan(PlanArgs),
    /// Probe a media file with `ffprobe` and print its metadata as JSON.
    Probe(ProbeArgs),
    /// Transcode a video file (requires `ffmpeg` and `ffprobe` on PATH).
    Transcode(TranscodeArgs),
    /// Transcode a video file and store it in a directory-backed media store.
    Publish(PublishArgs),
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Source width in pixels.
    #[arg(long)]
    width: u32,

    /// Source height in pixels.
    #[arg(long)]
    height: u32,

    /// Output width cap.
    #[arg(long, default_value_t = 1920)]
    max_width: u32,

    /// Output height cap.
    #[arg(long, default_value_t = 1080)]
    max_height: u32,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// Input media file.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Args, Debug)]
struct TuningArgs {
    /// JSON file with transcode options; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output width cap.
    #[arg(long)]
    max_width: Option<u32>,

    /// Output height cap.
    #[arg(long)]
    max_height: Option<u32>,

    /// Target video bitrate in bits per second.
    #[arg(long)]
    bitrate: Option<u32>,

    /// Output frame rate as `num/den` or an integer.
    #[arg(long, value_parser = parse_fps)]
    fps: Option<Fps>,

    /// Recording ceiling in milliseconds.
    #[arg(long)]
    max_duration_ms: Option<u64>,

    /// Probe timeout in milliseconds.
    #[arg(long)]
    probe_timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct TranscodeArgs {
    /// Input video file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output file.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    tuning: TuningArgs,
}

#[derive(Args, Debug)]
struct PublishArgs {
    /// Input video file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Root directory of the media store.
    #[arg(long)]
    store_dir: PathBuf,

    /// Public base URL the store directory is served at.
    #[arg(long)]
    base_url: String,

    #[command(flatten)]
    tuning: TuningArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Probe(args) => cmd_probe(args),
        Command::Transcode(args) => cmd_transcode(args),
        Command::Publish(args) => cmd_publish(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_fps(s: &str) -> Result<Fps, String> {
    Fps::parse(s).map_err(|e| e.to_string())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let plan = GeometryPlan::compute(args.width, args.height, args.max_width, args.max_height)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = folio_transcode::probe_media(&args.in_path)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn cmd_transcode(args: TranscodeArgs) -> anyhow::Result<()> {
    let opts = resolve_options(&args.tuning)?;
    let artifact = transcode_file(&args.in_path, opts)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &artifact.bytes)
        .with_context(|| format!("write output '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} bytes, {}, {:?})",
        args.out.display(),
        artifact.len(),
        artifact.mime_type,
        artifact.stats.termination
    );
    Ok(())
}

fn cmd_publish(args: PublishArgs) -> anyhow::Result<()> {
    let opts = resolve_options(&args.tuning)?;
    let artifact = transcode_file(&args.in_path, opts)?;

    let filename = args
        .in_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let store = DirMediaStore::new(&args.store_dir, args.base_url);
    let stored = folio_transcode::publish(&store, &artifact, &filename)?;
    println!("{}", serde_json::to_string_pretty(&stored)?);
    Ok(())
}

fn resolve_options(tuning: &TuningArgs) -> anyhow::Result<TranscodeOptions> {
    let mut opts = match &tuning.config {
        Some(path) => TranscodeOptions::from_json_file(path)?,
        None => TranscodeOptions::default(),
    };
    if let Some(v) = tuning.max_width {
        opts.max_width = v;
    }
    if let Some(v) = tuning.max_height {
        opts.max_height = v;
    }
    if let Some(v) = tuning.bitrate {
        opts.target_bitrate = v;
    }
    if let Some(v) = tuning.fps {
        opts.frame_rate = v;
    }
    if let Some(v) = tuning.max_duration_ms {
        opts.max_duration_ms = v;
    }
    if let Some(v) = tuning.probe_timeout_ms {
        opts.probe_timeout_ms = v;
    }
    opts.validate()?;
    Ok(opts)
}

fn transcode_file(path: &Path, opts: TranscodeOptions) -> anyhow::Result<OutputArtifact> {
    let media = SourceMedia::from_path(path)?;
    let source = FfmpegSource::open(media)?;
    let mut sink = FfmpegSink::new();
    let capabilities = FfmpegCapabilities::detect();

    let transcoder = Transcoder::new(opts).with_progress(|p| {
        tracing::info!(progress = p, "transcode progress");
    });
    let artifact = transcoder.run(Box::new(source), &mut sink, &capabilities)?;
    Ok(artifact)
}
