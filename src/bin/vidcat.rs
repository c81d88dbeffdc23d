use std::path::PathBuf;

use anyhow::Context as _;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use vidcat::{
    ConvertConfig, FfmpegFrameSource, FrameSource as _, IndicatifProgress, NoProgress,
    OutputWidth, ProgressSink, TranscodeThreading, VidcatError, ZstdCompressor, ZstdOpts,
};

/// Convert a video into a compressed terminal escape-sequence stream.
#[derive(Parser, Debug)]
#[command(name = "vidcat", version)]
struct Cli {
    /// Path to the video file.
    video: PathBuf,

    /// Terminal width in columns.
    #[arg(long, default_value_t = 80, allow_negative_numbers = true)]
    width: i64,

    /// Output file path (default: the video path with a `.zst` extension).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Seed for the pixel visit orders. The same seed reproduces the same output.
    #[arg(long)]
    seed: Option<u64>,

    /// zstd compression level.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=19))]
    level: Option<u8>,

    /// Worker threads for transcoding (default: one per core).
    #[arg(long)]
    threads: Option<usize>,

    /// Frames transcoded per parallel batch.
    #[arg(long, default_value_t = 32)]
    chunk_size: usize,

    /// Transcode on the calling thread only.
    #[arg(long)]
    sequential: bool,

    /// Do not draw a progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Fail instead of replacing an existing output file.
    #[arg(long)]
    no_overwrite: bool,

    /// Also write conversion statistics as JSON to this path.
    #[arg(long)]
    stats_json: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let width = OutputWidth::new(cli.width)?;
    vidcat::ensure_readable_file(&cli.video)?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| vidcat::default_output_path(&cli.video));
    if vidcat::same_file(&output, &cli.video) {
        return Err(VidcatError::invalid_input(format!(
            "output path '{}' would overwrite the input video",
            output.display()
        ))
        .into());
    }

    println!("Processing video: {}", cli.video.display());
    println!("Terminal width: {}", width.get());
    println!("Output: {}", output.display());

    for tool in ["ffprobe", "ffmpeg", "zstd"] {
        vidcat::require_on_path(tool)?;
    }

    println!("Extracting video metadata...");
    let mut source = FfmpegFrameSource::open(&cli.video, width)
        .with_context(|| format!("failed to start decoding '{}'", cli.video.display()))?;
    let info = source.info().clone();
    let frames_hint = info
        .frame_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!(
        "Video: {}x{}, {:.2} fps, {} frames",
        info.width,
        info.height,
        info.fps.as_f64(),
        frames_hint
    );
    let geometry = source.geometry();
    println!(
        "Terminal dimensions: {}x{}",
        geometry.columns, geometry.rows
    );

    let cfg = ConvertConfig {
        width: i64::from(width.get()),
        seed: cli.seed,
        threading: TranscodeThreading {
            parallel: !cli.sequential,
            chunk_size: cli.chunk_size,
            threads: cli.threads,
        },
    };

    let mut zstd_opts = ZstdOpts::new(&output);
    zstd_opts.overwrite = !cli.no_overwrite;
    zstd_opts.level = cli.level;
    let mut compressor = ZstdCompressor::new(zstd_opts);

    let mut progress: Box<dyn ProgressSink> = if cli.no_progress {
        Box::new(NoProgress)
    } else {
        Box::new(IndicatifProgress::new())
    };

    println!("Transcoding and compressing frames...");
    let stats = vidcat::convert(&mut source, &mut compressor, progress.as_mut(), &cfg)
        .with_context(|| format!("failed to convert '{}'", cli.video.display()))?;

    if let Some(path) = cli.stats_json.as_ref() {
        let f = std::fs::File::create(path)
            .with_context(|| format!("create stats file '{}'", path.display()))?;
        serde_json::to_writer_pretty(f, &stats)
            .with_context(|| format!("write stats file '{}'", path.display()))?;
    }

    println!();
    println!("Output file: {}", output.display());
    println!("Compressed {} frames", stats.frames);
    println!("Average frame size: {:.0} bytes", stats.avg_frame_size());
    println!(
        "Stream size: {} bytes ({} bytes compressed)",
        stats.bytes_in, stats.bytes_out
    );
    println!("Seed: {}", stats.seed);
    println!();
    println!("To play back:");
    println!("  {}", vidcat::playback_command(&output, &stats));
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
