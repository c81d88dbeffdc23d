use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::{
    compress::Compressor,
    foundation::core::{Fps, Frame, OutputWidth},
    foundation::error::{VidcatError, VidcatResult},
    progress::ProgressSink,
    source::FrameSource,
    transcode::{EscapeBlock, escape, transcode_seeded},
};

/// How frames are spread over worker threads.
///
/// Frames are pulled from the source in chunks of `chunk_size`; a chunk is transcoded in parallel
/// and written back in frame order before the next chunk is read.
#[derive(Clone, Debug)]
pub struct TranscodeThreading {
    pub parallel: bool,
    pub chunk_size: usize,
    pub threads: Option<usize>,
}

impl Default for TranscodeThreading {
    fn default() -> Self {
        Self {
            parallel: true,
            chunk_size: 32,
            threads: None,
        }
    }
}

/// Options for [`convert`].
#[derive(Clone, Debug)]
pub struct ConvertConfig {
    /// Target terminal columns. Kept signed so that bad user input reaches validation.
    pub width: i64,
    /// Run seed for the pixel visit orders. `None` draws one from entropy.
    pub seed: Option<u64>,
    pub threading: TranscodeThreading,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            width: i64::from(OutputWidth::DEFAULT.get()),
            seed: None,
            threading: TranscodeThreading::default(),
        }
    }
}

impl ConvertConfig {
    pub fn validate(&self) -> VidcatResult<OutputWidth> {
        let width = OutputWidth::new(self.width)?;
        if self.threading.chunk_size == 0 {
            return Err(VidcatError::invalid_input("chunk size must be >= 1"));
        }
        if self.threading.threads == Some(0) {
            return Err(VidcatError::invalid_input(
                "thread count must be >= 1 when set",
            ));
        }
        Ok(width)
    }
}

/// Outcome of a successful [`convert`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ConvertStats {
    pub frames: u64,
    /// Pixel columns of the transcoded frames.
    pub columns: u32,
    /// Terminal rows covered by the tallest frame.
    pub rows: u32,
    pub fps: Fps,
    pub seed: u64,
    /// Escape block size of every frame, boundary included.
    pub frame_sizes: Vec<u64>,
    /// Uncompressed stream size (prelude and epilogue included).
    pub bytes_in: u64,
    /// Size of the compressor's artifact.
    pub bytes_out: u64,
}

impl ConvertStats {
    pub fn avg_frame_size(&self) -> f64 {
        if self.frame_sizes.is_empty() {
            return 0.0;
        }
        self.frame_sizes.iter().sum::<u64>() as f64 / self.frame_sizes.len() as f64
    }

    /// Bytes per second that reproduce the source frame rate when the stream is rate-limited.
    pub fn playback_bytes_per_second(&self) -> u64 {
        ((self.avg_frame_size() * self.fps.as_f64()).round() as u64).max(1)
    }
}

/// Transcode every frame of `source` into `compressor`.
///
/// On any error the compressor is aborted so that no partial artifact remains.
pub fn convert(
    source: &mut dyn FrameSource,
    compressor: &mut dyn Compressor,
    progress: &mut dyn ProgressSink,
    cfg: &ConvertConfig,
) -> VidcatResult<ConvertStats> {
    let out = convert_inner(source, compressor, progress, cfg);
    if out.is_err() {
        compressor.abort();
    }
    progress.end();
    out
}

fn convert_inner(
    source: &mut dyn FrameSource,
    compressor: &mut dyn Compressor,
    progress: &mut dyn ProgressSink,
    cfg: &ConvertConfig,
) -> VidcatResult<ConvertStats> {
    let width = cfg.validate()?;
    let width = i64::from(width.get());
    let seed = cfg.seed.unwrap_or_else(|| fastrand::u64(..));
    let mut seeds = fastrand::Rng::with_seed(seed);
    let pool = if cfg.threading.parallel {
        Some(build_thread_pool(cfg.threading.threads)?)
    } else {
        None
    };

    let info = source.info().clone();
    tracing::info!(width, seed, fps = info.fps.as_f64(), "converting");

    let mut stats = ConvertStats {
        frames: 0,
        columns: 0,
        rows: 0,
        fps: info.fps,
        seed,
        frame_sizes: Vec::with_capacity(info.frame_count.unwrap_or(0).min(1 << 16) as usize),
        bytes_in: 0,
        bytes_out: 0,
    };

    compressor.begin()?;
    compressor.write_chunk(escape::STREAM_PRELUDE.as_bytes())?;
    stats.bytes_in += escape::STREAM_PRELUDE.len() as u64;
    progress.begin(info.frame_count);

    let mut exhausted = false;
    while !exhausted {
        let mut chunk = Vec::with_capacity(cfg.threading.chunk_size);
        while chunk.len() < cfg.threading.chunk_size {
            match source.next_frame()? {
                // Seeds are drawn in frame order so the output only depends on the run seed.
                Some(frame) => chunk.push((seeds.u64(..), frame)),
                None => {
                    exhausted = true;
                    break;
                }
            }
        }
        if chunk.is_empty() {
            break;
        }

        let blocks = match pool.as_ref() {
            Some(pool) => transcode_chunk_parallel(pool, &chunk, width),
            None => chunk
                .iter()
                .map(|(seed, frame)| transcode_seeded(frame, width, *seed))
                .collect(),
        };

        for block in blocks {
            let block = block?;
            compressor.write_chunk(block.as_bytes())?;
            stats.frames += 1;
            stats.columns = stats.columns.max(block.width());
            stats.rows = stats.rows.max(block.rows());
            stats.frame_sizes.push(block.len() as u64);
            stats.bytes_in += block.len() as u64;
            progress.frame_done(block.len());
        }
        tracing::trace!(frames = stats.frames, "chunk written");
    }

    source.finish()?;
    if stats.frames == 0 {
        return Err(VidcatError::invalid_input("video produced no frames"));
    }

    let epilogue = escape::stream_epilogue(stats.rows);
    compressor.write_chunk(epilogue.as_bytes())?;
    stats.bytes_in += epilogue.len() as u64;
    stats.bytes_out = compressor.end()?;

    tracing::info!(
        frames = stats.frames,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        "conversion finished"
    );
    Ok(stats)
}

fn transcode_chunk_parallel(
    pool: &rayon::ThreadPool,
    chunk: &[(u64, Frame)],
    width: i64,
) -> Vec<VidcatResult<EscapeBlock>> {
    pool.install(|| {
        chunk
            .par_iter()
            .map(|(seed, frame)| transcode_seeded(frame, width, *seed))
            .collect()
    })
}

fn build_thread_pool(threads: Option<usize>) -> VidcatResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| VidcatError::Other(anyhow::anyhow!("failed to build thread pool: {e}")))
}

/// `<video>.zst` next to the input.
pub fn default_output_path(video: &Path) -> PathBuf {
    video.with_extension("zst")
}

/// Shell command that decompresses `out_path` and streams it at the source frame rate.
pub fn playback_command(out_path: &Path, stats: &ConvertStats) -> String {
    format!(
        "zstd -dc {} | pv -q -L {}",
        shell_quote(&out_path.display().to_string()),
        stats.playback_bytes_per_second()
    )
}

fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ':'));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::InMemoryCompressor;
    use crate::foundation::core::Rgb8;
    use crate::progress::NoProgress;
    use crate::source::{InMemorySource, VideoInfo};
    use crate::transcode::{parse_block, split_blocks};

    fn frames(n: u8) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::solid(4, 4, Rgb8::new(i, i, i)))
            .collect()
    }

    fn run(cfg: &ConvertConfig, n: u8) -> (VidcatResult<ConvertStats>, InMemoryCompressor) {
        let mut src = InMemorySource::new(Fps::new(10, 1).unwrap(), frames(n));
        let mut out = InMemoryCompressor::new();
        let stats = convert(&mut src, &mut out, &mut NoProgress, cfg);
        (stats, out)
    }

    #[test]
    fn blocks_are_written_in_frame_order() {
        let cfg = ConvertConfig {
            width: 4,
            seed: Some(9),
            threading: TranscodeThreading {
                parallel: true,
                chunk_size: 2,
                threads: Some(2),
            },
        };
        let (stats, out) = run(&cfg, 5);
        let stats = stats.unwrap();
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.bytes_out, out.bytes().len() as u64);

        let text = std::str::from_utf8(out.bytes()).unwrap();
        let blocks = split_blocks(text);
        assert_eq!(blocks.len(), 5);
        for (i, block) in blocks.iter().enumerate() {
            let groups = parse_block(block).unwrap();
            assert_eq!(groups.len(), 16);
            let grey = Rgb8::new(i as u8, i as u8, i as u8);
            assert!(groups.iter().all(|g| g.color == grey));
        }
    }

    #[test]
    fn fixed_seed_is_reproducible_across_threading() {
        let mut cfg = ConvertConfig {
            width: 4,
            seed: Some(1234),
            ..ConvertConfig::default()
        };
        let (_, parallel) = run(&cfg, 6);
        cfg.threading.parallel = false;
        let (_, sequential) = run(&cfg, 6);
        assert_eq!(parallel.bytes(), sequential.bytes());
    }

    #[test]
    fn empty_source_aborts_output() {
        let cfg = ConvertConfig {
            width: 4,
            ..ConvertConfig::default()
        };
        let (stats, out) = run(&cfg, 0);
        assert!(matches!(stats, Err(VidcatError::InvalidInput(_))));
        assert!(out.is_aborted());
        assert!(out.bytes().is_empty());
    }

    #[test]
    fn bad_frame_aborts_output() {
        struct Broken(VideoInfo, u32);
        impl FrameSource for Broken {
            fn info(&self) -> &VideoInfo {
                &self.0
            }
            fn next_frame(&mut self) -> VidcatResult<Option<Frame>> {
                self.1 += 1;
                Ok(Some(if self.1 == 1 {
                    Frame::solid(2, 2, Rgb8::default())
                } else {
                    Frame {
                        width: 2,
                        height: 2,
                        data: vec![0; 5],
                    }
                }))
            }
            fn finish(&mut self) -> VidcatResult<()> {
                Ok(())
            }
        }

        let mut src = Broken(
            VideoInfo {
                width: 2,
                height: 2,
                fps: Fps::new(1, 1).unwrap(),
                frame_count: None,
            },
            0,
        );
        let mut out = InMemoryCompressor::new();
        let cfg = ConvertConfig {
            width: 2,
            ..ConvertConfig::default()
        };
        let err = convert(&mut src, &mut out, &mut NoProgress, &cfg).unwrap_err();
        assert!(matches!(err, VidcatError::InvalidFrame(_)));
        assert!(out.is_aborted());
    }

    #[test]
    fn config_validation() {
        let mut cfg = ConvertConfig::default();
        assert_eq!(cfg.validate().unwrap().get(), 80);
        cfg.width = -5;
        assert!(matches!(cfg.validate(), Err(VidcatError::InvalidWidth(_))));
        cfg.width = 80;
        cfg.threading.chunk_size = 0;
        assert!(cfg.validate().is_err());
        cfg.threading.chunk_size = 1;
        cfg.threading.threads = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn playback_rate_follows_average_frame_size() {
        let stats = ConvertStats {
            frames: 2,
            columns: 80,
            rows: 22,
            fps: Fps::new(30, 1).unwrap(),
            seed: 0,
            frame_sizes: vec![1000, 3000],
            bytes_in: 4100,
            bytes_out: 900,
        };
        assert_eq!(stats.avg_frame_size(), 2000.0);
        assert_eq!(
            playback_command(Path::new("out/clip.zst"), &stats),
            "zstd -dc out/clip.zst | pv -q -L 60000"
        );
        assert_eq!(
            playback_command(Path::new("my clip.zst"), &stats),
            "zstd -dc 'my clip.zst' | pv -q -L 60000"
        );
    }

    #[test]
    fn default_output_replaces_extension() {
        assert_eq!(
            default_output_path(Path::new("videos/cat.mp4")),
            PathBuf::from("videos/cat.zst")
        );
    }
}
