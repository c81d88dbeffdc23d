//! vidcat turns a video into a compressed stream of terminal escape sequences.
//!
//! - Decode frames with a [`FrameSource`] (system `ffmpeg` by default)
//! - [`transcode`] every frame into a self-contained [`EscapeBlock`]
//! - Push the stream through a [`Compressor`] (system `zstd` by default)
//!
//! [`convert`] wires these together; [`playback_command`] prints how to stream the result back
//! into a terminal.
#![forbid(unsafe_code)]

pub mod compress;
mod foundation;
pub mod pipeline;
pub mod progress;
pub mod source;
pub mod transcode;

pub use crate::foundation::core::{Fps, Frame, OutputWidth, Rgb8, TerminalGeometry};
pub use crate::foundation::error::{VidcatError, VidcatResult};
pub use crate::foundation::process::{ensure_readable_file, is_on_path, require_on_path, same_file};

pub use crate::compress::zstd::{ZstdCompressor, ZstdOpts};
pub use crate::compress::{Compressor, InMemoryCompressor};
pub use crate::pipeline::{
    ConvertConfig, ConvertStats, TranscodeThreading, convert, default_output_path, playback_command,
};
pub use crate::progress::{IndicatifProgress, NoProgress, ProgressSink};
pub use crate::source::ffmpeg::{FfmpegFrameSource, probe_video};
pub use crate::source::{FrameSource, InMemorySource, VideoInfo};
pub use crate::transcode::{
    EscapeBlock, FRAME_BOUNDARY, PixelCoord, PixelGroup, parse_block, split_blocks, transcode,
    transcode_seeded, visit_order,
};
