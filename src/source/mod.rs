//! Frame sources: where decoded frames come from.

/// `ffprobe`/`ffmpeg`-backed source.
pub mod ffmpeg;

use std::collections::VecDeque;

use crate::foundation::core::{Fps, Frame};
use crate::foundation::error::VidcatResult;

/// Metadata of the input video.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Container-reported frame count, or an estimate from duration when that is missing.
    pub frame_count: Option<u64>,
}

/// Source contract: frames are yielded in presentation order.
pub trait FrameSource {
    fn info(&self) -> &VideoInfo;
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> VidcatResult<Option<Frame>>;
    /// Called once after `next_frame` returned `None`; reports decoder failures.
    fn finish(&mut self) -> VidcatResult<()>;
}

/// In-memory source for tests and embedding.
#[derive(Debug)]
pub struct InMemorySource {
    info: VideoInfo,
    frames: VecDeque<Frame>,
}

impl InMemorySource {
    pub fn new(fps: Fps, frames: Vec<Frame>) -> Self {
        let (width, height) = frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0));
        Self {
            info: VideoInfo {
                width,
                height,
                fps,
                frame_count: Some(frames.len() as u64),
            },
            frames: frames.into(),
        }
    }
}

impl FrameSource for InMemorySource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> VidcatResult<Option<Frame>> {
        Ok(self.frames.pop_front())
    }

    fn finish(&mut self) -> VidcatResult<()> {
        Ok(())
    }
}
