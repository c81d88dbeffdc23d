//! Conversion progress reporting. Purely observational: nothing here affects the output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub trait ProgressSink {
    /// Called once before the first frame. `total` is the expected frame count when known.
    fn begin(&mut self, total: Option<u64>);
    /// Called after each transcoded frame with the size of its escape block.
    fn frame_done(&mut self, block_bytes: usize);
    fn end(&mut self);
}

/// Discards every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin(&mut self, _total: Option<u64>) {}
    fn frame_done(&mut self, _block_bytes: usize) {}
    fn end(&mut self) {}
}

/// Progress bar on stderr. Falls back to a spinner when the frame count is unknown.
pub struct IndicatifProgress {
    bar: ProgressBar,
    bytes: u64,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            bytes: 0,
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for IndicatifProgress {
    fn begin(&mut self, total: Option<u64>) {
        let bar = match total {
            Some(n) => {
                let bar = ProgressBar::with_draw_target(Some(n), ProgressDrawTarget::stderr());
                if let Ok(style) = ProgressStyle::with_template(
                    "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames {msg} ETA {eta}",
                ) {
                    bar.set_style(style.progress_chars("#>-"));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} frames {msg}") {
                    bar.set_style(style);
                }
                bar
            }
        };
        self.bar = bar;
        self.bytes = 0;
    }

    fn frame_done(&mut self, block_bytes: usize) {
        self.bytes += block_bytes as u64;
        self.bar.inc(1);
        let done = self.bar.position().max(1);
        self.bar
            .set_message(format!("(~{} bytes/frame)", self.bytes / done));
    }

    fn end(&mut self) {
        self.bar.finish_and_clear();
    }
}
