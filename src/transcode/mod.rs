//! Frame transcoder: one decoded frame in, one self-contained escape block out.
//!
//! Pixels are painted in a random order rather than raster order. When the stream is printed
//! progressively, raster painting shows a top-to-bottom sweep; random painting spreads the update
//! evenly over the whole frame.

pub mod escape;
pub mod resample;
pub mod visit;

use crate::foundation::core::{Frame, OutputWidth};
use crate::foundation::error::{VidcatError, VidcatResult};

pub use escape::{FRAME_BOUNDARY, PixelGroup, parse_block, split_blocks};
pub use visit::{PixelCoord, visit_order};

/// The escape codes for one frame, terminated by [`FRAME_BOUNDARY`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscapeBlock {
    text: String,
    width: u32,
    height: u32,
}

impl EscapeBlock {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Encoded size in bytes, boundary included.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Pixel columns of the transcoded grid.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel rows of the transcoded grid.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Terminal rows covered by this block.
    pub fn rows(&self) -> u32 {
        self.height.div_ceil(2)
    }

    /// Number of pixel groups, one per pixel of the transcoded grid.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Transcode `frame` at `width` columns, drawing the pixel visit order from `rng`.
///
/// Fails with `InvalidWidth` when `width <= 0` and with `InvalidFrame` when the frame is empty or
/// its buffer does not describe a full rectangle.
#[tracing::instrument(
    level = "trace",
    skip(frame, rng),
    fields(src_w = frame.width, src_h = frame.height)
)]
pub fn transcode(frame: &Frame, width: i64, rng: &mut fastrand::Rng) -> VidcatResult<EscapeBlock> {
    let width = OutputWidth::new(width)?;
    frame.validate()?;

    let grid = resample::resample_to_width(frame, width)?;
    let (w, h) = (grid.width, grid.height);

    let mut text =
        String::with_capacity(grid.pixel_count() * escape::MAX_GROUP_BYTES + FRAME_BOUNDARY.len());
    for PixelCoord { row, col } in visit_order(w, h, rng) {
        let own = grid.pixel(row, col);
        let partner_row = row ^ 1;
        let partner = (partner_row < h).then(|| grid.pixel(partner_row, col));
        escape::push_pixel_group(&mut text, row, col, own, partner)
            .map_err(|e| VidcatError::Other(anyhow::anyhow!("failed to encode pixel: {e}")))?;
    }
    text.push_str(FRAME_BOUNDARY);

    Ok(EscapeBlock {
        text,
        width: w,
        height: h,
    })
}

/// [`transcode`] with a generator seeded from `seed`.
pub fn transcode_seeded(frame: &Frame, width: i64, seed: u64) -> VidcatResult<EscapeBlock> {
    transcode(frame, width, &mut fastrand::Rng::with_seed(seed))
}
