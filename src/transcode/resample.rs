use std::borrow::Cow;

use image::imageops::FilterType;

use crate::foundation::core::{Frame, OutputWidth, TerminalGeometry};
use crate::foundation::error::{VidcatError, VidcatResult};

/// Scale `frame` to `width` columns, keeping the aspect ratio and an even pixel height.
///
/// Frames that are already `width` columns wide are borrowed unchanged; the decoder normally
/// delivers frames at the target size, so this is the common path.
pub fn resample_to_width(frame: &Frame, width: OutputWidth) -> VidcatResult<Cow<'_, Frame>> {
    if frame.width == width.get() {
        return Ok(Cow::Borrowed(frame));
    }

    let geometry = TerminalGeometry::for_source(frame.width, frame.height, width)?;
    let (dst_w, dst_h) = (geometry.columns, geometry.pixel_height());

    let src = image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| {
            VidcatError::invalid_frame(format!(
                "frame buffer does not match {}x{} rgb24",
                frame.width, frame.height
            ))
        })?;
    let scaled = image::imageops::resize(&src, dst_w, dst_h, FilterType::Triangle);
    tracing::trace!(
        src_w = frame.width,
        src_h = frame.height,
        dst_w,
        dst_h,
        "resampled frame"
    );

    Ok(Cow::Owned(Frame {
        width: dst_w,
        height: dst_h,
        data: scaled.into_raw(),
    }))
}
