use crate::foundation::error::{VidcatError, VidcatResult};

/// Straight 8-bit RGB color.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// One decoded video frame: row-major packed `rgb24` pixels.
///
/// Fields are public so that decoders can hand over raw buffers without a copy. Use
/// [`Frame::validate`] (the transcoder always does) before trusting the layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Build a frame from rows of colors. Every row must have the same, non-zero length.
    pub fn from_rows(rows: &[Vec<Rgb8>]) -> VidcatResult<Self> {
        let Some(first) = rows.first() else {
            return Err(VidcatError::invalid_frame("frame has no rows"));
        };
        let width = first.len();
        if width == 0 {
            return Err(VidcatError::invalid_frame("frame rows are empty"));
        }

        let mut data = Vec::with_capacity(width * rows.len() * Self::BYTES_PER_PIXEL);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(VidcatError::invalid_frame(format!(
                    "frame is not rectangular: row {idx} has {} pixels, expected {width}",
                    row.len()
                )));
            }
            for px in row {
                data.extend_from_slice(&[px.r, px.g, px.b]);
            }
        }

        Ok(Self {
            width: dim_u32(width)?,
            height: dim_u32(rows.len())?,
            data,
        })
    }

    /// Fill a `width x height` frame with a single color.
    pub fn solid(width: u32, height: u32, color: Rgb8) -> Self {
        let n = width as usize * height as usize;
        let mut data = Vec::with_capacity(n * Self::BYTES_PER_PIXEL);
        for _ in 0..n {
            data.extend_from_slice(&[color.r, color.g, color.b]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn validate(&self) -> VidcatResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VidcatError::invalid_frame(format!(
                "frame is empty ({}x{})",
                self.width, self.height
            )));
        }
        let expected = self.pixel_count() * Self::BYTES_PER_PIXEL;
        if self.data.len() != expected {
            return Err(VidcatError::invalid_frame(format!(
                "frame is not rectangular: {}x{} needs {expected} bytes, got {}",
                self.width,
                self.height,
                self.data.len()
            )));
        }
        Ok(())
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Color at `(row, col)`. Panics when out of bounds; callers validate first.
    pub fn pixel(&self, row: u32, col: u32) -> Rgb8 {
        let off = (row as usize * self.width as usize + col as usize) * Self::BYTES_PER_PIXEL;
        Rgb8::new(self.data[off], self.data[off + 1], self.data[off + 2])
    }
}

fn dim_u32(n: usize) -> VidcatResult<u32> {
    u32::try_from(n).map_err(|_| VidcatError::invalid_frame("frame dimension exceeds u32"))
}

/// Target column count for the terminal rendition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputWidth(u32);

impl OutputWidth {
    pub const DEFAULT: Self = Self(80);
    pub const MAX: u32 = 4096;

    pub fn new(columns: i64) -> VidcatResult<Self> {
        if columns <= 0 {
            return Err(VidcatError::invalid_width(format!(
                "width must be positive, got {columns}"
            )));
        }
        if columns > i64::from(Self::MAX) {
            return Err(VidcatError::invalid_width(format!(
                "width must be at most {}, got {columns}",
                Self::MAX
            )));
        }
        Ok(Self(columns as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for OutputWidth {
    type Error = VidcatError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Default for OutputWidth {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> VidcatResult<Self> {
        if num == 0 || den == 0 {
            return Err(VidcatError::invalid_input(format!(
                "fps must be non-zero, got {num}/{den}"
            )));
        }
        Ok(Self { num, den })
    }

    /// Parse an ffmpeg-style ratio such as `30/1` or `24000/1001`.
    pub fn parse_ratio(s: &str) -> Option<Self> {
        let (a, b) = s.trim().split_once('/')?;
        let num = a.parse::<u32>().ok()?;
        let den = b.parse::<u32>().ok()?;
        Self::new(num, den).ok()
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

/// Character-cell geometry of the rendered video.
///
/// One character cell stacks two source pixels, so the scaled pixel grid is always
/// `columns x (rows * 2)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TerminalGeometry {
    pub columns: u32,
    pub rows: u32,
}

impl TerminalGeometry {
    /// Derive the cell grid for a `src_width x src_height` source scaled to `width` columns,
    /// preserving the aspect ratio. Always at least one row.
    pub fn for_source(src_width: u32, src_height: u32, width: OutputWidth) -> VidcatResult<Self> {
        if src_width == 0 || src_height == 0 {
            return Err(VidcatError::invalid_input(format!(
                "source dimensions must be non-zero, got {src_width}x{src_height}"
            )));
        }
        let columns = width.get();
        let rows = (u64::from(columns) * u64::from(src_height)) / (u64::from(src_width) * 2);
        let rows = u32::try_from(rows.max(1))
            .map_err(|_| VidcatError::invalid_input("terminal row count overflows u32"))?;
        Ok(Self { columns, rows })
    }

    pub fn pixel_height(self) -> u32 {
        self.rows * 2
    }
}
