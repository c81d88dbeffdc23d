//! Escape-sequence encoding of pixel groups and frame boundaries.
//!
//! Pixel rows `2k` and `2k + 1` share terminal row `k + 1`. Each pixel is written as its own
//! group that paints the whole cell: the pixel's own color is always the foreground, its vertical
//! partner the background, and the glyph says which half the foreground occupies (`▀` for the top
//! pixel, `▄` for the bottom one). Painting either pixel of a pair therefore yields the same final
//! cell, and every group can be mapped back to exactly one `(row, col, color)`.

use std::fmt;

use crate::foundation::core::Rgb8;
use crate::foundation::error::{VidcatError, VidcatResult};

/// Terminates every escape block. SGR reset never appears inside a pixel group.
pub const FRAME_BOUNDARY: &str = "\x1b[0m";

/// Written once before the first block: hide cursor, clear screen, home.
pub const STREAM_PRELUDE: &str = "\x1b[?25l\x1b[2J\x1b[H";

const UPPER_HALF: char = '▀';
const LOWER_HALF: char = '▄';
const DEFAULT_BACKGROUND: &str = "\x1b[49m";

/// Upper bound on the encoded size of one pixel group, used for buffer reservations.
pub const MAX_GROUP_BYTES: usize = 56;

/// Epilogue written after the last block: park the cursor below the frame and show it again.
/// Attributes are already reset by the last block's boundary.
pub fn stream_epilogue(rows: u32) -> String {
    format!("\x1b[{};1H\x1b[?25h", rows.saturating_add(1))
}

/// Append the group for pixel `(row, col)` of color `own`. `partner` is the color of the other
/// pixel in the same cell, `None` for a bottom-less final row.
pub fn push_pixel_group(
    out: &mut impl fmt::Write,
    row: u32,
    col: u32,
    own: Rgb8,
    partner: Option<Rgb8>,
) -> fmt::Result {
    write!(
        out,
        "\x1b[{};{}H\x1b[38;2;{};{};{}m",
        row / 2 + 1,
        col + 1,
        own.r,
        own.g,
        own.b
    )?;
    match partner {
        Some(p) => write!(out, "\x1b[48;2;{};{};{}m", p.r, p.g, p.b)?,
        None => out.write_str(DEFAULT_BACKGROUND)?,
    }
    out.write_char(if row % 2 == 0 { UPPER_HALF } else { LOWER_HALF })
}

/// One decoded pixel group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelGroup {
    /// 0-based pixel row.
    pub row: u32,
    /// 0-based pixel column.
    pub col: u32,
    pub color: Rgb8,
}

/// Split a decompressed stream into the bodies of its escape blocks, in order.
///
/// The prelude is skipped when present; anything after the last boundary (the epilogue) is
/// ignored. Returned slices do not include the boundary marker.
pub fn split_blocks(stream: &str) -> Vec<&str> {
    let body = stream.strip_prefix(STREAM_PRELUDE).unwrap_or(stream);
    let mut parts: Vec<&str> = body.split(FRAME_BOUNDARY).collect();
    // The tail after the final marker is never a block.
    parts.pop();
    parts
}

/// Decode the pixel groups of one block body (with or without its trailing boundary).
pub fn parse_block(block: &str) -> VidcatResult<Vec<PixelGroup>> {
    let body = block.strip_suffix(FRAME_BOUNDARY).unwrap_or(block);
    let mut cur = Cursor { rest: body };
    let mut out = Vec::new();
    while !cur.rest.is_empty() {
        out.push(cur.group()?);
    }
    Ok(out)
}

struct Cursor<'a> {
    rest: &'a str,
}

impl Cursor<'_> {
    fn group(&mut self) -> VidcatResult<PixelGroup> {
        self.expect("\x1b[")?;
        let term_row = self.number(';')?;
        let term_col = self.number('H')?;
        self.expect("\x1b[38;2;")?;
        let color = self.color()?;
        if self.rest.starts_with(DEFAULT_BACKGROUND) {
            self.rest = &self.rest[DEFAULT_BACKGROUND.len()..];
        } else {
            self.expect("\x1b[48;2;")?;
            self.color()?;
        }

        let mut chars = self.rest.chars();
        let half = match chars.next() {
            Some(UPPER_HALF) => 0,
            Some(LOWER_HALF) => 1,
            other => {
                return Err(malformed(format!("expected half-block glyph, got {other:?}")));
            }
        };
        self.rest = chars.as_str();

        if term_row == 0 || term_col == 0 {
            return Err(malformed("cursor positions are 1-based"));
        }
        Ok(PixelGroup {
            row: (term_row - 1) * 2 + half,
            col: term_col - 1,
            color,
        })
    }

    fn color(&mut self) -> VidcatResult<Rgb8> {
        let r = self.channel(';')?;
        let g = self.channel(';')?;
        let b = self.channel('m')?;
        Ok(Rgb8::new(r, g, b))
    }

    fn channel(&mut self, terminator: char) -> VidcatResult<u8> {
        let v = self.number(terminator)?;
        u8::try_from(v).map_err(|_| malformed(format!("color channel {v} out of range")))
    }

    fn number(&mut self, terminator: char) -> VidcatResult<u32> {
        let end = self
            .rest
            .find(terminator)
            .ok_or_else(|| malformed(format!("missing '{terminator}'")))?;
        let v = self.rest[..end]
            .parse::<u32>()
            .map_err(|e| malformed(format!("bad number '{}': {e}", &self.rest[..end])))?;
        self.rest = &self.rest[end + terminator.len_utf8()..];
        Ok(v)
    }

    fn expect(&mut self, prefix: &str) -> VidcatResult<()> {
        match self.rest.strip_prefix(prefix) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(malformed(format!("expected {prefix:?}"))),
        }
    }
}

fn malformed(msg: impl Into<String>) -> VidcatError {
    VidcatError::invalid_frame(format!("malformed escape block: {}", msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_pixel_group_layout() -> fmt::Result {
        let mut s = String::new();
        push_pixel_group(
            &mut s,
            4,
            7,
            Rgb8::new(1, 2, 3),
            Some(Rgb8::new(200, 100, 0)),
        )?;
        assert_eq!(s, "\x1b[3;8H\x1b[38;2;1;2;3m\x1b[48;2;200;100;0m▀");
        assert!(s.len() <= MAX_GROUP_BYTES);
        Ok(())
    }

    #[test]
    fn bottom_and_unpaired_groups_parse_back() -> fmt::Result {
        let mut s = String::new();
        push_pixel_group(&mut s, 1, 0, Rgb8::new(9, 9, 9), Some(Rgb8::new(0, 0, 0)))?;
        push_pixel_group(&mut s, 2, 3, Rgb8::new(255, 255, 255), None)?;
        s.push_str(FRAME_BOUNDARY);

        let groups = parse_block(&s).unwrap();
        assert_eq!(
            groups,
            vec![
                PixelGroup {
                    row: 1,
                    col: 0,
                    color: Rgb8::new(9, 9, 9)
                },
                PixelGroup {
                    row: 2,
                    col: 3,
                    color: Rgb8::new(255, 255, 255)
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse_block("hello"),
            Err(VidcatError::InvalidFrame(_))
        ));
        assert!(parse_block("\x1b[1;1H\x1b[38;2;300;0;0m\x1b[49m▀").is_err());
    }

    #[test]
    fn split_blocks_skips_prelude_and_epilogue() {
        let stream = format!(
            "{STREAM_PRELUDE}a{FRAME_BOUNDARY}b{FRAME_BOUNDARY}{}",
            stream_epilogue(3)
        );
        assert_eq!(split_blocks(&stream), vec!["a", "b"]);
    }

    #[test]
    fn epilogue_parks_below_frame() {
        assert_eq!(stream_epilogue(22), "\x1b[23;1H\x1b[?25h");
    }
}
