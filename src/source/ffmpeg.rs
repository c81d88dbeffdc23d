use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::{Fps, Frame, OutputWidth, TerminalGeometry};
use crate::foundation::error::{VidcatError, VidcatResult};
use crate::foundation::process::{StderrDrain, check_status, ensure_readable_file, require_on_path};
use crate::source::{FrameSource, VideoInfo};

/// Read stream metadata with `ffprobe`.
pub fn probe_video(source_path: &Path) -> VidcatResult<VideoInfo> {
    require_on_path("ffprobe")?;
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| VidcatError::external_tool("ffprobe", format!("failed to run: {e}")))?;
    check_status(
        "ffprobe",
        out.status,
        String::from_utf8_lossy(&out.stderr).trim(),
    )?;

    parse_probe_json(&out.stdout)
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_probe_json(bytes: &[u8]) -> VidcatResult<VideoInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        nb_frames: Option<String>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| VidcatError::external_tool("ffprobe", format!("json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| VidcatError::invalid_input("no video stream found"))?;

    let width = video
        .width
        .ok_or_else(|| VidcatError::external_tool("ffprobe", "missing video width"))?;
    let height = video
        .height
        .ok_or_else(|| VidcatError::external_tool("ffprobe", "missing video height"))?;
    let fps = Fps::parse_ratio(video.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| VidcatError::external_tool("ffprobe", "invalid r_frame_rate"))?;

    let frame_count = video
        .nb_frames
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .or_else(|| {
            let duration = video
                .duration
                .as_deref()
                .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))?
                .parse::<f64>()
                .ok()?;
            (duration.is_finite() && duration >= 0.0).then(|| (duration * fps.as_f64()) as u64)
        });

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Streams scaled `rgb24` frames out of a running `ffmpeg`.
///
/// The child is killed on drop when the source is abandoned before [`FrameSource::finish`].
pub struct FfmpegFrameSource {
    source_path: PathBuf,
    info: VideoInfo,
    geometry: TerminalGeometry,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr: StderrDrain,
    frame_len: usize,
    frames_read: u64,
}

impl FfmpegFrameSource {
    /// Probe `source_path` and start decoding it scaled to `width` columns.
    pub fn open(source_path: &Path, width: OutputWidth) -> VidcatResult<Self> {
        ensure_readable_file(source_path)?;

        let info = probe_video(source_path)?;
        let geometry = TerminalGeometry::for_source(info.width, info.height, width)?;
        let (w, h) = (geometry.columns, geometry.pixel_height());
        tracing::debug!(
            src_w = info.width,
            src_h = info.height,
            fps = info.fps.as_f64(),
            w,
            h,
            "starting ffmpeg decode"
        );

        require_on_path("ffmpeg")?;
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostats", "-nostdin", "-i"])
            .arg(source_path)
            .args([
                "-an",
                "-vf",
                &format!("scale={w}:{h}"),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VidcatError::external_tool("ffmpeg", format!("failed to spawn: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VidcatError::external_tool("ffmpeg", "failed to open stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| VidcatError::external_tool("ffmpeg", "failed to open stderr"))?;

        Ok(Self {
            source_path: source_path.to_path_buf(),
            info,
            geometry,
            child: Some(child),
            stdout: Some(BufReader::new(stdout)),
            stderr: StderrDrain::spawn(stderr),
            frame_len: w as usize * h as usize * Frame::BYTES_PER_PIXEL,
            frames_read: 0,
        })
    }

    /// Cell grid the frames are scaled to.
    pub fn geometry(&self) -> TerminalGeometry {
        self.geometry
    }
}

impl FrameSource for FfmpegFrameSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> VidcatResult<Option<Frame>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut data = vec![0u8; self.frame_len];
        let filled = read_full(stdout, &mut data).map_err(|e| {
            VidcatError::external_tool("ffmpeg", format!("failed to read decoded frame: {e}"))
        })?;

        if filled == 0 {
            self.stdout = None;
            return Ok(None);
        }
        if filled < self.frame_len {
            self.stdout = None;
            return Err(VidcatError::invalid_frame(format!(
                "truncated frame {} from '{}': got {filled} of {} bytes",
                self.frames_read,
                self.source_path.display(),
                self.frame_len
            )));
        }

        self.frames_read += 1;
        Ok(Some(Frame {
            width: self.geometry.columns,
            height: self.geometry.pixel_height(),
            data,
        }))
    }

    fn finish(&mut self) -> VidcatResult<()> {
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| VidcatError::external_tool("ffmpeg", format!("failed to wait: {e}")))?;
        let stderr = self.stderr.collect("ffmpeg")?;
        check_status("ffmpeg", status, &stderr)?;
        tracing::debug!(frames = self.frames_read, "ffmpeg decode finished");
        Ok(())
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Fill `buf` from `r`, returning fewer bytes only at end of stream.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_json_prefers_nb_frames() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "r_frame_rate": "30/1", "nb_frames": "300"}
            ],
            "format": {"duration": "99.0"}
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(info.fps, Fps::new(30, 1).unwrap());
        assert_eq!(info.frame_count, Some(300));
    }

    #[test]
    fn probe_json_estimates_count_from_duration() {
        let json = br#"{
            "streams": [{"codec_type": "video", "width": 64, "height": 48,
                         "r_frame_rate": "25/1"}],
            "format": {"duration": "4.0"}
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.frame_count, Some(100));
    }

    #[test]
    fn probe_json_without_video_is_invalid_input() {
        let json = br#"{"streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_probe_json(json),
            Err(VidcatError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_probe_json(b"not json"),
            Err(VidcatError::ExternalToolFailure { .. })
        ));
    }

    #[test]
    fn read_full_reports_short_tail() {
        let mut r: &[u8] = &[1, 2, 3, 4, 5];
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut r, &mut buf).unwrap(), 4);
        assert_eq!(read_full(&mut r, &mut buf).unwrap(), 1);
        assert_eq!(read_full(&mut r, &mut buf).unwrap(), 0);
    }

    #[test]
    fn missing_file_is_invalid_input() {
        let err = FfmpegFrameSource::open(
            Path::new("definitely/missing/video.mp4"),
            OutputWidth::DEFAULT,
        )
        .err()
        .unwrap();
        assert!(matches!(err, VidcatError::InvalidInput(_)));
    }
}
