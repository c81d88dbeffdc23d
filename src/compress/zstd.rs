use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::compress::Compressor;
use crate::foundation::error::{VidcatError, VidcatResult};
use crate::foundation::process::{StderrDrain, check_status, ensure_parent_dir, require_on_path};

/// Options for [`ZstdCompressor`].
#[derive(Clone, Debug)]
pub struct ZstdOpts {
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Compression level, `1..=19`. `None` keeps the zstd default.
    pub level: Option<u8>,
}

impl ZstdOpts {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            level: None,
        }
    }

    pub fn validate(&self) -> VidcatResult<()> {
        if let Some(level) = self.level
            && !(1..=19).contains(&level)
        {
            return Err(VidcatError::invalid_input(format!(
                "zstd level must be within 1..=19, got {level}"
            )));
        }
        if self.out_path.as_os_str().is_empty() {
            return Err(VidcatError::invalid_input("output path must not be empty"));
        }
        Ok(())
    }
}

/// Path zstd writes to while the run is in progress.
pub fn part_path(out_path: &Path) -> PathBuf {
    let mut name = out_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Spawns the system `zstd`, streams the escape stream to its stdin and moves the finished
/// artifact into place only after zstd exits successfully.
pub struct ZstdCompressor {
    opts: ZstdOpts,
    part_path: PathBuf,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<StderrDrain>,
    written: u64,
}

impl ZstdCompressor {
    pub fn new(opts: ZstdOpts) -> Self {
        let part_path = part_path(&opts.out_path);
        Self {
            opts,
            part_path,
            child: None,
            stdin: None,
            stderr: None,
            written: 0,
        }
    }

    /// Uncompressed bytes pushed so far.
    pub fn bytes_in(&self) -> u64 {
        self.written
    }
}

impl Compressor for ZstdCompressor {
    fn begin(&mut self) -> VidcatResult<()> {
        self.opts.validate()?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(VidcatError::invalid_input(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        ensure_parent_dir(&self.opts.out_path)?;
        require_on_path("zstd")?;

        let mut cmd = Command::new("zstd");
        cmd.args(["-q", "-f"]);
        if let Some(level) = self.opts.level {
            cmd.arg(format!("-{level}"));
        }
        cmd.arg("-o")
            .arg(&self.part_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| VidcatError::external_tool("zstd", format!("failed to spawn: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VidcatError::external_tool("zstd", "failed to open stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| VidcatError::external_tool("zstd", "failed to open stderr"))?;

        tracing::debug!(part = %self.part_path.display(), level = ?self.opts.level, "zstd started");
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr = Some(StderrDrain::spawn(stderr));
        self.written = 0;
        Ok(())
    }

    fn write_chunk(&mut self, bytes: &[u8]) -> VidcatResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VidcatError::external_tool("zstd", "compressor is not running"));
        };
        stdin
            .write_all(bytes)
            .map_err(|e| VidcatError::external_tool("zstd", format!("failed to write: {e}")))?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn end(&mut self) -> VidcatResult<u64> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| VidcatError::external_tool("zstd", "compressor is not running"))?;

        let status = child
            .wait()
            .map_err(|e| VidcatError::external_tool("zstd", format!("failed to wait: {e}")))?;
        let stderr = match self.stderr.as_mut() {
            Some(drain) => drain.collect("zstd")?,
            None => String::new(),
        };
        if let Err(e) = check_status("zstd", status, &stderr) {
            let _ = std::fs::remove_file(&self.part_path);
            return Err(e);
        }

        std::fs::rename(&self.part_path, &self.opts.out_path).map_err(|e| {
            let _ = std::fs::remove_file(&self.part_path);
            VidcatError::Other(anyhow::anyhow!(
                "failed to move '{}' to '{}': {e}",
                self.part_path.display(),
                self.opts.out_path.display()
            ))
        })?;

        let size = std::fs::metadata(&self.opts.out_path)
            .map(|m| m.len())
            .map_err(|e| {
                VidcatError::Other(anyhow::anyhow!(
                    "failed to stat '{}': {e}",
                    self.opts.out_path.display()
                ))
            })?;
        tracing::debug!(bytes_in = self.written, bytes_out = size, "zstd finished");
        Ok(size)
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(mut drain) = self.stderr.take() {
            let _ = drain.collect("zstd");
        }
        if self.part_path.exists() {
            tracing::debug!(part = %self.part_path.display(), "removing partial output");
            let _ = std::fs::remove_file(&self.part_path);
        }
    }
}

impl Drop for ZstdCompressor {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opts_validation_catches_bad_values() {
        let mut opts = ZstdOpts::new("out.zst");
        opts.validate().unwrap();

        opts.level = Some(0);
        assert!(opts.validate().is_err());
        opts.level = Some(20);
        assert!(opts.validate().is_err());
        opts.level = Some(19);
        opts.validate().unwrap();

        assert!(ZstdOpts::new("").validate().is_err());
    }

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("clips/video.zst")),
            PathBuf::from("clips/video.zst.part")
        );
    }

    #[test]
    fn refuses_existing_output_without_overwrite() {
        let dir = std::env::temp_dir().join(format!("vidcat_zstd_exists_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let out = dir.join("video.zst");
        std::fs::write(&out, b"keep me").unwrap();

        let mut opts = ZstdOpts::new(&out);
        opts.overwrite = false;
        let mut c = ZstdCompressor::new(opts);
        assert!(matches!(c.begin(), Err(VidcatError::InvalidInput(_))));
        assert_eq!(std::fs::read(&out).unwrap(), b"keep me");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn write_before_begin_fails() {
        let mut c = ZstdCompressor::new(ZstdOpts::new("never.zst"));
        assert!(matches!(
            c.write_chunk(b"x"),
            Err(VidcatError::ExternalToolFailure { .. })
        ));
        assert_eq!(c.bytes_in(), 0);
    }
}
