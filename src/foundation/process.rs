use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::process::{ChildStderr, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use crate::foundation::error::{VidcatError, VidcatResult};

/// Return `true` when `tool` can be invoked from `PATH`.
///
/// The ffmpeg family only understands `-version`; everything else is probed with `--version`.
pub fn is_on_path(tool: &str) -> bool {
    let flag = if tool.starts_with("ff") {
        "-version"
    } else {
        "--version"
    };
    Command::new(tool)
        .arg(flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn require_on_path(tool: &str) -> VidcatResult<()> {
    if is_on_path(tool) {
        Ok(())
    } else {
        Err(VidcatError::external_tool(
            tool,
            "not found on PATH (is it installed?)",
        ))
    }
}

/// Read a child's stderr to completion on a helper thread so a chatty child never blocks on a
/// full pipe while we are busy with its stdin/stdout.
pub struct StderrDrain(Option<JoinHandle<std::io::Result<Vec<u8>>>>);

impl StderrDrain {
    pub fn spawn(mut stderr: ChildStderr) -> Self {
        Self(Some(std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        })))
    }

    /// Collected stderr text, trimmed.
    pub fn collect(&mut self, tool: &str) -> VidcatResult<String> {
        let Some(handle) = self.0.take() else {
            return Ok(String::new());
        };
        let bytes = handle
            .join()
            .map_err(|_| VidcatError::external_tool(tool, "stderr drain thread panicked"))?
            .map_err(|e| VidcatError::external_tool(tool, format!("stderr read failed: {e}")))?;
        Ok(String::from_utf8_lossy(&bytes).trim().to_string())
    }
}

/// Map a non-zero exit into an `ExternalToolFailure` carrying the tool's stderr.
pub fn check_status(tool: &str, status: ExitStatus, stderr: &str) -> VidcatResult<()> {
    if status.success() {
        return Ok(());
    }
    let message = if stderr.is_empty() {
        format!("exited with {status}")
    } else {
        format!("exited with {status}: {stderr}")
    };
    Err(VidcatError::external_tool(tool, message))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> VidcatResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Fail with `InvalidInput` unless `path` is an existing file this process can open.
pub fn ensure_readable_file(path: &Path) -> VidcatResult<()> {
    if !path.is_file() {
        return Err(VidcatError::invalid_input(format!(
            "video file not found: {}",
            path.display()
        )));
    }
    std::fs::File::open(path).map_err(|e| {
        VidcatError::invalid_input(format!("video file is not readable: {}: {e}", path.display()))
    })?;
    Ok(())
}

/// `true` when `a` and `b` name the same file, however they are spelled.
///
/// Either path may not exist yet; it is then resolved through its parent directory.
pub fn same_file(a: &Path, b: &Path) -> bool {
    resolve_path(a) == resolve_path(b)
}

fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }
    let lexical = normalize_lexically(path);
    if let Ok(p) = lexical.canonicalize() {
        return p;
    }
    match (lexical.parent(), lexical.file_name()) {
        (Some(dir), Some(name)) => match dir.canonicalize() {
            Ok(dir) => dir.join(name),
            Err(_) => lexical,
        },
        _ => lexical,
    }
}

/// Absolute form of `path` with `.` and `..` folded away without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
