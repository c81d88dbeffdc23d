//! Compressors: where the escape stream goes.
//!
//! The stream is pushed in order: prelude, one chunk per escape block, epilogue.

/// `zstd`-based compressor (system `zstd` binary).
pub mod zstd;

use crate::foundation::error::{VidcatError, VidcatResult};

/// Compressor contract.
///
/// `begin` is called once, then `write_chunk` any number of times, then exactly one of `end`
/// (success) or `abort` (failure). After `abort` no output artifact may remain.
pub trait Compressor {
    fn begin(&mut self) -> VidcatResult<()>;
    fn write_chunk(&mut self, bytes: &[u8]) -> VidcatResult<()>;
    /// Finalize the artifact and return its size in bytes.
    fn end(&mut self) -> VidcatResult<u64>;
    fn abort(&mut self);
}

/// Uncompressed in-memory "compressor" for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryCompressor {
    started: bool,
    finished: bool,
    aborted: bool,
    bytes: Vec<u8>,
}

impl InMemoryCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far; empty after `abort`.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl Compressor for InMemoryCompressor {
    fn begin(&mut self) -> VidcatResult<()> {
        *self = Self {
            started: true,
            ..Self::default()
        };
        Ok(())
    }

    fn write_chunk(&mut self, bytes: &[u8]) -> VidcatResult<()> {
        if !self.started || self.finished {
            return Err(VidcatError::invalid_input(
                "in-memory compressor is not accepting data",
            ));
        }
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn end(&mut self) -> VidcatResult<u64> {
        if !self.started {
            return Err(VidcatError::invalid_input(
                "in-memory compressor was never started",
            ));
        }
        self.finished = true;
        Ok(self.bytes.len() as u64)
    }

    fn abort(&mut self) {
        self.bytes.clear();
        self.aborted = true;
        self.started = false;
    }
}
