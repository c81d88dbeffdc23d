pub type VidcatResult<T> = Result<T, VidcatError>;

#[derive(thiserror::Error, Debug)]
pub enum VidcatError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid width: {0}")]
    InvalidWidth(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("external tool '{tool}' failed: {message}")]
    ExternalToolFailure { tool: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VidcatError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_width(msg: impl Into<String>) -> Self {
        Self::InvalidWidth(msg.into())
    }

    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }

    pub fn external_tool(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExternalToolFailure {
            tool: tool.into(),
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            VidcatError::invalid_input("x")
                .to_string()
                .contains("invalid input:")
        );
        assert!(
            VidcatError::invalid_width("x")
                .to_string()
                .contains("invalid width:")
        );
        assert!(
            VidcatError::invalid_frame("x")
                .to_string()
                .contains("invalid frame:")
        );
    }

    #[test]
    fn external_tool_names_the_tool() {
        let msg = VidcatError::external_tool("zstd", "exited with status 1").to_string();
        assert!(msg.contains("'zstd'"));
        assert!(msg.contains("exited with status 1"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = VidcatError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
