// Error types for the download pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Primary provider could not resolve item metadata after retries
    #[error("metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// Catalog has no usable stream for the desired kind
    #[error("no suitable {0} stream found")]
    NoStreamFound(&'static str),

    /// Primary exhausted and no fallback provider configured/available
    #[error("primary provider exhausted and no fallback provider available")]
    ProviderUnavailable,

    /// ffmpeg not discoverable on the system
    #[error("ffmpeg not found; required to merge video/audio")]
    MergeUnavailable,

    /// ffmpeg exited non-zero; carries its diagnostic output
    #[error("ffmpeg merge failed: {0}")]
    MergeFailed(String),

    /// Directory or file operation failed
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    /// HTTP-level failure while fetching stream bytes
    #[error("network error: {0}")]
    Network(String),

    /// External binary not found in system
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse provider JSON output
    #[error("parse error: {0}")]
    ParseError(String),

    /// Subprocess execution failed
    #[error("execution error: {0}")]
    ExecutionError(String),
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
