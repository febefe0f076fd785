// Helper functions shared by the pipeline

use std::path::{Path, PathBuf};
use std::process::Stdio;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};

use crate::errors::DownloadError;

pub const MAX_FILENAME_LEN: usize = 200;

lazy_static! {
    // Path separators, Windows-illegal characters and control chars
    static ref ILLEGAL_CHARS: Regex = Regex::new(r#"[\\/:*?"<>|\x00-\x1f]+"#).unwrap();
}

/// Return a filesystem-safe filename trimmed to `max_len`.
///
/// Illegal characters collapse to a single underscore; overlong names are
/// truncated at the last word boundary inside the limit.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let cleaned = ILLEGAL_CHARS.replace_all(name, "_");
    let trimmed = cleaned.trim();

    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    let cut: String = trimmed.chars().take(max_len).collect();
    match cut.rfind(' ') {
        Some(pos) if pos > 0 => cut[..pos].trim_end().to_string(),
        _ => cut,
    }
}

/// Default base output directory: `~/temp_downloads`
pub fn default_download_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join("temp_downloads"))
        .unwrap_or_else(|| PathBuf::from("temp_downloads"))
}

/// Expand a leading `~` against the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Create `dir` if absent. No-op when it already exists.
pub fn ensure_dir(dir: &Path) -> Result<(), DownloadError> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Run a command, capture stdout/stderr, kill the child on timeout
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DownloadError::ToolNotFound(format!("{}: {}", program, e)))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::ExecutionError(format!("no stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::ExecutionError(format!("no stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let waited = timeout(TokioDuration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res
                .map_err(|e| DownloadError::ExecutionError(format!("wait for {}: {}", program, e)))?;
            let stdout = stdout_task
                .await
                .map_err(|e| DownloadError::ExecutionError(format!("stdout task: {}", e)))?
                .map_err(|e| DownloadError::ExecutionError(format!("read stdout: {}", e)))?;
            let stderr = stderr_task
                .await
                .map_err(|e| DownloadError::ExecutionError(format!("stderr task: {}", e)))?
                .map_err(|e| DownloadError::ExecutionError(format!("read stderr: {}", e)))?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::ExecutionError(format!(
                "{} timed out after {}s",
                program, timeout_secs
            )))
        }
    }
}
