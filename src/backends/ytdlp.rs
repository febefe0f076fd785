// Fallback provider: full delegation to the yt-dlp binary.
//
// yt-dlp performs its own retrieval, retries and container/codec
// normalization; we only pick the format selector and read back the final
// path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::DownloadError;
use crate::models::{DownloadConfig, DownloadKind};
use crate::provider::FallbackProvider;
use crate::tools::{ToolManager, ToolType};
use crate::utils::run_output_with_timeout;

/// Whole-item downloads can take a while; generous budget
const DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

pub struct YtDlpBackend {
    binary_path: String,
    available: bool,
    proxy: Option<String>,
    socket_timeout: u64,
}

impl YtDlpBackend {
    pub fn new(config: &DownloadConfig) -> Self {
        let info = ToolManager::new().get_tool_info(ToolType::YtDlp);
        Self {
            binary_path: info
                .path
                .unwrap_or_else(|| ToolType::YtDlp.as_str().to_string()),
            available: info.is_available,
            proxy: config.proxy.clone(),
            socket_timeout: config.timeout_secs,
        }
    }

    fn build_args(&self, url: &str, kind: DownloadKind, out_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout.to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-o".to_string(),
            out_dir.join("%(title)s.%(ext)s").to_string_lossy().to_string(),
        ];

        match kind {
            DownloadKind::Video => {
                args.push("-f".to_string());
                args.push("bestvideo+bestaudio/best".to_string());
                args.push("--merge-output-format".to_string());
                args.push("mp4".to_string());
            }
            DownloadKind::Audio => {
                args.push("-f".to_string());
                args.push("bestaudio/best".to_string());
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push("mp3".to_string());
                args.push("--audio-quality".to_string());
                args.push("192K".to_string());
            }
        }

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl FallbackProvider for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn fetch(
        &self,
        url: &str,
        kind: DownloadKind,
        out_dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        let args = self.build_args(url, kind, out_dir);
        let output =
            run_output_with_timeout(&self.binary_path, &args, DOWNLOAD_TIMEOUT_SECS).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::ExecutionError(format!(
                "yt-dlp exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        // --print after_move:filepath writes the final path to stdout
        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| out_dir.to_path_buf());

        Ok(path)
    }
}
