// Lossless merge of separate video/audio files via ffmpeg

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::errors::DownloadError;
use crate::tools::{ToolManager, ToolType};

/// Merge `video` and `audio` into `out` with a stream copy (no re-encode),
/// preserving original quality.
///
/// The caller owns deletion of the intermediate inputs.
pub fn merge_streams(video: &Path, audio: &Path, out: &Path) -> Result<(), DownloadError> {
    let ffmpeg = ToolManager::new().get_tool_info(ToolType::Ffmpeg);
    let Some(ffmpeg_path) = ffmpeg.path else {
        return Err(DownloadError::MergeUnavailable);
    };

    let output = Command::new(&ffmpeg_path)
        .args(build_merge_args(video, audio, out))
        .output()
        .map_err(|e| DownloadError::ExecutionError(format!("ffmpeg: {}", e)))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(DownloadError::MergeFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ))
    }
}

fn build_merge_args(video: &Path, audio: &Path, out: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-y"),
        OsString::from("-i"),
        video.into(),
        OsString::from("-i"),
        audio.into(),
        OsString::from("-c"),
        OsString::from("copy"),
        out.into(),
    ]
}
