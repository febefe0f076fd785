// Common data models for the download pipeline

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::DownloadError;
use crate::utils;

/// What the user asked for: the audio track or the full video
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DownloadKind {
    Audio,
    Video,
}

impl std::fmt::Display for DownloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Kind of media a single stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// Video track without audio (adaptive/DASH delivery)
    VideoOnly,
    /// Audio track without video
    AudioOnly,
    /// Single file with both tracks already combined
    Progressive,
}

/// One retrievable stream as reported by the provider catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Provider format id (e.g., "137", "140")
    pub id: String,
    pub kind: StreamKind,
    /// Container extension (mp4, webm, m4a)
    pub container: String,
    /// Video height in pixels
    pub height: Option<u32>,
    /// Audio bitrate in kbps
    pub abr: Option<f32>,
    /// File size in bytes, when the provider reports one
    pub filesize: Option<u64>,
    /// Direct retrieval URL
    pub url: String,
}

impl StreamDescriptor {
    pub fn resolution(&self) -> u32 {
        self.height.unwrap_or(0)
    }

    /// Bitrate scaled to an integer key for stable comparisons
    pub fn bitrate_key(&self) -> u32 {
        self.abr.map(|b| (b * 100.0) as u32).unwrap_or(0)
    }
}

/// Item metadata from the primary provider probe
#[derive(Debug, Clone)]
pub struct ItemMetadata {
    pub id: String,
    /// Absent title marks the metadata as unusable
    pub title: Option<String>,
    pub uploader: String,
    pub duration_seconds: u64,
    pub streams: Vec<StreamDescriptor>,
}

/// Resolved playlist: display name plus member item URLs
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub title: String,
    pub entries: Vec<String>,
}

/// Resolved decision for one item
#[derive(Debug, Clone)]
pub enum DownloadPlan {
    /// One stream straight to its final path (progressive video or audio-only)
    Single(StreamDescriptor),
    /// Separate video and audio streams, merged after both are fetched.
    /// Stream ids are always distinct.
    Split {
        video: StreamDescriptor,
        audio: StreamDescriptor,
    },
    /// Delegate the whole item to the fallback provider
    Fallback,
}

/// Outcome record for one item
#[derive(Debug)]
pub struct DownloadResult {
    pub url: String,
    pub path: Option<PathBuf>,
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn completed(url: &str, path: PathBuf) -> Self {
        Self {
            url: url.to_string(),
            path: Some(path),
            error: None,
        }
    }

    pub fn failed(url: &str, error: &DownloadError) -> Self {
        Self {
            url: url.to_string(),
            path: None,
            error: Some(error.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Explicit configuration threaded through orchestrator calls
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub kind: DownloadKind,
    pub out_dir: PathBuf,
    /// SOCKS5/HTTP proxy URL, passed to both reqwest and yt-dlp
    pub proxy: Option<String>,
    /// Socket timeout in seconds for provider calls
    pub timeout_secs: u64,
    /// Delay between primary probe attempts
    pub retry_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            kind: DownloadKind::Audio,
            out_dir: utils::default_download_dir(),
            proxy: None,
            timeout_secs: 30,
            retry_delay: Duration::from_secs(2),
        }
    }
}
