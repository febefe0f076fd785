// URL classification - pure string/URL parsing, no network access

use url::Url;

/// Category of a YouTube URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlCategory {
    /// Playlist of items
    Playlist,
    /// Single track on the music subdomain
    MusicTrack,
    /// Single video (including short links)
    Video,
    /// Anything we cannot handle, including malformed input
    Unsupported,
}

impl std::fmt::Display for UrlCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playlist => write!(f, "playlist"),
            Self::MusicTrack => write!(f, "song (YouTube Music)"),
            Self::Video => write!(f, "video"),
            Self::Unsupported => write!(f, "unknown or unsupported"),
        }
    }
}

/// A URL with its classification, immutable once constructed
#[derive(Debug, Clone)]
pub struct MediaItemRef {
    pub url: String,
    pub category: UrlCategory,
}

impl MediaItemRef {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            category: classify_url(url),
        }
    }
}

/// Classify a YouTube URL. Rules are evaluated in order, first match wins:
/// a playlist marker beats an item marker, and the music subdomain decides
/// between song and video. Malformed input classifies as unsupported.
pub fn classify_url(raw: &str) -> UrlCategory {
    let parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return UrlCategory::Unsupported,
    };

    let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
    let path = parsed.path();
    let has_list = parsed.query_pairs().any(|(k, _)| k == "list");
    let has_item = parsed.query_pairs().any(|(k, _)| k == "v");

    if path.contains("playlist") || (has_list && !has_item) {
        return UrlCategory::Playlist;
    }

    if path.contains("watch") || has_item || host == "youtu.be" {
        if host == "music.youtube.com" {
            return UrlCategory::MusicTrack;
        }
        return UrlCategory::Video;
    }

    UrlCategory::Unsupported
}
