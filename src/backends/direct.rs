// Primary provider: catalog probe via yt-dlp JSON dump, raw stream bytes
// over plain HTTPS.
//
// The probe resolves direct format URLs, so stream retrieval is an ordinary
// GET against the CDN. The whole-item delegation path lives in the ytdlp
// backend instead.

use std::io::Write as _;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::errors::DownloadError;
use crate::models::{
    CollectionInfo, DownloadConfig, ItemMetadata, StreamDescriptor, StreamKind,
};
use crate::provider::StreamProvider;
use crate::tools::{ToolManager, ToolType};
use crate::utils::run_output_with_timeout;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Overall subprocess budget for one probe; socket timeout is separate
const PROBE_TIMEOUT_SECS: u64 = 120;

pub struct DirectFetchBackend {
    ytdlp_path: String,
    client: reqwest::Client,
    socket_timeout: u64,
    proxy: Option<String>,
}

impl DirectFetchBackend {
    pub fn new(config: &DownloadConfig) -> Result<Self, DownloadError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| DownloadError::Network(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DownloadError::Network(format!("http client: {}", e)))?;

        Ok(Self {
            ytdlp_path: ToolManager::new().binary_path(ToolType::YtDlp),
            client,
            socket_timeout: config.timeout_secs,
            proxy: config.proxy.clone(),
        })
    }

    fn probe_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout.to_string(),
            "--user-agent".to_string(),
            USER_AGENT.to_string(),
        ];
        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        args.push(url.to_string());
        args
    }

    fn collection_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "-J".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout.to_string(),
        ];
        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl StreamProvider for DirectFetchBackend {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn probe(&self, url: &str) -> Result<ItemMetadata, DownloadError> {
        let output =
            run_output_with_timeout(&self.ytdlp_path, &self.probe_args(url), PROBE_TIMEOUT_SECS)
                .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::MetadataUnavailable(
                stderr.trim().to_string(),
            ));
        }

        parse_metadata(&output.stdout)
    }

    async fn fetch_stream(
        &self,
        stream: &StreamDescriptor,
        dest: &Path,
    ) -> Result<(), DownloadError> {
        let mut response = self
            .client
            .get(&stream.url)
            .send()
            .await?
            .error_for_status()?;

        let total = response.content_length().or(stream.filesize);
        let mut file = tokio::fs::File::create(dest).await?;
        let mut downloaded: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total.filter(|t| *t > 0) {
                let percent = (downloaded as f64 / total as f64) * 100.0;
                print!("\rProgress: {:.2}%", percent);
                std::io::stdout().flush().ok();
            }
        }
        file.flush().await?;
        println!();

        Ok(())
    }

    async fn resolve_collection(&self, url: &str) -> Result<CollectionInfo, DownloadError> {
        let output = run_output_with_timeout(
            &self.ytdlp_path,
            &self.collection_args(url),
            PROBE_TIMEOUT_SECS,
        )
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::MetadataUnavailable(
                stderr.trim().to_string(),
            ));
        }

        parse_collection(&output.stdout)
    }
}

fn parse_metadata(stdout: &[u8]) -> Result<ItemMetadata, DownloadError> {
    let json: Value = serde_json::from_slice(stdout)
        .map_err(|e| DownloadError::ParseError(format!("invalid JSON: {}", e)))?;

    let streams = json["formats"]
        .as_array()
        .map(|formats| formats.iter().filter_map(parse_format).collect())
        .unwrap_or_default();

    Ok(ItemMetadata {
        id: json["id"].as_str().unwrap_or("unknown").to_string(),
        title: json["title"].as_str().map(|t| t.to_string()),
        uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
        duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
        streams,
    })
}

fn parse_format(format: &Value) -> Option<StreamDescriptor> {
    // Only formats with a direct retrieval URL are usable
    let url = format["url"].as_str()?;
    if !url.starts_with("http") {
        return None;
    }

    let has_video = format["vcodec"].as_str().map_or(false, |v| v != "none");
    let has_audio = format["acodec"].as_str().map_or(false, |a| a != "none");

    // Storyboards and other trackless entries
    let kind = match (has_video, has_audio) {
        (true, true) => StreamKind::Progressive,
        (true, false) => StreamKind::VideoOnly,
        (false, true) => StreamKind::AudioOnly,
        (false, false) => return None,
    };

    Some(StreamDescriptor {
        id: format["format_id"].as_str()?.to_string(),
        kind,
        container: format["ext"].as_str().unwrap_or("mp4").to_string(),
        height: format["height"].as_u64().map(|h| h as u32),
        abr: format["abr"].as_f64().map(|b| b as f32),
        filesize: format["filesize"]
            .as_u64()
            .or_else(|| format["filesize_approx"].as_u64()),
        url: url.to_string(),
    })
}

fn parse_collection(stdout: &[u8]) -> Result<CollectionInfo, DownloadError> {
    let json: Value = serde_json::from_slice(stdout)
        .map_err(|e| DownloadError::ParseError(format!("invalid JSON: {}", e)))?;

    let title = json["title"].as_str().unwrap_or("playlist").to_string();

    let entries = json["entries"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    entry["url"]
                        .as_str()
                        .map(|u| u.to_string())
                        .or_else(|| {
                            entry["id"]
                                .as_str()
                                .map(|id| format!("https://www.youtube.com/watch?v={}", id))
                        })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(CollectionInfo { title, entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_metadata_splits_stream_kinds() {
        let raw = br#"{
            "id": "abc",
            "title": "A Title",
            "uploader": "someone",
            "duration": 63.4,
            "formats": [
                {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none", "url": "https://x/sb"},
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5, "url": "https://x/a"},
                {"format_id": "137", "ext": "mp4", "vcodec": "avc1", "acodec": "none", "height": 1080, "filesize": 1000, "url": "https://x/v"},
                {"format_id": "22", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "height": 720, "url": "https://x/p"}
            ]
        }"#;

        let meta = parse_metadata(raw).unwrap();
        assert_eq!(meta.title.as_deref(), Some("A Title"));
        assert_eq!(meta.duration_seconds, 63);
        // Storyboard dropped
        assert_eq!(meta.streams.len(), 3);
        assert_eq!(meta.streams[0].kind, StreamKind::AudioOnly);
        assert_eq!(meta.streams[1].kind, StreamKind::VideoOnly);
        assert_eq!(meta.streams[2].kind, StreamKind::Progressive);
    }

    #[test]
    fn parse_metadata_missing_title_is_none() {
        let raw = br#"{"id": "abc", "formats": []}"#;
        let meta = parse_metadata(raw).unwrap();
        assert!(meta.title.is_none());
    }

    #[test]
    fn parse_metadata_rejects_bad_json() {
        assert!(matches!(
            parse_metadata(b"not json"),
            Err(DownloadError::ParseError(_))
        ));
    }

    #[test]
    fn parse_format_skips_urlless_entries() {
        let v: Value = serde_json::from_str(
            r#"{"format_id": "1", "vcodec": "avc1", "acodec": "none"}"#,
        )
        .unwrap();
        assert!(parse_format(&v).is_none());
    }

    #[test]
    fn parse_collection_builds_watch_urls_from_ids() {
        let raw = br#"{
            "title": "My List",
            "entries": [
                {"id": "aaa"},
                {"url": "https://www.youtube.com/watch?v=bbb"}
            ]
        }"#;

        let info = parse_collection(raw).unwrap();
        assert_eq!(info.title, "My List");
        assert_eq!(
            info.entries,
            vec![
                "https://www.youtube.com/watch?v=aaa".to_string(),
                "https://www.youtube.com/watch?v=bbb".to_string(),
            ]
        );
    }
}
