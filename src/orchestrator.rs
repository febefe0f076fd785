// Download orchestration: bounded primary retries, fallback provider,
// stream selection, merge and cleanup for one item.
//
// Per-item state machine:
//   Init -> PrimaryAttempt (1..=3, fixed delay)
//        -> Success | PrimaryExhausted -> FallbackAttempt -> Success | Failed
//
// Every error is caught at the item boundary and converted into a failed
// DownloadResult, so one bad item never aborts a playlist.

use std::path::PathBuf;

use tracing::warn;

use crate::errors::DownloadError;
use crate::merge::merge_streams;
use crate::models::{DownloadConfig, DownloadPlan, DownloadResult, ItemMetadata};
use crate::provider::{FallbackProvider, StreamProvider};
use crate::selector::select_plan;
use crate::utils::{ensure_dir, sanitize_filename, MAX_FILENAME_LEN};

const PRIMARY_ATTEMPTS: u32 = 3;

pub struct Orchestrator<'a> {
    primary: &'a dyn StreamProvider,
    fallback: Option<&'a dyn FallbackProvider>,
    config: &'a DownloadConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        primary: &'a dyn StreamProvider,
        fallback: Option<&'a dyn FallbackProvider>,
        config: &'a DownloadConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            config,
        }
    }

    /// Download one item. Never propagates an error: the outcome, good or
    /// bad, is recorded in the returned result.
    pub async fn download_item(&self, url: &str) -> DownloadResult {
        match self.run_item(url).await {
            Ok(path) => {
                println!("Download completed: {}", path.display());
                DownloadResult::completed(url, path)
            }
            Err(e) => {
                warn!(url, error = %e, "item download failed");
                println!("Error downloading {}: {}", url, e);
                DownloadResult::failed(url, &e)
            }
        }
    }

    async fn run_item(&self, url: &str) -> Result<PathBuf, DownloadError> {
        ensure_dir(&self.config.out_dir)?;

        let (plan, meta) = match self.probe_primary(url).await {
            Ok(meta) if meta.title.is_some() => {
                (select_plan(&meta.streams, self.config.kind)?, Some(meta))
            }
            Ok(_) => {
                warn!(url, "provider metadata is missing the title; primary exhausted");
                (DownloadPlan::Fallback, None)
            }
            Err(e) => {
                warn!(url, error = %e, "primary exhausted");
                (DownloadPlan::Fallback, None)
            }
        };

        let title = meta
            .as_ref()
            .and_then(|m| m.title.as_deref())
            .unwrap_or("download");

        self.execute_plan(url, plan, title).await
    }

    /// Primary metadata probe with a bounded attempt counter and a fixed
    /// inter-attempt delay.
    async fn probe_primary(&self, url: &str) -> Result<ItemMetadata, DownloadError> {
        let mut attempt = 1u32;
        loop {
            match self.primary.probe(url).await {
                Ok(meta) => return Ok(meta),
                Err(e) if attempt < PRIMARY_ATTEMPTS => {
                    warn!(
                        attempt,
                        error = %e,
                        "metadata probe failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(DownloadError::MetadataUnavailable(format!(
                        "{} probe attempts failed, last error: {}",
                        PRIMARY_ATTEMPTS, e
                    )));
                }
            }
        }
    }

    async fn execute_plan(
        &self,
        url: &str,
        plan: DownloadPlan,
        title: &str,
    ) -> Result<PathBuf, DownloadError> {
        let safe_title = sanitize_filename(title, MAX_FILENAME_LEN);
        let out_dir = &self.config.out_dir;

        match plan {
            DownloadPlan::Single(stream) => {
                let dest = out_dir.join(format!("{}.{}", safe_title, stream.container));
                println!("Downloading {}: {}", self.config.kind, title);
                self.primary.fetch_stream(&stream, &dest).await?;
                Ok(dest)
            }
            DownloadPlan::Split { video, audio } => {
                let video_path = out_dir.join(format!("{}_video.{}", safe_title, video.container));
                let audio_path = out_dir.join(format!("{}_audio.{}", safe_title, audio.container));
                let out_path = out_dir.join(format!("{}.mp4", safe_title));

                println!(
                    "Downloading video stream: {}p",
                    video.height.unwrap_or(0)
                );
                self.primary.fetch_stream(&video, &video_path).await?;
                println!("Downloading best audio stream");
                self.primary.fetch_stream(&audio, &audio_path).await?;

                println!("Merging audio and video with ffmpeg");
                merge_streams(&video_path, &audio_path, &out_path)?;

                // Intermediates are disposable; deletion failure is not
                for tmp in [&video_path, &audio_path] {
                    if let Err(e) = std::fs::remove_file(tmp) {
                        warn!(path = %tmp.display(), error = %e, "could not remove intermediate file");
                    }
                }

                Ok(out_path)
            }
            DownloadPlan::Fallback => self.run_fallback(url).await,
        }
    }

    async fn run_fallback(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let fallback = self
            .fallback
            .filter(|f| f.is_available())
            .ok_or(DownloadError::ProviderUnavailable)?;

        println!("Falling back to {} to download the item...", fallback.name());
        fallback
            .fetch(url, self.config.kind, &self.config.out_dir)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::models::{CollectionInfo, DownloadKind, StreamDescriptor, StreamKind};

    fn audio_stream(id: &str, abr: f32) -> StreamDescriptor {
        StreamDescriptor {
            id: id.to_string(),
            kind: StreamKind::AudioOnly,
            container: "m4a".to_string(),
            height: None,
            abr: Some(abr),
            filesize: Some(1000),
            url: format!("https://cdn.example/{}", id),
        }
    }

    struct FakePrimary {
        fail_first_probes: usize,
        title: Option<String>,
        streams: Vec<StreamDescriptor>,
        probe_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
    }

    impl FakePrimary {
        fn new(fail_first_probes: usize, title: Option<&str>, streams: Vec<StreamDescriptor>) -> Self {
            Self {
                fail_first_probes,
                title: title.map(|t| t.to_string()),
                streams,
                probe_calls: AtomicUsize::new(0),
                fetch_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StreamProvider for FakePrimary {
        fn name(&self) -> &'static str {
            "fake-primary"
        }

        async fn probe(&self, _url: &str) -> Result<ItemMetadata, DownloadError> {
            let call = self.probe_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first_probes {
                return Err(DownloadError::Network("probe refused".to_string()));
            }
            Ok(ItemMetadata {
                id: "item".to_string(),
                title: self.title.clone(),
                uploader: "someone".to_string(),
                duration_seconds: 10,
                streams: self.streams.clone(),
            })
        }

        async fn fetch_stream(
            &self,
            _stream: &StreamDescriptor,
            dest: &Path,
        ) -> Result<(), DownloadError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            std::fs::write(dest, b"media bytes")?;
            Ok(())
        }

        async fn resolve_collection(&self, _url: &str) -> Result<CollectionInfo, DownloadError> {
            Ok(CollectionInfo {
                title: "unused".to_string(),
                entries: Vec::new(),
            })
        }
    }

    struct FakeFallback {
        available: bool,
        calls: AtomicUsize,
    }

    impl FakeFallback {
        fn new(available: bool) -> Self {
            Self {
                available,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FallbackProvider for FakeFallback {
        fn name(&self) -> &'static str {
            "fake-fallback"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn fetch(
            &self,
            _url: &str,
            _kind: DownloadKind,
            out_dir: &Path,
        ) -> Result<PathBuf, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = out_dir.join("fallback.mp3");
            std::fs::write(&path, b"fallback bytes")?;
            Ok(path)
        }
    }

    fn test_config(out_dir: &Path, kind: DownloadKind) -> DownloadConfig {
        DownloadConfig {
            kind,
            out_dir: out_dir.to_path_buf(),
            proxy: None,
            timeout_secs: 5,
            retry_delay: Duration::from_millis(0),
        }
    }

    #[tokio::test]
    async fn primary_success_downloads_to_sanitized_filename() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = FakePrimary::new(0, Some("My: Song"), vec![audio_stream("140", 128.0)]);
        let config = test_config(tmp.path(), DownloadKind::Audio);
        let orch = Orchestrator::new(&primary, None, &config);

        let result = orch.download_item("https://youtu.be/x").await;

        assert!(result.succeeded(), "unexpected error: {:?}", result.error);
        let path = result.path.unwrap();
        assert_eq!(path, tmp.path().join("My_ Song.m4a"));
        assert!(path.is_file());
        assert_eq!(primary.probe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn three_probe_failures_invoke_fallback_exactly_once() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = FakePrimary::new(usize::MAX, None, vec![]);
        let fallback = FakeFallback::new(true);
        let config = test_config(tmp.path(), DownloadKind::Audio);
        let orch = Orchestrator::new(&primary, Some(&fallback), &config);

        let result = orch.download_item("https://youtu.be/x").await;

        assert!(result.succeeded(), "unexpected error: {:?}", result.error);
        assert_eq!(primary.probe_calls.load(Ordering::SeqCst), 3);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn probe_retry_recovers_without_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = FakePrimary::new(1, Some("Track"), vec![audio_stream("140", 128.0)]);
        let fallback = FakeFallback::new(true);
        let config = test_config(tmp.path(), DownloadKind::Audio);
        let orch = Orchestrator::new(&primary, Some(&fallback), &config);

        let result = orch.download_item("https://youtu.be/x").await;

        assert!(result.succeeded());
        assert_eq!(primary.probe_calls.load(Ordering::SeqCst), 2);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhaustion_without_fallback_is_provider_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = FakePrimary::new(usize::MAX, None, vec![]);
        let config = test_config(tmp.path(), DownloadKind::Audio);
        let orch = Orchestrator::new(&primary, None, &config);

        let result = orch.download_item("https://youtu.be/x").await;

        assert!(!result.succeeded());
        assert_eq!(
            result.error.as_deref(),
            Some(DownloadError::ProviderUnavailable.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn unavailable_fallback_counts_as_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = FakePrimary::new(usize::MAX, None, vec![]);
        let fallback = FakeFallback::new(false);
        let config = test_config(tmp.path(), DownloadKind::Audio);
        let orch = Orchestrator::new(&primary, Some(&fallback), &config);

        let result = orch.download_item("https://youtu.be/x").await;

        assert!(!result.succeeded());
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_title_goes_to_fallback_without_retrying() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = FakePrimary::new(0, None, vec![audio_stream("140", 128.0)]);
        let fallback = FakeFallback::new(true);
        let config = test_config(tmp.path(), DownloadKind::Audio);
        let orch = Orchestrator::new(&primary, Some(&fallback), &config);

        let result = orch.download_item("https://youtu.be/x").await;

        assert!(result.succeeded());
        assert_eq!(primary.probe_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_catalog_fails_the_item_without_fallback() {
        // Selection failures are item failures, not fallback triggers
        let tmp = tempfile::tempdir().unwrap();
        let primary = FakePrimary::new(0, Some("Track"), vec![]);
        let fallback = FakeFallback::new(true);
        let config = test_config(tmp.path(), DownloadKind::Audio);
        let orch = Orchestrator::new(&primary, Some(&fallback), &config);

        let result = orch.download_item("https://youtu.be/x").await;

        assert!(!result.succeeded());
        assert!(result.error.as_deref().unwrap().contains("audio"));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }
}
