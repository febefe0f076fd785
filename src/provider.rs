// Provider trait definitions

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::DownloadError;
use crate::models::{CollectionInfo, DownloadKind, ItemMetadata, StreamDescriptor};

/// Primary stream provider: supplies stream catalogs and raw byte retrieval.
///
/// Treated as unreliable; all calls are wrapped by the orchestrator's retry
/// policy.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Name of the provider (for logging)
    fn name(&self) -> &'static str;

    /// Resolve item metadata and the stream catalog for a URL
    async fn probe(&self, url: &str) -> Result<ItemMetadata, DownloadError>;

    /// Fetch one stream's bytes to `dest`
    async fn fetch_stream(
        &self,
        stream: &StreamDescriptor,
        dest: &Path,
    ) -> Result<(), DownloadError>;

    /// Resolve a playlist's display name and member item URLs
    async fn resolve_collection(&self, url: &str) -> Result<CollectionInfo, DownloadError>;
}

/// Secondary retrieval mechanism used after primary exhaustion.
///
/// Performs its own internal retrieval and container/codec normalization;
/// treated as opaque.
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    /// Name of the provider (for logging)
    fn name(&self) -> &'static str;

    /// Whether the provider can be invoked at all
    fn is_available(&self) -> bool;

    /// Resolve and download `url` into `out_dir`, returning the final path
    async fn fetch(
        &self,
        url: &str,
        kind: DownloadKind,
        out_dir: &Path,
    ) -> Result<PathBuf, DownloadError>;
}
