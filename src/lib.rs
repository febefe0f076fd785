// tubegrab - YouTube video/audio/playlist downloader

pub mod backends;
pub mod classify;
pub mod errors;
pub mod merge;
pub mod models;
pub mod orchestrator;
pub mod playlist;
pub mod provider;
pub mod selector;
pub mod tools;
pub mod utils;

pub use classify::{classify_url, MediaItemRef, UrlCategory};
pub use errors::DownloadError;
pub use models::{
    DownloadConfig, DownloadKind, DownloadPlan, DownloadResult, ItemMetadata, StreamDescriptor,
};
pub use orchestrator::Orchestrator;
pub use provider::{FallbackProvider, StreamProvider};
