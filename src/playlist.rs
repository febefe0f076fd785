// Playlist iteration: resolve members, nest output, download sequentially

use tracing::info;

use crate::errors::DownloadError;
use crate::models::{DownloadConfig, DownloadResult};
use crate::orchestrator::Orchestrator;
use crate::provider::{FallbackProvider, StreamProvider};
use crate::utils::{ensure_dir, sanitize_filename, MAX_FILENAME_LEN};

/// Download every member of a playlist into `<base>/<playlist-title>/`.
///
/// Members download one at a time; a failure is recorded and iteration
/// continues with the next member.
pub async fn download_collection(
    url: &str,
    primary: &dyn StreamProvider,
    fallback: Option<&dyn FallbackProvider>,
    config: &DownloadConfig,
) -> Result<Vec<DownloadResult>, DownloadError> {
    let collection = primary.resolve_collection(url).await?;
    println!("Downloading playlist: {}", collection.title);
    info!(title = %collection.title, members = collection.entries.len(), "resolved playlist");

    let mut nested = config.clone();
    nested.out_dir = config
        .out_dir
        .join(sanitize_filename(&collection.title, MAX_FILENAME_LEN));
    ensure_dir(&nested.out_dir)?;

    let orchestrator = Orchestrator::new(primary, fallback, &nested);
    let mut results = Vec::with_capacity(collection.entries.len());
    for member_url in &collection.entries {
        println!("Downloading video: {}", member_url);
        results.push(orchestrator.download_item(member_url).await);
    }

    let failed = results.iter().filter(|r| !r.succeeded()).count();
    println!(
        "Playlist finished: {} downloaded, {} failed",
        results.len() - failed,
        failed
    );

    Ok(results)
}
