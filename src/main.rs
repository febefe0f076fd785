// CLI entry point

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tubegrab::backends::{DirectFetchBackend, YtDlpBackend};
use tubegrab::playlist::download_collection;
use tubegrab::utils;
use tubegrab::{
    DownloadConfig, DownloadKind, FallbackProvider, MediaItemRef, Orchestrator, UrlCategory,
};

#[derive(Parser)]
#[command(name = "tubegrab", version, about = "YouTube downloader (video/audio/playlist)")]
struct Cli {
    /// YouTube video or playlist URL
    url: String,

    /// Download type
    #[arg(short = 't', long = "type", value_enum, default_value_t = DownloadKind::Audio)]
    kind: DownloadKind,

    /// Output directory (defaults to ~/temp_downloads)
    #[arg(short, long)]
    out: Option<String>,

    /// Show actions without downloading
    #[arg(long)]
    dry_run: bool,

    /// SOCKS5/HTTP proxy URL (e.g., socks5://127.0.0.1:1080)
    #[arg(long)]
    proxy: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let item = MediaItemRef::new(&cli.url);
    println!("Provided URL is classified as: {}", item.category);

    if cli.dry_run {
        println!("Dry run mode - no downloads will be performed");
        match item.category {
            UrlCategory::Playlist => println!("Would download playlist: {}", item.url),
            UrlCategory::Unsupported => println!("Nothing to do for: {}", item.url),
            _ => println!("Would download video: {}", item.url),
        }
        return Ok(());
    }

    if item.category == UrlCategory::Unsupported {
        println!("Unsupported URL, nothing to do: {}", item.url);
        return Ok(());
    }

    let out_dir: PathBuf = match cli.out.as_deref() {
        Some(dir) => utils::expand_tilde(dir),
        None => utils::default_download_dir(),
    };

    let config = DownloadConfig {
        kind: cli.kind,
        out_dir,
        proxy: cli.proxy,
        ..DownloadConfig::default()
    };
    utils::ensure_dir(&config.out_dir)?;

    let primary = DirectFetchBackend::new(&config)?;
    let fallback = YtDlpBackend::new(&config);
    let fallback_ref: Option<&dyn FallbackProvider> = if fallback.is_available() {
        Some(&fallback)
    } else {
        None
    };

    match item.category {
        UrlCategory::Playlist => {
            println!("Playlist URL detected.");
            match download_collection(&item.url, &primary, fallback_ref, &config).await {
                Ok(_results) => {}
                Err(e) => println!("Error downloading playlist {}: {}", item.url, e),
            }
        }
        _ => {
            println!("Single video URL detected.");
            let orchestrator = Orchestrator::new(&primary, fallback_ref, &config);
            let _result = orchestrator.download_item(&item.url).await;
        }
    }

    Ok(())
}
