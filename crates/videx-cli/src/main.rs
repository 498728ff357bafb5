//! Thin driver binary for the indexing engine: scans a folder for media
//! files and runs them through the scheduler, printing one outcome line
//! per video. Not the product surface (no GUI/search shell) — just enough
//! to exercise `videx-indexer` end to end.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use videx_indexer::{Engines, IndexerConfig, Outcome, Scheduler};
use videx_models::Folder;
use videx_store::{FolderStore, GlobalStore};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "m4v", "webm"];

fn walk_videos(folder_path: &str) -> anyhow::Result<Vec<String>> {
    let mut found = Vec::new();
    let mut stack = vec![Path::new(folder_path).to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                if path.file_name().and_then(|n| n.to_str()) == Some(".clip-index") {
                    continue;
                }
                stack.push(path);
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
            {
                if let Some(s) = path.to_str() {
                    found.push(s.to_string());
                }
            }
        }
    }

    found.sort();
    Ok(found)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("videx=info".parse().unwrap()))
        .init();

    let folder_path = match std::env::args().nth(1) {
        Some(p) => p,
        None => {
            error!("usage: videx-cli <folder-path>");
            std::process::exit(1);
        }
    };

    info!(folder = %folder_path, "starting videx-cli");

    let config = IndexerConfig::from_env(&folder_path);
    std::fs::create_dir_all(&config.folder_index_dir)?;
    std::fs::create_dir_all(&config.thumbnails_dir())?;
    std::fs::create_dir_all(&config.tmp_dir())?;
    std::fs::create_dir_all(&config.app_support_dir)?;

    let folder = Folder::new(folder_path.clone());
    let folder_db_path = format!("{}/index.sqlite", config.folder_index_dir);
    let folder_store = FolderStore::open(&folder_db_path, &folder)?;

    let global_db_path = format!("{}/global.sqlite", config.app_support_dir);
    let global_store = GlobalStore::open(&global_db_path)?;

    let work_list = walk_videos(&folder_path)?;
    info!(count = work_list.len(), "found video files");

    // Concrete STT/vision/embedding engine implementations are pluggable
    // capability seams out of scope for this binary; it exercises the
    // engine with none wired in, matching spec's scoping of model
    // implementations as Non-goals.
    let engines = Engines {
        stt_high_accuracy: None,
        stt_fast: None,
        local_vision: None,
        cloud_vision: None,
        image_embedding: None,
        text_embedding: None,
        rate_limiter: None,
    };

    let scheduler = Arc::new(Scheduler::new(2));

    let shutdown_scheduler = scheduler.clone();
    let shutdown_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        shutdown_scheduler.shutdown();
    });

    scheduler
        .run(work_list, &folder_path, &folder_store, Some(&global_store), &config, &engines, |path, outcome| match outcome {
            Outcome::Completed { requires_force_sync } => {
                info!(video = %path, requires_force_sync, "indexed")
            }
            Outcome::Skipped { reason } => info!(video = %path, reason = %reason, "skipped"),
            Outcome::Failed { error } => error!(video = %path, error = %error, "failed"),
            Outcome::Cancelled => info!(video = %path, "cancelled"),
        })
        .await?;

    shutdown_handle.abort();
    info!("videx-cli run complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_videos_finds_allowlisted_extensions_recursively_and_skips_index_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"x").unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("c.MOV"), b"x").unwrap();
        let index_dir = dir.path().join(".clip-index");
        std::fs::create_dir(&index_dir).unwrap();
        std::fs::write(index_dir.join("d.mp4"), b"x").unwrap();

        let found = walk_videos(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|p| p.ends_with("a.mp4")));
        assert!(found.iter().any(|p| p.ends_with("c.MOV")));
    }
}
