//! Mark-as-orphan / hash-based recovery / retention cleanup (spec §4.8).
//!
//! Cross-folder scope is an explicit Open Question in the spec; this
//! implements the stated current behavior: recovery only ever searches the
//! same folder store (see DESIGN.md).

use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use videx_models::{IndexStatus, Video, VideoId};

use crate::error::{StoreError, StoreResult};
use crate::folder_store::FolderStore;

#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub recovered_video_id: VideoId,
    pub clip_count: usize,
}

pub fn mark_orphaned(folder_store: &FolderStore, video_id: VideoId) -> StoreResult<()> {
    let mut video = folder_store
        .get_video_by_id(video_id)?
        .ok_or_else(|| StoreError::NotFound(format!("video {video_id}")))?;
    video.index_status = IndexStatus::Orphaned;
    video.orphaned_at = Some(Utc::now());
    folder_store.update_video(&video)
}

/// Finds the most recently orphaned row with matching hash in the same
/// folder store. If found and distinct from `pending_video_id`, deletes
/// the pending row (releasing the path-unique constraint) and restores the
/// orphaned row in place at the new path.
pub fn attempt_recovery(
    folder_store: &FolderStore,
    file_hash: &str,
    new_path: &str,
    new_filename: &str,
    new_size: u64,
    new_modified_at: DateTime<Utc>,
    pending_video_id: VideoId,
) -> StoreResult<Option<RecoveryOutcome>> {
    let orphan = match folder_store.find_most_recent_orphan_by_hash(file_hash)? {
        Some(v) if v.id != pending_video_id => v,
        _ => return Ok(None),
    };

    let mut restored = orphan;
    restored.path = new_path.to_string();
    restored.filename = new_filename.to_string();
    restored.size_bytes = new_size;
    restored.modified_at = new_modified_at;
    restored.index_status = IndexStatus::Completed;
    restored.orphaned_at = None;
    folder_store.recover_orphan(pending_video_id, &restored)?;

    let clip_count = folder_store.list_clips_for_video(restored.id)?.len();

    Ok(Some(RecoveryOutcome {
        recovered_video_id: restored.id,
        clip_count,
    }))
}

/// Hard-deletes orphaned rows older than `retention_days` (cascade deletes
/// their clips via the FK), then best-effort removes the thumbnail
/// directory and fallback subtitle file outside the DB transaction.
pub async fn cleanup_expired(
    folder_store: &FolderStore,
    folder_path: &str,
    retention_days: i64,
    app_support_srt_dir: &str,
) -> StoreResult<usize> {
    let cutoff = Utc::now() - Duration::days(retention_days);
    let expired: Vec<Video> = folder_store.list_orphaned_older_than(cutoff)?;

    for video in &expired {
        folder_store.delete_video(video.id)?;
    }

    for video in &expired {
        let thumb_dir = format!("{folder_path}/.clip-index/thumbnails/video_{}", video.id.get());
        if let Err(e) = tokio::fs::remove_dir_all(&thumb_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove thumbnail dir {thumb_dir}: {e}");
            }
        }
        if let Some(srt_path) = &video.subtitle_path {
            if srt_path.starts_with(app_support_srt_dir) {
                if let Err(e) = tokio::fs::remove_file(srt_path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("failed to remove fallback subtitle {srt_path}: {e}");
                    }
                }
            }
        }
    }

    Ok(expired.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use videx_models::{ClipDraft, Folder};

    fn open_temp() -> (tempfile::TempDir, FolderStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.sqlite");
        let folder = Folder::new("/vol/media");
        let store = FolderStore::open(path.to_str().unwrap(), &folder).unwrap();
        (dir, store)
    }

    #[test]
    fn recovery_restores_orphan_at_new_path_and_deletes_pending_row() {
        let (_dir, store) = open_temp();

        let mut original = Video::new_pending(videx_models::FolderId::new(1), "/vol/A.mp4", "A.mp4", 10, Utc::now());
        original.file_hash = Some("abc123".into());
        let original_id = store.insert_video(&original).unwrap();
        store.insert_clip_draft(original_id, &ClipDraft::new(0.0, 5.0)).unwrap();
        mark_orphaned(&store, original_id).unwrap();

        let pending = Video::new_pending(videx_models::FolderId::new(1), "/vol/B.mp4", "B.mp4", 10, Utc::now());
        let pending_id = store.insert_video(&pending).unwrap();

        let outcome = attempt_recovery(
            &store,
            "abc123",
            "/vol/B.mp4",
            "B.mp4",
            10,
            Utc::now(),
            pending_id,
        )
        .unwrap()
        .expect("expected a recovery match");

        assert_eq!(outcome.recovered_video_id, original_id);
        assert_eq!(outcome.clip_count, 1);
        assert!(store.get_video_by_id(pending_id).unwrap().is_none());
        let restored = store.get_video_by_path("/vol/B.mp4").unwrap().unwrap();
        assert_eq!(restored.index_status, IndexStatus::Completed);
        assert!(restored.orphaned_at.is_none());
    }

    #[test]
    fn recovery_returns_none_when_no_matching_orphan() {
        let (_dir, store) = open_temp();
        let pending = Video::new_pending(videx_models::FolderId::new(1), "/vol/B.mp4", "B.mp4", 10, Utc::now());
        let pending_id = store.insert_video(&pending).unwrap();
        let outcome = attempt_recovery(&store, "nomatch", "/vol/B.mp4", "B.mp4", 10, Utc::now(), pending_id).unwrap();
        assert!(outcome.is_none());
    }
}
