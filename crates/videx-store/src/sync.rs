//! Projects a folder store's rows into the global store (spec §4.10).

use chrono::Utc;
use tracing::debug;

use crate::error::StoreResult;
use crate::folder_store::FolderStore;
use crate::global_store::{GlobalClipRow, GlobalStore, GlobalVideoRow, SyncCursor};

#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    pub videos_projected: usize,
    pub clips_projected: usize,
}

pub struct SyncEngine<'a> {
    folder_store: &'a FolderStore,
    global_store: &'a GlobalStore,
    source_folder: String,
}

impl<'a> SyncEngine<'a> {
    pub fn new(folder_store: &'a FolderStore, global_store: &'a GlobalStore, source_folder: impl Into<String>) -> Self {
        Self {
            folder_store,
            global_store,
            source_folder: source_folder.into(),
        }
    }

    /// Incremental sync: projects only rows with `rowid > cursor`.
    pub fn sync_incremental(&self) -> StoreResult<SyncResult> {
        self.sync(false)
    }

    /// Forced sync: re-projects every row regardless of cursor position.
    /// Required after any in-place mutation of folder-store rows (orphan
    /// recovery, path rebase) since rowids don't change but mutable
    /// columns do.
    pub fn sync_forced(&self) -> StoreResult<SyncResult> {
        self.sync(true)
    }

    fn sync(&self, force: bool) -> StoreResult<SyncResult> {
        let mut cursor = self.global_store.get_cursor(&self.source_folder)?;
        let video_floor = if force { 0 } else { cursor.last_synced_video_rowid };
        let clip_floor = if force { 0 } else { cursor.last_synced_clip_rowid };

        let videos = self.folder_store.videos_since(video_floor)?;
        let mut max_video_rowid = cursor.last_synced_video_rowid;
        for video in &videos {
            self.global_store.upsert_video(&GlobalVideoRow {
                source_folder: self.source_folder.clone(),
                source_video_id: video.id.get(),
                path: video.path.clone(),
                filename: video.filename.clone(),
                duration_secs: video.duration_secs,
                index_status: video.index_status.as_str().to_string(),
                subtitle_path: video.subtitle_path.clone(),
            })?;
            max_video_rowid = max_video_rowid.max(video.id.get());
        }

        let clips = self.folder_store.clips_since(clip_floor)?;
        let mut max_clip_rowid = cursor.last_synced_clip_rowid;
        for clip in &clips {
            self.global_store.upsert_clip(&GlobalClipRow {
                source_folder: self.source_folder.clone(),
                source_clip_id: clip.id.get(),
                source_video_id: clip.video_id.get(),
                start_time: clip.start_time,
                end_time: clip.end_time,
                thumbnail_path: clip.thumbnail_path.clone(),
                transcript: clip.transcript.clone(),
                tags_json: serde_json::to_string(&clip.tags).unwrap_or_default(),
                description: clip.description.clone(),
                text_embedding: clip.text_embedding.clone(),
                text_embedding_model: clip.text_embedding_model.clone(),
                image_embedding: clip.image_embedding.clone(),
                image_embedding_model: clip.image_embedding_model.clone(),
            })?;
            max_clip_rowid = max_clip_rowid.max(clip.id.get());
        }

        cursor.last_synced_video_rowid = max_video_rowid;
        cursor.last_synced_clip_rowid = max_clip_rowid;
        cursor.last_synced_at = Some(Utc::now());
        self.global_store.upsert_cursor(&cursor)?;

        debug!(
            folder = %self.source_folder,
            videos = videos.len(),
            clips = clips.len(),
            force,
            "sync complete"
        );

        Ok(SyncResult {
            videos_projected: videos.len(),
            clips_projected: clips.len(),
        })
    }

    /// Removes a video's global mirror row (and, transitively via cascade
    /// triggers in the caller's own bookkeeping, its clips) without
    /// touching the folder store's rows — used by `OrphanRecovery::mark_orphaned`.
    pub fn remove_video_mirror(&self, video_id: i64) -> StoreResult<()> {
        self.global_store.delete_video_mirror(&self.source_folder, video_id)
    }

    /// Rebases paths in both stores and runs a forced sync (spec §4.10
    /// path rebase, mount point changed but volume UUID unchanged).
    pub fn rebase_and_resync(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<SyncResult> {
        self.folder_store.rebase_paths(old_prefix, new_prefix)?;
        self.global_store.rebase_paths(&self.source_folder, old_prefix, new_prefix)?;
        self.sync_forced()
    }

    pub fn cursor(&self) -> StoreResult<SyncCursor> {
        self.global_store.get_cursor(&self.source_folder)
    }
}
