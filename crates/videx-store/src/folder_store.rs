use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use videx_models::{Clip, ClipId, ClipDraft, Folder, IndexLayer, IndexStatus, Video, VideoId};

use crate::error::StoreResult;
use crate::schema;

pub struct FolderStore {
    conn: Connection,
}

impl FolderStore {
    pub fn open(db_path: &str, folder: &Folder) -> StoreResult<Self> {
        let mut conn = Connection::open(db_path)?;
        schema::open_with_migrations(&mut conn, schema::folder_store_migrations())?;

        let exists: bool = conn
            .query_row("SELECT EXISTS(SELECT 1 FROM folder_meta WHERE id = 1)", [], |r| r.get(0))?;
        if !exists {
            conn.execute(
                "INSERT INTO folder_meta (id, path, volume_uuid, volume_name, last_seen_at, available)
                 VALUES (1, ?1, ?2, ?3, ?4, 1)",
                params![
                    folder.path,
                    folder.volume_uuid,
                    folder.volume_name,
                    folder.last_seen_at.to_rfc3339()
                ],
            )?;
        }
        Ok(Self { conn })
    }

    pub fn get_video_by_path(&self, path: &str) -> StoreResult<Option<Video>> {
        self.conn
            .query_row("SELECT * FROM videos WHERE path = ?1", params![path], row_to_video)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_video_by_id(&self, id: VideoId) -> StoreResult<Option<Video>> {
        self.conn
            .query_row("SELECT * FROM videos WHERE id = ?1", params![id.get()], row_to_video)
            .optional()
            .map_err(Into::into)
    }

    pub fn insert_video(&self, video: &Video) -> StoreResult<VideoId> {
        self.conn.execute(
            "INSERT INTO videos (path, filename, size_bytes, file_hash, modified_at, duration_secs,
                index_layer, index_status, last_processed_clip, subtitle_path, orphaned_at, last_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                video.path,
                video.filename,
                video.size_bytes as i64,
                video.file_hash,
                video.modified_at.to_rfc3339(),
                video.duration_secs,
                video.index_layer.as_i64(),
                video.index_status.as_str(),
                video.last_processed_clip,
                video.subtitle_path,
                video.orphaned_at.map(|t| t.to_rfc3339()),
                video.last_error,
            ],
        )?;
        Ok(VideoId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_video(&self, video: &Video) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE videos SET path=?1, filename=?2, size_bytes=?3, file_hash=?4, modified_at=?5,
                duration_secs=?6, index_layer=?7, index_status=?8, last_processed_clip=?9,
                subtitle_path=?10, orphaned_at=?11, last_error=?12
             WHERE id=?13",
            params![
                video.path,
                video.filename,
                video.size_bytes as i64,
                video.file_hash,
                video.modified_at.to_rfc3339(),
                video.duration_secs,
                video.index_layer.as_i64(),
                video.index_status.as_str(),
                video.last_processed_clip,
                video.subtitle_path,
                video.orphaned_at.map(|t| t.to_rfc3339()),
                video.last_error,
                video.id.get(),
            ],
        )?;
        Ok(())
    }

    /// Finds the most recently orphaned row with matching hash in this
    /// folder store (spec §9 Open Question: same-folder-store-only scope).
    pub fn find_most_recent_orphan_by_hash(&self, file_hash: &str) -> StoreResult<Option<Video>> {
        self.conn
            .query_row(
                "SELECT * FROM videos WHERE index_status = 'orphaned' AND file_hash = ?1
                 ORDER BY orphaned_at DESC LIMIT 1",
                params![file_hash],
                row_to_video,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn delete_video(&self, id: VideoId) -> StoreResult<()> {
        self.conn.execute("DELETE FROM videos WHERE id = ?1", params![id.get()])?;
        Ok(())
    }

    /// Deletes `pending_video_id` and writes `restored` in one transaction
    /// (spec §4.8: `attemptRecovery` must not leave the pending row gone
    /// with the orphan row not yet restored if it crashes mid-way).
    pub fn recover_orphan(&self, pending_video_id: VideoId, restored: &Video) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM videos WHERE id = ?1", params![pending_video_id.get()])?;
        tx.execute(
            "UPDATE videos SET path=?1, filename=?2, size_bytes=?3, file_hash=?4, modified_at=?5,
                duration_secs=?6, index_layer=?7, index_status=?8, last_processed_clip=?9,
                subtitle_path=?10, orphaned_at=?11, last_error=?12
             WHERE id=?13",
            params![
                restored.path,
                restored.filename,
                restored.size_bytes as i64,
                restored.file_hash,
                restored.modified_at.to_rfc3339(),
                restored.duration_secs,
                restored.index_layer.as_i64(),
                restored.index_status.as_str(),
                restored.last_processed_clip,
                restored.subtitle_path,
                restored.orphaned_at.map(|t| t.to_rfc3339()),
                restored.last_error,
                restored.id.get(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_orphaned_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Video>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM videos WHERE index_status = 'orphaned' AND orphaned_at < ?1")?;
        let rows = stmt
            .query_map(params![cutoff.to_rfc3339()], row_to_video)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_clips_for_video(&self, video_id: VideoId) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM clips WHERE video_id = ?1", params![video_id.get()])?;
        Ok(())
    }

    pub fn insert_clip_draft(&self, video_id: VideoId, draft: &ClipDraft) -> StoreResult<ClipId> {
        self.conn.execute(
            "INSERT INTO clips (video_id, start_time, end_time, thumbnail_path) VALUES (?1, ?2, ?3, ?4)",
            params![video_id.get(), draft.start_time, draft.end_time, draft.thumbnail_path],
        )?;
        Ok(ClipId::new(self.conn.last_insert_rowid()))
    }

    /// Deletes every existing clip for `video_id` and inserts `drafts` in
    /// its place, all in one transaction (spec §4.9 Layer 1: "in a single
    /// transaction, delete prior clips ... and insert new clip skeletons").
    /// Returns the new clip ids in the same order as `drafts`.
    pub fn replace_clips(&self, video_id: VideoId, drafts: &[ClipDraft]) -> StoreResult<Vec<ClipId>> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM clips WHERE video_id = ?1", params![video_id.get()])?;
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            tx.execute(
                "INSERT INTO clips (video_id, start_time, end_time, thumbnail_path) VALUES (?1, ?2, ?3, ?4)",
                params![video_id.get(), draft.start_time, draft.end_time, draft.thumbnail_path],
            )?;
            ids.push(ClipId::new(tx.last_insert_rowid()));
        }
        tx.commit()?;
        Ok(ids)
    }

    pub fn list_clips_for_video(&self, video_id: VideoId) -> StoreResult<Vec<Clip>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM clips WHERE video_id = ?1 ORDER BY start_time ASC")?;
        let rows = stmt
            .query_map(params![video_id.get()], row_to_clip)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_clip(&self, clip: &Clip) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE clips SET start_time=?1, end_time=?2, thumbnail_path=?3, transcript=?4,
                scene=?5, subjects=?6, actions=?7, objects=?8, mood=?9, shot_type=?10,
                lighting=?11, colors=?12, description=?13, tags=?14, vision_provider=?15,
                text_embedding=?16, text_embedding_model=?17, image_embedding=?18, image_embedding_model=?19
             WHERE id=?20",
            params![
                clip.start_time,
                clip.end_time,
                clip.thumbnail_path,
                clip.transcript,
                clip.scene,
                serde_json::to_string(&clip.subjects).unwrap_or_default(),
                serde_json::to_string(&clip.actions).unwrap_or_default(),
                serde_json::to_string(&clip.objects).unwrap_or_default(),
                clip.mood,
                clip.shot_type,
                clip.lighting,
                serde_json::to_string(&clip.colors).unwrap_or_default(),
                clip.description,
                serde_json::to_string(&clip.tags).unwrap_or_default(),
                clip.vision_provider,
                clip.text_embedding,
                clip.text_embedding_model,
                clip.image_embedding,
                clip.image_embedding_model,
                clip.id.get(),
            ],
        )?;
        Ok(())
    }

    pub fn videos_since(&self, cursor_rowid: i64) -> StoreResult<Vec<Video>> {
        let mut stmt = self.conn.prepare("SELECT * FROM videos WHERE id > ?1 ORDER BY id ASC")?;
        let rows = stmt
            .query_map(params![cursor_rowid], row_to_video)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn clips_since(&self, cursor_rowid: i64) -> StoreResult<Vec<Clip>> {
        let mut stmt = self.conn.prepare("SELECT * FROM clips WHERE id > ?1 ORDER BY id ASC")?;
        let rows = stmt
            .query_map(params![cursor_rowid], row_to_clip)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn all_videos(&self) -> StoreResult<Vec<Video>> {
        let mut stmt = self.conn.prepare("SELECT * FROM videos ORDER BY id ASC")?;
        let rows = stmt.query_map([], row_to_video)?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn all_clips(&self) -> StoreResult<Vec<Clip>> {
        let mut stmt = self.conn.prepare("SELECT * FROM clips ORDER BY id ASC")?;
        let rows = stmt.query_map([], row_to_clip)?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Rebases every stored path under `old_prefix` to `new_prefix`
    /// (spec §4.10 path rebase), for `videos.path` and `subtitle_path`.
    pub fn rebase_paths(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<()> {
        let videos = self.all_videos()?;
        for mut v in videos {
            let mut changed = false;
            if let Some(rebased) = rebase_one(&v.path, old_prefix, new_prefix) {
                v.path = rebased;
                changed = true;
            }
            if let Some(sub) = &v.subtitle_path {
                if let Some(rebased) = rebase_one(sub, old_prefix, new_prefix) {
                    v.subtitle_path = Some(rebased);
                    changed = true;
                }
            }
            if changed {
                self.update_video(&v)?;
            }
        }
        let clips = self.all_clips()?;
        for mut c in clips {
            if let Some(thumb) = &c.thumbnail_path {
                if let Some(rebased) = rebase_one(thumb, old_prefix, new_prefix) {
                    c.thumbnail_path = Some(rebased);
                    self.update_clip(&c)?;
                }
            }
        }
        Ok(())
    }
}

/// Path-boundary-aware prefix rebase: only rewrites `path` when it equals
/// `old_prefix` or starts with `old_prefix` followed by a separator, never
/// on a raw string prefix match (spec §9 Design Notes).
fn rebase_one(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if path == old_prefix {
        return Some(new_prefix.to_string());
    }
    let with_sep = format!("{old_prefix}/");
    if let Some(rest) = path.strip_prefix(&with_sep) {
        return Some(format!("{new_prefix}/{rest}"));
    }
    None
}

fn row_to_video(row: &Row) -> rusqlite::Result<Video> {
    let modified_at: String = row.get("modified_at")?;
    let orphaned_at: Option<String> = row.get("orphaned_at")?;
    let index_layer: i64 = row.get("index_layer")?;
    let index_status: String = row.get("index_status")?;
    Ok(Video {
        id: VideoId::new(row.get("id")?),
        folder_id: videx_models::FolderId::new(0),
        path: row.get("path")?,
        filename: row.get("filename")?,
        size_bytes: row.get::<_, i64>("size_bytes")? as u64,
        file_hash: row.get("file_hash")?,
        modified_at: parse_rfc3339(&modified_at),
        duration_secs: row.get("duration_secs")?,
        index_layer: IndexLayer::from_i64(index_layer).unwrap_or(IndexLayer::Metadata),
        index_status: IndexStatus::from_str(&index_status).unwrap_or(IndexStatus::Pending),
        last_processed_clip: row.get("last_processed_clip")?,
        subtitle_path: row.get("subtitle_path")?,
        orphaned_at: orphaned_at.map(|s| parse_rfc3339(&s)),
        last_error: row.get("last_error")?,
    })
}

fn row_to_clip(row: &Row) -> rusqlite::Result<Clip> {
    let subjects: String = row.get("subjects")?;
    let actions: String = row.get("actions")?;
    let objects: String = row.get("objects")?;
    let colors: String = row.get("colors")?;
    let tags: String = row.get("tags")?;
    Ok(Clip {
        id: ClipId::new(row.get("id")?),
        video_id: VideoId::new(row.get("video_id")?),
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        thumbnail_path: row.get("thumbnail_path")?,
        transcript: row.get("transcript")?,
        scene: row.get("scene")?,
        subjects: serde_json::from_str(&subjects).unwrap_or_default(),
        actions: serde_json::from_str(&actions).unwrap_or_default(),
        objects: serde_json::from_str(&objects).unwrap_or_default(),
        mood: row.get("mood")?,
        shot_type: row.get("shot_type")?,
        lighting: row.get("lighting")?,
        colors: serde_json::from_str(&colors).unwrap_or_default(),
        description: row.get("description")?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        vision_provider: row.get("vision_provider")?,
        text_embedding: row.get("text_embedding")?,
        text_embedding_model: row.get("text_embedding_model")?,
        image_embedding: row.get("image_embedding")?,
        image_embedding_model: row.get("image_embedding_model")?,
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use videx_models::Folder;

    fn open_temp() -> (tempfile::TempDir, FolderStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.sqlite");
        let folder = Folder::new("/vol/media");
        let store = FolderStore::open(path.to_str().unwrap(), &folder).unwrap();
        (dir, store)
    }

    #[test]
    fn insert_and_fetch_video_round_trips() {
        let (_dir, store) = open_temp();
        let video = Video::new_pending(videx_models::FolderId::new(1), "/vol/media/a.mp4", "a.mp4", 100, Utc::now());
        let id = store.insert_video(&video).unwrap();
        let fetched = store.get_video_by_path("/vol/media/a.mp4").unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.size_bytes, 100);
    }

    #[test]
    fn clips_are_ordered_by_start_time() {
        let (_dir, store) = open_temp();
        let video = Video::new_pending(videx_models::FolderId::new(1), "/vol/media/a.mp4", "a.mp4", 100, Utc::now());
        let video_id = store.insert_video(&video).unwrap();
        store.insert_clip_draft(video_id, &ClipDraft::new(10.0, 18.0)).unwrap();
        store.insert_clip_draft(video_id, &ClipDraft::new(0.0, 10.0)).unwrap();
        let clips = store.list_clips_for_video(video_id).unwrap();
        assert_eq!(clips[0].start_time, 0.0);
        assert_eq!(clips[1].start_time, 10.0);
    }

    #[test]
    fn rebase_rewrites_path_boundary_aware() {
        let (_dir, store) = open_temp();
        let video = Video::new_pending(videx_models::FolderId::new(1), "/Volumes/T7/a.mp4", "a.mp4", 100, Utc::now());
        store.insert_video(&video).unwrap();
        store.rebase_paths("/Volumes/T7", "/Volumes/T7-renamed").unwrap();
        let fetched = store.get_video_by_path("/Volumes/T7-renamed/a.mp4").unwrap();
        assert!(fetched.is_some());
    }

    #[test]
    fn rebase_does_not_touch_similarly_prefixed_volume() {
        let (_dir, store) = open_temp();
        let video = Video::new_pending(videx_models::FolderId::new(1), "/Volumes/T70/a.mp4", "a.mp4", 100, Utc::now());
        store.insert_video(&video).unwrap();
        store.rebase_paths("/Volumes/T7", "/Volumes/Renamed").unwrap();
        // T70 is not a path-boundary match for prefix T7, must be untouched.
        let fetched = store.get_video_by_path("/Volumes/T70/a.mp4").unwrap();
        assert!(fetched.is_some());
    }
}
