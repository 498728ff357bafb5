use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreResult;
use crate::schema;

#[derive(Debug, Clone)]
pub struct SyncCursor {
    pub source_folder: String,
    pub last_synced_clip_rowid: i64,
    pub last_synced_video_rowid: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub volume_uuid: Option<String>,
    pub volume_name: Option<String>,
}

impl SyncCursor {
    pub fn fresh(source_folder: impl Into<String>) -> Self {
        Self {
            source_folder: source_folder.into(),
            last_synced_clip_rowid: 0,
            last_synced_video_rowid: 0,
            last_synced_at: None,
            volume_uuid: None,
            volume_name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GlobalVideoRow {
    pub source_folder: String,
    pub source_video_id: i64,
    pub path: String,
    pub filename: String,
    pub duration_secs: Option<f64>,
    pub index_status: String,
    pub subtitle_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GlobalClipRow {
    pub source_folder: String,
    pub source_clip_id: i64,
    pub source_video_id: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub thumbnail_path: Option<String>,
    pub transcript: Option<String>,
    pub tags_json: String,
    pub description: Option<String>,
    pub text_embedding: Option<Vec<u8>>,
    pub text_embedding_model: Option<String>,
    pub image_embedding: Option<Vec<u8>>,
    pub image_embedding_model: Option<String>,
}

pub struct GlobalStore {
    conn: Connection,
}

impl GlobalStore {
    pub fn open(db_path: &str) -> StoreResult<Self> {
        let mut conn = Connection::open(db_path)?;
        schema::open_with_migrations(&mut conn, schema::global_store_migrations())?;
        Ok(Self { conn })
    }

    pub fn get_cursor(&self, source_folder: &str) -> StoreResult<SyncCursor> {
        let cursor = self
            .conn
            .query_row(
                "SELECT source_folder, last_synced_clip_rowid, last_synced_video_rowid,
                    last_synced_at, volume_uuid, volume_name
                 FROM sync_cursors WHERE source_folder = ?1",
                params![source_folder],
                row_to_cursor,
            )
            .optional()?;
        Ok(cursor.unwrap_or_else(|| SyncCursor::fresh(source_folder)))
    }

    /// Upserts the cursor, using `COALESCE` for volume fields so a later
    /// sync with unknown volume info never stomps a previously recorded
    /// value with null (spec §4.10).
    pub fn upsert_cursor(&self, cursor: &SyncCursor) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO sync_cursors
                (source_folder, last_synced_clip_rowid, last_synced_video_rowid, last_synced_at, volume_uuid, volume_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(source_folder) DO UPDATE SET
                last_synced_clip_rowid = excluded.last_synced_clip_rowid,
                last_synced_video_rowid = excluded.last_synced_video_rowid,
                last_synced_at = excluded.last_synced_at,
                volume_uuid = COALESCE(excluded.volume_uuid, sync_cursors.volume_uuid),
                volume_name = COALESCE(excluded.volume_name, sync_cursors.volume_name)",
            params![
                cursor.source_folder,
                cursor.last_synced_clip_rowid,
                cursor.last_synced_video_rowid,
                cursor.last_synced_at.map(|t| t.to_rfc3339()),
                cursor.volume_uuid,
                cursor.volume_name,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_video(&self, row: &GlobalVideoRow) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO g_videos (source_folder, source_video_id, path, filename, duration_secs, index_status, subtitle_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(source_folder, source_video_id) DO UPDATE SET
                path = excluded.path,
                filename = excluded.filename,
                duration_secs = excluded.duration_secs,
                index_status = excluded.index_status,
                subtitle_path = excluded.subtitle_path",
            params![
                row.source_folder,
                row.source_video_id,
                row.path,
                row.filename,
                row.duration_secs,
                row.index_status,
                row.subtitle_path,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_clip(&self, row: &GlobalClipRow) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO g_clips (source_folder, source_clip_id, source_video_id, start_time, end_time,
                thumbnail_path, transcript, tags, description, text_embedding, text_embedding_model,
                image_embedding, image_embedding_model)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(source_folder, source_clip_id) DO UPDATE SET
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                thumbnail_path = excluded.thumbnail_path,
                transcript = excluded.transcript,
                tags = excluded.tags,
                description = excluded.description,
                text_embedding = excluded.text_embedding,
                text_embedding_model = excluded.text_embedding_model,
                image_embedding = excluded.image_embedding,
                image_embedding_model = excluded.image_embedding_model",
            params![
                row.source_folder,
                row.source_clip_id,
                row.source_video_id,
                row.start_time,
                row.end_time,
                row.thumbnail_path,
                row.transcript,
                row.tags_json,
                row.description,
                row.text_embedding,
                row.text_embedding_model,
                row.image_embedding,
                row.image_embedding_model,
            ],
        )?;
        Ok(())
    }

    pub fn delete_video_mirror(&self, source_folder: &str, source_video_id: i64) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM g_videos WHERE source_folder = ?1 AND source_video_id = ?2",
            params![source_folder, source_video_id],
        )?;
        Ok(())
    }

    pub fn count_video_mirrors(&self, source_folder: &str, source_video_id: i64) -> StoreResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM g_videos WHERE source_folder = ?1 AND source_video_id = ?2",
                params![source_folder, source_video_id],
                |r| r.get(0),
            )
            .map_err(Into::into)
    }

    pub fn count_clip_mirrors_for_video(&self, source_folder: &str, source_video_id: i64) -> StoreResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM g_clips WHERE source_folder = ?1 AND source_video_id = ?2",
                params![source_folder, source_video_id],
                |r| r.get(0),
            )
            .map_err(Into::into)
    }

    /// Rebases `g_videos.path`/`g_clips.thumbnail_path` string prefixes to
    /// follow a folder-store path rebase (spec §4.10).
    pub fn rebase_paths(&self, source_folder: &str, old_prefix: &str, new_prefix: &str) -> StoreResult<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, path FROM g_videos WHERE source_folder = ?1")?;
        let rows: Vec<(i64, String)> = stmt
            .query_map(params![source_folder], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (id, path) in rows {
            if let Some(rebased) = rebase_one(&path, old_prefix, new_prefix) {
                self.conn
                    .execute("UPDATE g_videos SET path = ?1 WHERE id = ?2", params![rebased, id])?;
            }
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id, thumbnail_path FROM g_clips WHERE source_folder = ?1")?;
        let rows: Vec<(i64, Option<String>)> = stmt
            .query_map(params![source_folder], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (id, thumb) in rows {
            if let Some(t) = thumb {
                if let Some(rebased) = rebase_one(&t, old_prefix, new_prefix) {
                    self.conn
                        .execute("UPDATE g_clips SET thumbnail_path = ?1 WHERE id = ?2", params![rebased, id])?;
                }
            }
        }
        Ok(())
    }
}

fn rebase_one(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if path == old_prefix {
        return Some(new_prefix.to_string());
    }
    let with_sep = format!("{old_prefix}/");
    path.strip_prefix(&with_sep).map(|rest| format!("{new_prefix}/{rest}"))
}

fn row_to_cursor(row: &Row) -> rusqlite::Result<SyncCursor> {
    let last_synced_at: Option<String> = row.get(3)?;
    Ok(SyncCursor {
        source_folder: row.get(0)?,
        last_synced_clip_rowid: row.get(1)?,
        last_synced_video_rowid: row.get(2)?,
        last_synced_at: last_synced_at.map(|s| parse_rfc3339(&s)),
        volume_uuid: row.get(4)?,
        volume_name: row.get(5)?,
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

    fn open_temp() -> (tempfile::TempDir, GlobalStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.sqlite");
        let store = GlobalStore::open(path.to_str().unwrap()).unwrap();
        (dir, store)
    }

    #[test]
    fn fresh_cursor_starts_at_zero() {
        let (_dir, store) = open_temp();
        let cursor = store.get_cursor("/vol/media").unwrap();
        assert_eq!(cursor.last_synced_clip_rowid, 0);
    }

    #[test]
    fn upsert_cursor_preserves_volume_fields_on_coalesce() {
        let (_dir, store) = open_temp();
        let mut cursor = SyncCursor::fresh("/vol/media");
        cursor.volume_uuid = Some("uuid-1".into());
        store.upsert_cursor(&cursor).unwrap();

        let mut next = store.get_cursor("/vol/media").unwrap();
        next.last_synced_clip_rowid = 5;
        next.volume_uuid = None;
        store.upsert_cursor(&next).unwrap();

        let fetched = store.get_cursor("/vol/media").unwrap();
        assert_eq!(fetched.last_synced_clip_rowid, 5);
        assert_eq!(fetched.volume_uuid.as_deref(), Some("uuid-1"));
    }

    #[test]
    fn upsert_video_is_idempotent_under_source_key() {
        let (_dir, store) = open_temp();
        let row = GlobalVideoRow {
            source_folder: "/vol/media".into(),
            source_video_id: 1,
            path: "/vol/media/a.mp4".into(),
            filename: "a.mp4".into(),
            duration_secs: Some(25.0),
            index_status: "completed".into(),
            subtitle_path: None,
        };
        store.upsert_video(&row).unwrap();
        store.upsert_video(&row).unwrap();
        assert_eq!(store.count_video_mirrors("/vol/media", 1).unwrap(), 1);
    }
}
