//! DDL and a `user_version`-gated migration runner. No external migration
//! framework is warranted at this scale; each store has a short ordered
//! list of SQL blocks applied in a single transaction at open time.

use rusqlite::Connection;

use crate::error::StoreResult;

const FOLDER_STORE_MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE folder_meta (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        path TEXT NOT NULL,
        volume_uuid TEXT,
        volume_name TEXT,
        last_seen_at TEXT NOT NULL,
        available INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE videos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT NOT NULL UNIQUE,
        filename TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        file_hash TEXT,
        modified_at TEXT NOT NULL,
        duration_secs REAL,
        index_layer INTEGER NOT NULL DEFAULT 0,
        index_status TEXT NOT NULL DEFAULT 'pending',
        last_processed_clip INTEGER,
        subtitle_path TEXT,
        orphaned_at TEXT,
        last_error TEXT
    );

    CREATE INDEX idx_videos_file_hash ON videos(file_hash);
    CREATE INDEX idx_videos_status ON videos(index_status);

    CREATE TABLE clips (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id INTEGER NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        thumbnail_path TEXT,
        transcript TEXT,
        scene TEXT,
        subjects TEXT NOT NULL DEFAULT '[]',
        actions TEXT NOT NULL DEFAULT '[]',
        objects TEXT NOT NULL DEFAULT '[]',
        mood TEXT,
        shot_type TEXT,
        lighting TEXT,
        colors TEXT NOT NULL DEFAULT '[]',
        description TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        vision_provider TEXT,
        text_embedding BLOB,
        text_embedding_model TEXT,
        image_embedding BLOB,
        image_embedding_model TEXT
    );

    CREATE INDEX idx_clips_video_id ON clips(video_id);
    "#,
];

const GLOBAL_STORE_MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE sync_cursors (
        source_folder TEXT PRIMARY KEY,
        last_synced_clip_rowid INTEGER NOT NULL DEFAULT 0,
        last_synced_video_rowid INTEGER NOT NULL DEFAULT 0,
        last_synced_at TEXT,
        volume_uuid TEXT,
        volume_name TEXT
    );

    CREATE TABLE g_videos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_folder TEXT NOT NULL,
        source_video_id INTEGER NOT NULL,
        path TEXT NOT NULL,
        filename TEXT NOT NULL,
        duration_secs REAL,
        index_status TEXT NOT NULL,
        subtitle_path TEXT,
        UNIQUE(source_folder, source_video_id)
    );

    CREATE TABLE g_clips (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_folder TEXT NOT NULL,
        source_clip_id INTEGER NOT NULL,
        source_video_id INTEGER NOT NULL,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        thumbnail_path TEXT,
        transcript TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        description TEXT,
        text_embedding BLOB,
        text_embedding_model TEXT,
        image_embedding BLOB,
        image_embedding_model TEXT,
        UNIQUE(source_folder, source_clip_id)
    );

    CREATE INDEX idx_g_clips_source_video ON g_clips(source_folder, source_video_id);

    CREATE VIRTUAL TABLE clip_search USING fts5(
        tags, description, transcript, content='g_clips', content_rowid='id'
    );

    CREATE TRIGGER g_clips_ai AFTER INSERT ON g_clips BEGIN
        INSERT INTO clip_search(rowid, tags, description, transcript)
        VALUES (new.id, new.tags, new.description, new.transcript);
    END;

    CREATE TRIGGER g_clips_ad AFTER DELETE ON g_clips BEGIN
        INSERT INTO clip_search(clip_search, rowid, tags, description, transcript)
        VALUES ('delete', old.id, old.tags, old.description, old.transcript);
    END;

    CREATE TRIGGER g_clips_au AFTER UPDATE ON g_clips BEGIN
        INSERT INTO clip_search(clip_search, rowid, tags, description, transcript)
        VALUES ('delete', old.id, old.tags, old.description, old.transcript);
        INSERT INTO clip_search(rowid, tags, description, transcript)
        VALUES (new.id, new.tags, new.description, new.transcript);
    END;
    "#,
];

pub fn open_with_migrations(conn: &mut Connection, migrations: &[&str]) -> StoreResult<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let current_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let tx = conn.transaction()?;
    for (i, migration) in migrations.iter().enumerate() {
        let version = (i + 1) as i64;
        if version > current_version {
            tx.execute_batch(migration)?;
        }
    }
    tx.pragma_update(None, "user_version", migrations.len() as i64)?;
    tx.commit()?;
    Ok(())
}

pub fn folder_store_migrations() -> &'static [&'static str] {
    FOLDER_STORE_MIGRATIONS
}

pub fn global_store_migrations() -> &'static [&'static str] {
    GLOBAL_STORE_MIGRATIONS
}
