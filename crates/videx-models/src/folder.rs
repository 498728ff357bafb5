use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::FolderId;

/// An authoritative media root, unique by path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub path: String,
    pub volume_uuid: Option<String>,
    pub volume_name: Option<String>,
    pub last_seen_at: DateTime<Utc>,
    pub available: bool,
}

impl Folder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: FolderId::new(0),
            path: path.into(),
            volume_uuid: None,
            volume_name: None,
            last_seen_at: Utc::now(),
            available: true,
        }
    }
}
