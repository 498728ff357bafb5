use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{FolderId, VideoId};

/// One of the four indexing phases. Ordinal value doubles as the stored
/// `index_layer` column; advancement is monotonic except on content change
/// or orphan rebuild, which reset it to `Metadata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i64)]
pub enum IndexLayer {
    Metadata = 0,
    VisualVectors = 1,
    Stt = 2,
    Descriptions = 3,
}

impl IndexLayer {
    pub fn from_i64(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Self::Metadata),
            1 => Some(Self::VisualVectors),
            2 => Some(Self::Stt),
            3 => Some(Self::Descriptions),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn next(self) -> Option<Self> {
        Self::from_i64(self.as_i64() + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexStatus {
    Pending,
    MetadataDone,
    VectorsDone,
    SttRunning,
    SttDone,
    VisionRunning,
    Completed,
    Failed,
    Orphaned,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::MetadataDone => "metadataDone",
            Self::VectorsDone => "vectorsDone",
            Self::SttRunning => "sttRunning",
            Self::SttDone => "sttDone",
            Self::VisionRunning => "visionRunning",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Orphaned => "orphaned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "metadataDone" => Self::MetadataDone,
            "vectorsDone" => Self::VectorsDone,
            "sttRunning" => Self::SttRunning,
            "sttDone" => Self::SttDone,
            "visionRunning" => Self::VisionRunning,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "orphaned" => Self::Orphaned,
            _ => return None,
        })
    }
}

/// One row per media file inside a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub folder_id: FolderId,
    pub path: String,
    pub filename: String,
    pub size_bytes: u64,
    pub file_hash: Option<String>,
    pub modified_at: DateTime<Utc>,
    pub duration_secs: Option<f64>,
    pub index_layer: IndexLayer,
    pub index_status: IndexStatus,
    pub last_processed_clip: Option<i64>,
    pub subtitle_path: Option<String>,
    pub orphaned_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Video {
    pub fn new_pending(
        folder_id: FolderId,
        path: impl Into<String>,
        filename: impl Into<String>,
        size_bytes: u64,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VideoId::new(0),
            folder_id,
            path: path.into(),
            filename: filename.into(),
            size_bytes,
            file_hash: None,
            modified_at,
            duration_secs: None,
            index_layer: IndexLayer::Metadata,
            index_status: IndexStatus::Pending,
            last_processed_clip: None,
            subtitle_path: None,
            orphaned_at: None,
            last_error: None,
        }
    }

    /// `fileHash = nil` iff the video never progressed past initial
    /// registration (data-model invariant in spec §3).
    pub fn is_unregistered(&self) -> bool {
        self.file_hash.is_none() && self.index_layer == IndexLayer::Metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_layer_advances_by_one() {
        assert_eq!(IndexLayer::Metadata.next(), Some(IndexLayer::VisualVectors));
        assert_eq!(IndexLayer::Descriptions.next(), None);
    }

    #[test]
    fn index_status_round_trips_through_str() {
        for s in [
            IndexStatus::Pending,
            IndexStatus::MetadataDone,
            IndexStatus::VectorsDone,
            IndexStatus::SttRunning,
            IndexStatus::SttDone,
            IndexStatus::VisionRunning,
            IndexStatus::Completed,
            IndexStatus::Failed,
            IndexStatus::Orphaned,
        ] {
            assert_eq!(IndexStatus::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn fresh_video_has_no_hash() {
        let v = Video::new_pending(FolderId::new(1), "/a/b.mp4", "b.mp4", 10, Utc::now());
        assert!(v.is_unregistered());
    }
}
