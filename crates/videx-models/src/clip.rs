use serde::{Deserialize, Serialize};

pub use crate::field_registry::MergeStrategy;
use crate::ids::{ClipId, VideoId};

/// One scene segment of a video; the unit of search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub video_id: VideoId,
    pub start_time: f64,
    pub end_time: f64,
    pub thumbnail_path: Option<String>,
    pub transcript: Option<String>,

    pub scene: Option<String>,
    pub subjects: Vec<String>,
    pub actions: Vec<String>,
    pub objects: Vec<String>,
    pub mood: Option<String>,
    pub shot_type: Option<String>,
    pub lighting: Option<String>,
    pub colors: Vec<String>,
    pub description: Option<String>,

    pub tags: Vec<String>,
    pub vision_provider: Option<String>,

    pub text_embedding: Option<Vec<u8>>,
    pub text_embedding_model: Option<String>,
    pub image_embedding: Option<Vec<u8>>,
    pub image_embedding_model: Option<String>,
}

impl Clip {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A newly detected scene segment before it is persisted and assigned an id.
#[derive(Debug, Clone)]
pub struct ClipDraft {
    pub start_time: f64,
    pub end_time: f64,
    pub thumbnail_path: Option<String>,
}

impl ClipDraft {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
            thumbnail_path: None,
        }
    }
}

/// Filesystem-safe slug for thumbnail/subtitle fallback names: ASCII
/// alphanumerics, space, hyphen, underscore only; lowercased; truncated to
/// 50 chars.
pub fn sanitize_filename_fragment(input: &str) -> String {
    let filtered: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let lowered = filtered.to_lowercase();
    lowered.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_end_minus_start() {
        let mut clip = blank_clip();
        clip.start_time = 10.0;
        clip.end_time = 18.0;
        assert_eq!(clip.duration(), 8.0);
    }

    #[test]
    fn sanitize_strips_unicode_and_punctuation() {
        assert_eq!(sanitize_filename_fragment("Caf\u{e9}! #1"), "caf 1");
    }

    #[test]
    fn sanitize_truncates_to_fifty_chars() {
        let long = "a".repeat(200);
        assert_eq!(sanitize_filename_fragment(&long).len(), 50);
    }

    fn blank_clip() -> Clip {
        Clip {
            id: ClipId::new(0),
            video_id: VideoId::new(0),
            start_time: 0.0,
            end_time: 0.0,
            thumbnail_path: None,
            transcript: None,
            scene: None,
            subjects: vec![],
            actions: vec![],
            objects: vec![],
            mood: None,
            shot_type: None,
            lighting: None,
            colors: vec![],
            description: None,
            tags: vec![],
            vision_provider: None,
            text_embedding: None,
            text_embedding_model: None,
            image_embedding: None,
            image_embedding_model: None,
        }
    }
}
