//! Vision analysis: per-clip field extraction and the local/remote merge
//! policy over the nine-field registry (spec §4.5).

use async_trait::async_trait;
use videx_models::field_registry::{MergeStrategy, FIELDS};

use crate::error::VisionResult;

/// Sparse, field-registry-shaped vision output: `None`/empty for a field
/// the analyzer didn't produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisionFields {
    pub scene: Option<String>,
    pub subjects: Vec<String>,
    pub actions: Vec<String>,
    pub objects: Vec<String>,
    pub mood: Option<String>,
    pub shot_type: Option<String>,
    pub lighting: Option<String>,
    pub colors: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionProvider {
    LocalVision,
    Gemini,
    LocalVlm,
}

impl VisionProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            VisionProvider::LocalVision => "local_vision",
            VisionProvider::Gemini => "gemini",
            VisionProvider::LocalVlm => "local_vlm",
        }
    }
}

/// A pluggable vision capability: a local fast analyzer (layer 1) or a
/// cloud/VLM engine (layer 3). Out of scope per spec.md §1; this trait is
/// the seam a concrete model plugs into.
#[async_trait]
pub trait VisionEngine: Send + Sync {
    fn provider(&self) -> VisionProvider;
    async fn analyze(&self, image_bytes: &[u8]) -> VisionResult<VisionFields>;
}

/// Merges `remote` over `local`: per field, keeps the local value unless
/// the field's merge strategy says the remote value should win. Per spec
/// §4.5, layer 3 fills gaps the local fast analyzer left, it never
/// overwrites a local value that already satisfies the strategy.
pub fn merge_fields(local: VisionFields, remote: VisionFields) -> VisionFields {
    let mut merged = local;

    for field in FIELDS.iter() {
        match (field.column, field.merge_strategy) {
            ("scene", MergeStrategy::PreferNonNil) => {
                merged.scene = prefer_non_nil(merged.scene.take(), remote.scene.clone())
            }
            ("subjects", MergeStrategy::PreferNonEmptyArray) => {
                merged.subjects = prefer_non_empty(std::mem::take(&mut merged.subjects), remote.subjects.clone())
            }
            ("actions", MergeStrategy::PreferNonEmptyArray) => {
                merged.actions = prefer_non_empty(std::mem::take(&mut merged.actions), remote.actions.clone())
            }
            ("objects", MergeStrategy::PreferNonEmptyArray) => {
                merged.objects = prefer_non_empty(std::mem::take(&mut merged.objects), remote.objects.clone())
            }
            ("mood", MergeStrategy::PreferNonNil) => {
                merged.mood = prefer_non_nil(merged.mood.take(), remote.mood.clone())
            }
            ("shot_type", MergeStrategy::PreferNonNil) => {
                merged.shot_type = prefer_non_nil(merged.shot_type.take(), remote.shot_type.clone())
            }
            ("lighting", MergeStrategy::PreferNonNil) => {
                merged.lighting = prefer_non_nil(merged.lighting.take(), remote.lighting.clone())
            }
            ("colors", MergeStrategy::PreferNonEmptyArray) => {
                merged.colors = prefer_non_empty(std::mem::take(&mut merged.colors), remote.colors.clone())
            }
            ("description", MergeStrategy::PreferNonNil) => {
                merged.description = prefer_non_nil(merged.description.take(), remote.description.clone())
            }
            _ => unreachable!("field registry column/strategy pairing is exhaustive"),
        }
    }

    merged
}

fn prefer_non_nil(local: Option<String>, remote: Option<String>) -> Option<String> {
    local.or(remote)
}

fn prefer_non_empty(local: Vec<String>, remote: Vec<String>) -> Vec<String> {
    if local.is_empty() {
        remote
    } else {
        local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_value_wins_when_present() {
        let local = VisionFields { scene: Some("kitchen".into()), ..Default::default() };
        let remote = VisionFields { scene: Some("office".into()), ..Default::default() };
        let merged = merge_fields(local, remote);
        assert_eq!(merged.scene, Some("kitchen".to_string()));
    }

    #[test]
    fn remote_fills_gap_when_local_is_nil() {
        let local = VisionFields::default();
        let remote = VisionFields { mood: Some("tense".into()), ..Default::default() };
        let merged = merge_fields(local, remote);
        assert_eq!(merged.mood, Some("tense".to_string()));
    }

    #[test]
    fn remote_fills_gap_when_local_array_is_empty() {
        let local = VisionFields::default();
        let remote = VisionFields { subjects: vec!["dog".into()], ..Default::default() };
        let merged = merge_fields(local, remote);
        assert_eq!(merged.subjects, vec!["dog".to_string()]);
    }

    #[test]
    fn non_empty_local_array_is_not_overwritten() {
        let local = VisionFields { subjects: vec!["cat".into()], ..Default::default() };
        let remote = VisionFields { subjects: vec!["dog".into()], ..Default::default() };
        let merged = merge_fields(local, remote);
        assert_eq!(merged.subjects, vec!["cat".to_string()]);
    }
}
