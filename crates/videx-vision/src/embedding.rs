//! Clip text composition, batched embedding calls with per-clip degrade,
//! and little-endian float32 vector serialization (spec §4.6).

use async_trait::async_trait;
use tracing::warn;
use videx_models::field_registry::{EmbeddingGroup, FIELDS};

use crate::analyzer::VisionFields;
use crate::error::{VisionError, VisionResult};

/// A pluggable embedding capability — out of scope per spec.md §1.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;
    fn dims(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> VisionResult<Vec<Vec<f32>>>;
    async fn embed_one(&self, text: &str) -> VisionResult<Vec<f32>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedVector {
    pub model: String,
    pub bytes: Vec<u8>,
}

/// Composes embedding text from the vision fields, grouped per the field
/// registry's embedding group and joined with that group's separator.
/// Groups are concatenated in registry order with a single space.
pub fn compose_embedding_text(fields: &VisionFields) -> String {
    let mut groups: Vec<(EmbeddingGroup, Vec<String>)> =
        vec![(EmbeddingGroup::Primary, vec![]), (EmbeddingGroup::Detail, vec![]), (EmbeddingGroup::Meta, vec![])];

    for field in FIELDS.iter() {
        let value = field_value(fields, field.column);
        if value.is_empty() {
            continue;
        }
        if let Some((_, bucket)) = groups.iter_mut().find(|(g, _)| *g == field.group) {
            bucket.push(value);
        }
    }

    groups
        .into_iter()
        .filter_map(|(group, values)| {
            if values.is_empty() {
                None
            } else {
                Some(values.join(group.joiner()))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_value(fields: &VisionFields, column: &str) -> String {
    match column {
        "scene" => fields.scene.clone().unwrap_or_default(),
        "subjects" => fields.subjects.join(", "),
        "actions" => fields.actions.join(", "),
        "objects" => fields.objects.join(", "),
        "mood" => fields.mood.clone().unwrap_or_default(),
        "shot_type" => fields.shot_type.clone().unwrap_or_default(),
        "lighting" => fields.lighting.clone().unwrap_or_default(),
        "colors" => fields.colors.join(", "),
        "description" => fields.description.clone().unwrap_or_default(),
        other => unreachable!("unknown field registry column: {other}"),
    }
}

pub fn serialize_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

pub fn check_length_invariant(dims: usize, bytes: &[u8]) -> VisionResult<()> {
    let expected = dims * 4;
    if bytes.len() != expected {
        return Err(VisionError::EmbeddingLengthMismatch { expected, actual: bytes.len() });
    }
    Ok(())
}

/// One (clip index, text) pair produced for clips with non-empty composed
/// text; clips with empty text are skipped per spec §4.6.
pub struct EmbeddingCoordinator<'a> {
    provider: &'a dyn EmbeddingProvider,
}

impl<'a> EmbeddingCoordinator<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider) -> Self {
        Self { provider }
    }

    /// Attempts one batch call; on failure, degrades to per-item calls,
    /// accumulating failures non-fatally (spec §4.6). Returns one entry per
    /// input text, `None` where embedding ultimately failed.
    pub async fn embed_all(&self, texts: &[String]) -> Vec<Option<EmbeddedVector>> {
        match self.provider.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => vectors
                .into_iter()
                .map(|v| self.to_embedded(v))
                .collect(),
            Ok(_) | Err(_) => {
                warn!("embedding batch call failed or returned a mismatched count, degrading to per-clip calls");
                let mut out = Vec::with_capacity(texts.len());
                for text in texts {
                    match self.provider.embed_one(text).await {
                        Ok(v) => out.push(self.to_embedded(v)),
                        Err(e) => {
                            warn!(error = %e, "per-clip embedding call failed");
                            out.push(None);
                        }
                    }
                }
                out
            }
        }
    }

    fn to_embedded(&self, vector: Vec<f32>) -> Option<EmbeddedVector> {
        let bytes = serialize_vector(&vector);
        if check_length_invariant(self.provider.dims(), &bytes).is_err() {
            return None;
        }
        Some(EmbeddedVector { model: self.provider.model_name().to_string(), bytes })
    }
}
