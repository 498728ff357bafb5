//! Capability seams the layered indexer drives but does not implement
//! itself: image embedding (layer 1) and STT availability gating (layer 2)
//! both plug in here, mirroring how `videx-vision::VisionEngine` and
//! `videx-stt::SttEngine` are themselves pluggable.

use async_trait::async_trait;

use crate::error::IndexerResult;

/// Encodes a keyframe into a fixed-length float vector. Layer 1 calls this
/// once per video, on the first keyframe of clip 0, to make the video
/// searchable by image similarity before STT/vision even run.
#[async_trait]
pub trait ImageEmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;
    fn dims(&self) -> usize;
    async fn embed_image(&self, image_bytes: &[u8]) -> IndexerResult<Vec<f32>>;
}

/// Little-endian float32 byte encoding, shared with `videx-vision`'s text
/// embedding serialization (spec §6 vector serialization).
pub fn serialize_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_vector_is_little_endian_and_length_matches() {
        let vector = vec![1.0_f32, -2.5, 0.0];
        let bytes = serialize_vector(&vector);
        assert_eq!(bytes.len(), vector.len() * 4);
        assert_eq!(&bytes[0..4], &1.0_f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-2.5_f32).to_le_bytes());
    }
}
