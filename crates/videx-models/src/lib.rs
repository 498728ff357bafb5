#![deny(unreachable_patterns)]

pub mod clip;
pub mod field_registry;
pub mod folder;
pub mod ids;
pub mod video;

pub use clip::{Clip, ClipDraft, MergeStrategy};
pub use field_registry::{EmbeddingGroup, FieldSpec, FIELDS};
pub use folder::Folder;
pub use ids::{ClipId, FolderId, VideoId};
pub use video::{IndexLayer, IndexStatus, Video};
