pub mod analyzer;
pub mod api_key;
pub mod cloud;
pub mod embedding;
pub mod error;
pub mod model_cache;

pub use analyzer::{merge_fields, VisionEngine, VisionFields, VisionProvider};
pub use embedding::{compose_embedding_text, EmbeddedVector, EmbeddingCoordinator, EmbeddingProvider};
pub use error::{VisionError, VisionResult};
pub use model_cache::SingleFlightModel;
