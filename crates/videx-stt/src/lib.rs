pub mod cleanup;
pub mod clip_mapping;
pub mod engine;
pub mod error;
pub mod language_id;
pub mod subtitle;

pub use engine::{EngineKind, EnginePreference, LanguageGuess, SttEngine, TranscriptSegment, select_engine};
pub use error::{SttError, SttResult};
pub use language_id::LidOutcome;
