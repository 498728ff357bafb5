#![deny(unreachable_patterns)]

pub mod audio_extractor;
pub mod bridge;
pub mod content_hash;
pub mod error;
pub mod keyframe_extractor;
pub mod probe;
pub mod scene_detector;
pub mod silence_probe;

pub use audio_extractor::{AudioExtractor, AudioExtractorConfig};
pub use error::{MediaError, MediaResult};
pub use keyframe_extractor::{KeyframeExtractor, KeyframeExtractorConfig};
pub use scene_detector::{SceneDetectionResult, SceneDetector, SceneDetectorConfig, Segment};
pub use silence_probe::{SilenceProbe, SilenceProbeConfig};
