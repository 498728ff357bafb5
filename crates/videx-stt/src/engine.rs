use async_trait::async_trait;

use crate::error::SttResult;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageGuess {
    pub language: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    HighAccuracy,
    Fast,
}

/// STT is treated as a pluggable capability per spec.md §1 (actual model
/// implementations are out of scope); this trait is the seam a concrete
/// engine plugs into.
#[async_trait]
pub trait SttEngine: Send + Sync {
    fn kind(&self) -> EngineKind;
    fn is_available(&self) -> bool;

    async fn transcribe(
        &self,
        audio_path: &str,
        window: Option<(f64, f64)>,
        language_hint: Option<&str>,
    ) -> SttResult<Vec<TranscriptSegment>>;

    async fn detect_language(&self, audio_path: &str, window: (f64, f64)) -> SttResult<LanguageGuess>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePreference {
    Auto,
    HighAccuracyOnly,
    FastOnly,
}

/// Engine selection per spec §4.4: `highAccuracyOnly`/`fastOnly` require
/// their named engine; `auto` prefers high-accuracy, falls back to fast.
pub fn select_engine<'a>(
    preference: EnginePreference,
    high_accuracy: Option<&'a dyn SttEngine>,
    fast: Option<&'a dyn SttEngine>,
) -> crate::error::SttResult<&'a dyn SttEngine> {
    use crate::error::SttError;

    match preference {
        EnginePreference::HighAccuracyOnly => high_accuracy
            .filter(|e| e.is_available())
            .ok_or(SttError::EngineUnavailable),
        EnginePreference::FastOnly => fast.filter(|e| e.is_available()).ok_or(SttError::EngineUnavailable),
        EnginePreference::Auto => high_accuracy
            .filter(|e| e.is_available())
            .or_else(|| fast.filter(|e| e.is_available()))
            .ok_or(SttError::EngineUnavailable),
    }
}

#[cfg(test)]
pub mod test_double {
    use super::*;

    pub struct NullSttEngine {
        pub kind: EngineKind,
        pub available: bool,
        pub segments: Vec<TranscriptSegment>,
        pub language: LanguageGuess,
    }

    #[async_trait]
    impl SttEngine for NullSttEngine {
        fn kind(&self) -> EngineKind {
            self.kind
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn transcribe(
            &self,
            _audio_path: &str,
            _window: Option<(f64, f64)>,
            _language_hint: Option<&str>,
        ) -> SttResult<Vec<TranscriptSegment>> {
            Ok(self.segments.clone())
        }

        async fn detect_language(&self, _audio_path: &str, _window: (f64, f64)) -> SttResult<LanguageGuess> {
            Ok(self.language.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_double::NullSttEngine;
    use super::*;

    fn engine(kind: EngineKind, available: bool) -> NullSttEngine {
        NullSttEngine {
            kind,
            available,
            segments: vec![],
            language: LanguageGuess { language: "en".into(), confidence: 1.0 },
        }
    }

    #[test]
    fn auto_prefers_high_accuracy_when_available() {
        let high = engine(EngineKind::HighAccuracy, true);
        let fast = engine(EngineKind::Fast, true);
        let selected = select_engine(EnginePreference::Auto, Some(&high), Some(&fast)).unwrap();
        assert_eq!(selected.kind(), EngineKind::HighAccuracy);
    }

    #[test]
    fn auto_falls_back_to_fast_when_high_accuracy_absent() {
        let fast = engine(EngineKind::Fast, true);
        let selected = select_engine(EnginePreference::Auto, None, Some(&fast)).unwrap();
        assert_eq!(selected.kind(), EngineKind::Fast);
    }

    #[test]
    fn high_accuracy_only_fails_without_engine() {
        let fast = engine(EngineKind::Fast, true);
        let result = select_engine(EnginePreference::HighAccuracyOnly, None, Some(&fast));
        assert!(result.is_err());
    }
}
