//! Three-tier language identification (spec §4.4).

use futures::future::join_all;
use tracing::debug;
use videx_media::silence_probe::SilenceProbe;

use crate::engine::SttEngine;
use crate::error::SttResult;

const SPEECH_PROBE_CANDIDATES: &[&str] = &["en", "ja", "zh", "ko", "fr", "de", "es"];
const CJK_LANGUAGES: &[&str] = &["ja", "zh", "ko"];

#[derive(Debug, Clone, PartialEq)]
pub enum LidOutcome {
    Detected(String),
    /// Full silence; STT should be skipped entirely for this video.
    SilentSkip,
}

/// Tier 1: multi-sample voting across 2-3 scene-aware audio windows
/// (skipping scene 0, a likely slate), each window capped at `max_window`
/// seconds; winner is majority vote, ties broken by max mean confidence.
pub async fn vote_across_windows(
    engine: &dyn SttEngine,
    audio_path: &str,
    scene_starts: &[f64],
    max_window: f64,
) -> SttResult<Option<LidOutcome>> {
    let candidate_starts: Vec<f64> = scene_starts.iter().copied().skip(1).take(3).collect();
    if candidate_starts.is_empty() {
        return Ok(None);
    }

    let mut votes: Vec<(String, f64)> = Vec::new();
    for start in candidate_starts {
        let window = (start, start + max_window);
        let guess = engine.detect_language(audio_path, window).await?;
        votes.push((guess.language, guess.confidence));
    }

    Ok(Some(LidOutcome::Detected(majority_with_confidence_tiebreak(&votes))))
}

fn majority_with_confidence_tiebreak(votes: &[(String, f64)]) -> String {
    use std::collections::HashMap;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut confidence_sum: HashMap<&str, f64> = HashMap::new();
    for (lang, conf) in votes {
        *counts.entry(lang.as_str()).or_insert(0) += 1;
        *confidence_sum.entry(lang.as_str()).or_insert(0.0) += conf;
    }
    let max_count = *counts.values().max().unwrap_or(&0);
    counts
        .iter()
        .filter(|(_, &c)| c == max_count)
        .max_by(|a, b| {
            let mean_a = confidence_sum[a.0] / *a.1 as f64;
            let mean_b = confidence_sum[b.0] / *b.1 as f64;
            mean_a.partial_cmp(&mean_b).unwrap()
        })
        .map(|(lang, _)| lang.to_string())
        .unwrap_or_else(|| votes[0].0.clone())
}

/// Tier 2: speech-probe fallback when the high-accuracy engine is absent.
/// Locates the first voiced region, extracts a 15s window, transcribes it
/// under each fixed candidate language concurrently, and scores with a
/// script-aware heuristic so CJK isn't drowned out by English's higher raw
/// character count.
pub async fn speech_probe_fallback(
    engine: &dyn SttEngine,
    silence_probe: &SilenceProbe,
    audio_path: &str,
) -> SttResult<LidOutcome> {
    let Some(voiced_offset) = silence_probe.first_voiced_offset(audio_path).await? else {
        return Ok(LidOutcome::SilentSkip);
    };

    let window = (voiced_offset, voiced_offset + 15.0);
    let probes = SPEECH_PROBE_CANDIDATES
        .iter()
        .map(|&lang| async move {
            let segments = engine.transcribe(audio_path, Some(window), Some(lang)).await?;
            let text: String = segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
            SttResult::Ok((lang, script_aware_score(lang, &text)))
        });
    let scored: Vec<(&str, f64)> = join_all(probes).await.into_iter().collect::<SttResult<Vec<_>>>()?;

    let best = scored
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(lang, _)| lang.to_string())
        .expect("candidate list is non-empty");

    debug!(lang = %best, "speech-probe LID selected");
    Ok(LidOutcome::Detected(best))
}

/// CJK languages score by non-whitespace character count; space-delimited
/// languages score by whitespace-separated token count.
fn script_aware_score(lang: &str, text: &str) -> f64 {
    if CJK_LANGUAGES.contains(&lang) {
        text.chars().filter(|c| !c.is_whitespace()).count() as f64
    } else {
        text.split_whitespace().count() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_vote_picks_plurality_language() {
        let votes = vec![
            ("en".to_string(), 0.9),
            ("en".to_string(), 0.8),
            ("fr".to_string(), 0.95),
        ];
        assert_eq!(majority_with_confidence_tiebreak(&votes), "en");
    }

    #[test]
    fn tie_broken_by_mean_confidence() {
        let votes = vec![("en".to_string(), 0.5), ("fr".to_string(), 0.9)];
        assert_eq!(majority_with_confidence_tiebreak(&votes), "fr");
    }

    #[test]
    fn cjk_scored_by_character_count_not_token_count() {
        let score = script_aware_score("ja", "\u{3053}\u{3093}\u{306b}\u{3061}\u{306f}");
        assert_eq!(score, 5.0);
    }

    #[test]
    fn english_scored_by_token_count_not_character_count() {
        let score = script_aware_score("en", "hello there friend");
        assert_eq!(score, 3.0);
    }

    #[test]
    fn script_aware_scoring_prevents_english_dominance() {
        // Equal-length strings in char count, but English token count is
        // far lower than its character count would otherwise suggest.
        let english = script_aware_score("en", "the quick brown fox jumps");
        let japanese = script_aware_score("ja", "\u{65e9}\u{3044}\u{8336}\u{8272}\u{306e}\u{72d0}");
        assert!(japanese > english);
    }
}
