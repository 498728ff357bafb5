//! Locates the first voiced region of an audio file via ffmpeg's
//! `silencedetect` filter, used by the STT speech-probe language-ID
//! fallback (spec §4.4 step 2) and by the "full silence" boundary check
//! (spec §8).

use crate::bridge::{self, DEFAULT_TIMEOUT_SECS};
use crate::error::MediaResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceWindow {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone)]
pub struct SilenceProbeConfig {
    pub ffmpeg_path: String,
    pub scan_window_secs: f64,
    pub noise_threshold_db: f64,
    pub min_silence_secs: f64,
    pub timeout_secs: u64,
}

impl Default for SilenceProbeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            scan_window_secs: 120.0,
            noise_threshold_db: -30.0,
            min_silence_secs: 1.0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub struct SilenceProbe {
    config: SilenceProbeConfig,
}

impl SilenceProbe {
    pub fn new(config: SilenceProbeConfig) -> Self {
        Self { config }
    }

    /// Returns the offset, in seconds, of the first voiced region within
    /// the first `scan_window_secs` of `audio_path`, or `None` if the
    /// entire scanned window is silent.
    pub async fn first_voiced_offset(&self, audio_path: &str) -> MediaResult<Option<f64>> {
        let filter = format!(
            "silencedetect=noise={}dB:d={}",
            self.config.noise_threshold_db, self.config.min_silence_secs
        );
        let args = vec![
            "-t".to_string(),
            self.config.scan_window_secs.to_string(),
            "-i".to_string(),
            audio_path.to_string(),
            "-af".to_string(),
            filter,
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ];
        let output = bridge::run(&self.config.ffmpeg_path, &args, Some(self.config.timeout_secs)).await?;
        let silences = parse_silence_periods(&output.stderr);
        Ok(first_voiced_after_silences(&silences, self.config.scan_window_secs))
    }
}

fn parse_silence_periods(stderr: &str) -> Vec<(f64, f64)> {
    let start_re = regex::Regex::new(r"silence_start:\s*(-?\d+(?:\.\d+)?)").expect("valid regex");
    let end_re = regex::Regex::new(r"silence_end:\s*(-?\d+(?:\.\d+)?)").expect("valid regex");

    let starts: Vec<f64> = start_re
        .captures_iter(stderr)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect();
    let ends: Vec<f64> = end_re
        .captures_iter(stderr)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect();

    starts.into_iter().zip(ends).collect()
}

/// Finds the start of the first gap between consecutive silence periods
/// (i.e. a voiced region), treating time before the first silence period
/// as voiced if it starts later than 0. Returns `None` if silence covers
/// the whole scanned window with no gap.
fn first_voiced_after_silences(silences: &[(f64, f64)], scan_window: f64) -> Option<f64> {
    if silences.is_empty() {
        return Some(0.0);
    }
    if silences[0].0 > 0.0 {
        return Some(0.0);
    }
    for window in silences.windows(2) {
        let gap_start = window[0].1;
        let next_start = window[1].0;
        if next_start > gap_start {
            return Some(gap_start);
        }
    }
    let last_end = silences.last().unwrap().1;
    if last_end < scan_window {
        Some(last_end)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_silence_detected_means_voiced_from_start() {
        assert_eq!(first_voiced_after_silences(&[], 120.0), Some(0.0));
    }

    #[test]
    fn silence_covering_entire_window_is_fully_silent() {
        assert_eq!(first_voiced_after_silences(&[(0.0, 120.0)], 120.0), None);
    }

    #[test]
    fn voiced_gap_between_two_silences_is_found() {
        let silences = vec![(0.0, 10.0), (40.0, 120.0)];
        assert_eq!(first_voiced_after_silences(&silences, 120.0), Some(10.0));
    }

    #[test]
    fn voiced_region_after_trailing_silence_end() {
        let silences = vec![(0.0, 5.0)];
        assert_eq!(first_voiced_after_silences(&silences, 120.0), Some(5.0));
    }
}
