//! Produces scene segments, total duration, and an optional audio sidecar
//! from a single (or, on audio-stream failure, retried) subprocess call.

use tracing::warn;

use crate::bridge::{self, RunOutput};
use crate::error::{MediaError, MediaResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone)]
pub struct SceneDetectionResult {
    pub segments: Vec<Segment>,
    pub duration: f64,
    pub audio_extracted: bool,
}

#[derive(Debug, Clone)]
pub struct SceneDetectorConfig {
    pub scene_threshold: f64,
    pub min_segment_duration: f64,
    pub max_segment_duration: f64,
    pub padding_interval: f64,
    pub sample_fps: f64,
    pub timeout_secs: u64,
    pub ffmpeg_path: String,
}

impl Default for SceneDetectorConfig {
    fn default() -> Self {
        Self {
            scene_threshold: 0.3,
            min_segment_duration: 2.0,
            max_segment_duration: 30.0,
            padding_interval: 15.0,
            sample_fps: 5.0,
            timeout_secs: bridge::DEFAULT_TIMEOUT_SECS,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

pub struct SceneDetector {
    config: SceneDetectorConfig,
}

impl SceneDetector {
    pub fn new(config: SceneDetectorConfig) -> Self {
        Self { config }
    }

    pub async fn detect(
        &self,
        input_path: &str,
        audio_output_path: Option<&str>,
    ) -> MediaResult<SceneDetectionResult> {
        match self.run_combined(input_path, audio_output_path).await {
            Ok(result) => Ok(result),
            Err(MediaError::ProcessExitedWithError { stderr_tail, .. })
                if bridge::is_missing_audio_stream_error(&stderr_tail) =>
            {
                warn!("no audio stream in {input_path}, retrying scene-only");
                let mut result = self.run_combined(input_path, None).await?;
                result.audio_extracted = false;
                Ok(result)
            }
            Err(e) => Err(e),
        }
    }

    async fn run_combined(
        &self,
        input_path: &str,
        audio_output_path: Option<&str>,
    ) -> MediaResult<SceneDetectionResult> {
        let args = self.build_args(input_path, audio_output_path);
        let output = bridge::run(&self.config.ffmpeg_path, &args, Some(self.config.timeout_secs)).await?;

        if output.exit_code != 0 {
            return Err(MediaError::process_exited(output.exit_code, &output.stderr));
        }

        let duration = bridge::extract_duration_from_log(&output.stderr)
            .ok_or_else(|| MediaError::output_parsing_failed("no duration line in ffmpeg log"))?;

        let candidates = parse_scene_timestamps(&output.stderr);
        let denoised = denoise(&candidates, self.config.min_segment_duration);
        let segments = materialize_segments(&denoised, duration);
        let merged = merge_short_segments(segments, self.config.min_segment_duration);
        let split = split_long_segments(
            merged,
            self.config.max_segment_duration,
            self.config.padding_interval,
        );

        Ok(SceneDetectionResult {
            segments: split,
            duration,
            audio_extracted: audio_output_path.is_some(),
        })
    }

    fn build_args(&self, input_path: &str, audio_output_path: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "-hwaccel".to_string(),
            "auto".to_string(),
            "-i".to_string(),
            input_path.to_string(),
            "-filter_complex".to_string(),
            format!(
                "[0:v]fps={},select='gt(scene,{})',showinfo[scenes]",
                self.config.sample_fps, self.config.scene_threshold
            ),
            "-map".to_string(),
            "[scenes]".to_string(),
            "-f".to_string(),
            "null".to_string(),
        ];
        if let Some(audio_out) = audio_output_path {
            args.push("-map".to_string());
            args.push("0:a".to_string());
            args.push("-ar".to_string());
            args.push("16000".to_string());
            args.push("-ac".to_string());
            args.push("1".to_string());
            args.push(audio_out.to_string());
        }
        args.push("-".to_string());
        args
    }

    pub async fn probe_duration_only(&self, input_path: &str) -> MediaResult<f64> {
        let args = vec!["-i".to_string(), input_path.to_string(), "-f".to_string(), "null".to_string(), "-".to_string()];
        let output: RunOutput = bridge::run(&self.config.ffmpeg_path, &args, Some(self.config.timeout_secs)).await?;
        bridge::extract_duration_from_log(&output.stderr)
            .ok_or_else(|| MediaError::output_parsing_failed("no duration line in ffmpeg log"))
    }
}

fn parse_scene_timestamps(stderr: &str) -> Vec<f64> {
    let re = regex::Regex::new(r"pts_time:(\d+(?:\.\d+)?)").expect("valid regex");
    let mut out: Vec<f64> = re
        .captures_iter(stderr)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap());
    out.dedup();
    out
}

/// Drops any candidate closer than `min_segment_duration` to the previously
/// kept candidate (spec §4.2 step 5).
fn denoise(candidates: &[f64], min_segment_duration: f64) -> Vec<f64> {
    let mut kept: Vec<f64> = Vec::new();
    for &c in candidates {
        match kept.last() {
            Some(&prev) if c - prev < min_segment_duration => continue,
            _ => kept.push(c),
        }
    }
    kept
}

/// Builds half-open segments from denoised cut points and total duration
/// (spec §4.2 step 6). Empty cut list yields a single segment.
fn materialize_segments(cuts: &[f64], duration: f64) -> Vec<Segment> {
    if cuts.is_empty() {
        return vec![Segment { start: 0.0, end: duration }];
    }

    let mut segments = Vec::new();
    if cuts[0] > 0.01 {
        segments.push(Segment { start: 0.0, end: cuts[0] });
    }
    for pair in cuts.windows(2) {
        segments.push(Segment { start: pair[0], end: pair[1] });
    }
    let last = *cuts.last().unwrap();
    if duration - last > 0.01 {
        segments.push(Segment { start: last, end: duration });
    }
    segments
}

/// Merges segments shorter than `min_segment_duration` into their
/// successor (spec §4.2 step 7).
fn merge_short_segments(segments: Vec<Segment>, min_segment_duration: f64) -> Vec<Segment> {
    let mut result: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut pending: Option<Segment> = None;

    for seg in segments {
        let candidate = match pending.take() {
            Some(p) => Segment { start: p.start, end: seg.end },
            None => seg,
        };
        if candidate.duration() < min_segment_duration {
            pending = Some(candidate);
        } else {
            result.push(candidate);
        }
    }
    // No successor to merge the trailing short segment into; keep it as-is
    // rather than drop it.
    if let Some(p) = pending {
        result.push(p);
    }
    result
}

/// Splits segments longer than `max_segment_duration` into
/// `padding_interval`-sized chunks, absorbing a small tail remainder into
/// the previous chunk (spec §4.2 step 8).
fn split_long_segments(segments: Vec<Segment>, max_segment_duration: f64, padding_interval: f64) -> Vec<Segment> {
    let mut out = Vec::new();
    for seg in segments {
        if seg.duration() <= max_segment_duration {
            out.push(seg);
            continue;
        }
        let mut cursor = seg.start;
        let mut chunks: Vec<Segment> = Vec::new();
        while seg.end - cursor > padding_interval {
            chunks.push(Segment { start: cursor, end: cursor + padding_interval });
            cursor += padding_interval;
        }
        let remainder = seg.end - cursor;
        if remainder < 0.5 * padding_interval && !chunks.is_empty() {
            chunks.last_mut().unwrap().end = seg.end;
        } else {
            chunks.push(Segment { start: cursor, end: seg.end });
        }
        out.extend(chunks);
    }
    out
}
