//! Extracts representative JPEG frames per scene segment.

use tracing::warn;

use crate::bridge::{self, DEFAULT_TIMEOUT_SECS};
use crate::error::MediaResult;
use crate::scene_detector::Segment;

const SHORT_EDGE_MAX: u32 = 512;
const JPEG_QUALITY: u32 = 80;

#[derive(Debug, Clone)]
pub struct KeyframeExtractorConfig {
    pub ffmpeg_path: String,
    pub timeout_secs: u64,
}

impl Default for KeyframeExtractorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub struct KeyframeExtractor {
    config: KeyframeExtractorConfig,
}

/// Number of frames to extract for a segment of the given duration
/// (spec §4.3): `max(1, min(3, floor(duration/5)))`.
pub fn frame_count_for_duration(duration: f64) -> usize {
    let by_duration = (duration / 5.0).floor() as i64;
    by_duration.clamp(1, 3) as usize
}

/// Equal interior subdivision timestamps within `[start, end)` for `count`
/// frames.
pub fn frame_timestamps(segment: &Segment, count: usize) -> Vec<f64> {
    let span = segment.end - segment.start;
    (1..=count)
        .map(|i| segment.start + span * (i as f64) / (count as f64 + 1.0))
        .collect()
}

impl KeyframeExtractor {
    pub fn new(config: KeyframeExtractorConfig) -> Self {
        Self { config }
    }

    /// Extracts keyframes for one scene into `output_dir`, returning the
    /// paths of the frames that were successfully written. A failed
    /// individual frame is skipped silently (reported via the caller's
    /// progress channel, not fatal to the video).
    pub async fn extract_scene(
        &self,
        input_path: &str,
        segment: &Segment,
        scene_index: usize,
        output_dir: &str,
    ) -> MediaResult<Vec<String>> {
        let count = frame_count_for_duration(segment.duration());
        let timestamps = frame_timestamps(segment, count);
        let mut written = Vec::new();

        for (frame_index, ts) in timestamps.iter().enumerate() {
            let out_path = format!("{output_dir}/scene_{scene_index}/frame_{frame_index}.jpg");
            match self.extract_one(input_path, *ts, &out_path).await {
                Ok(()) => written.push(out_path),
                Err(e) => warn!("keyframe extraction failed for scene {scene_index} frame {frame_index}: {e}"),
            }
        }
        Ok(written)
    }

    async fn extract_one(&self, input_path: &str, timestamp: f64, out_path: &str) -> MediaResult<()> {
        if let Some(parent) = std::path::Path::new(out_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let scale_filter = format!(
            "scale='if(gt(iw,ih),-2,{SHORT_EDGE_MAX})':'if(gt(iw,ih),{SHORT_EDGE_MAX},-2)'"
        );
        let qscale = (31.0 - (JPEG_QUALITY as f64 / 100.0) * 30.0).round().to_string();
        let args = vec![
            "-ss".to_string(),
            format!("{timestamp:.3}"),
            "-i".to_string(),
            input_path.to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-vf".to_string(),
            scale_filter,
            "-qscale:v".to_string(),
            qscale,
            "-y".to_string(),
            out_path.to_string(),
        ];
        let output = bridge::run(&self.config.ffmpeg_path, &args, Some(self.config.timeout_secs)).await?;
        if output.exit_code != 0 {
            return Err(crate::error::MediaError::process_exited(output.exit_code, &output.stderr));
        }
        if !tokio::fs::try_exists(out_path).await.unwrap_or(false) {
            return Err(crate::error::MediaError::OutputFileNotCreated(out_path.into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_clamps_between_one_and_three() {
        assert_eq!(frame_count_for_duration(1.0), 1);
        assert_eq!(frame_count_for_duration(8.0), 1);
        assert_eq!(frame_count_for_duration(10.0), 2);
        assert_eq!(frame_count_for_duration(15.0), 3);
        assert_eq!(frame_count_for_duration(100.0), 3);
    }

    #[test]
    fn frame_timestamps_are_interior_subdivisions() {
        let seg = Segment { start: 0.0, end: 8.0 };
        let ts = frame_timestamps(&seg, 1);
        assert_eq!(ts, vec![4.0]);

        let seg2 = Segment { start: 10.0, end: 30.0 };
        let ts2 = frame_timestamps(&seg2, 2);
        assert!((ts2[0] - 16.666).abs() < 0.01);
        assert!((ts2[1] - 23.333).abs() < 0.01);
    }
}
