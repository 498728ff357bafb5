//! SRT emission with primary/fallback write paths and a visibility xattr
//! (spec §4.4, §6).

use std::path::{Path, PathBuf};

use tracing::warn;
use videx_media::content_hash::djb2_hex;

use crate::engine::TranscriptSegment;
use crate::error::{SttError, SttResult};

const VISIBILITY_XATTR: &str = "user.videx.subtitle_hidden";

#[derive(Debug, Clone)]
pub struct SubtitleWriteResult {
    pub path: PathBuf,
    pub used_fallback: bool,
}

/// Serializes segments to SRT text. Timestamps are clamped to zero and
/// formatted `HH:MM:SS,mmm`.
pub fn render_srt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(seg.start_time),
            format_timestamp(seg.end_time)
        ));
        out.push_str(&seg.text);
        out.push_str("\n\n");
    }
    out
}

fn format_timestamp(seconds: f64) -> String {
    let clamped = seconds.max(0.0);
    let total_ms = (clamped * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let total_mins = total_secs / 60;
    let m = total_mins % 60;
    let h = total_mins / 60;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Writes the SRT alongside the source video at `primary_path`. On write
/// failure, falls back to an app-scoped directory, naming the file by the
/// djb2 hash of `video_path` so collisions across folders are avoided, and
/// marks the fallback copy hidden via an extended attribute so indexing
/// tools don't surface it as a user-visible sidecar.
pub async fn write_subtitle(
    video_path: &str,
    primary_path: &Path,
    fallback_dir: &Path,
    srt_text: &str,
) -> SttResult<SubtitleWriteResult> {
    if let Some(parent) = primary_path.parent() {
        if tokio::fs::create_dir_all(parent).await.is_ok()
            && tokio::fs::write(primary_path, srt_text).await.is_ok()
        {
            return Ok(SubtitleWriteResult { path: primary_path.to_path_buf(), used_fallback: false });
        }
    }

    tokio::fs::create_dir_all(fallback_dir)
        .await
        .map_err(|e| SttError::SubtitleWriteFailed(e.to_string()))?;
    let fallback_name = format!("{}.srt", djb2_hex(video_path));
    let fallback_path = fallback_dir.join(fallback_name);
    tokio::fs::write(&fallback_path, srt_text)
        .await
        .map_err(|e| SttError::SubtitleWriteFailed(e.to_string()))?;

    mark_hidden(&fallback_path);
    Ok(SubtitleWriteResult { path: fallback_path, used_fallback: true })
}

fn mark_hidden(path: &Path) {
    if let Err(e) = xattr::set(path, VISIBILITY_XATTR, b"1") {
        warn!(error = %e, path = %path.display(), "failed to set subtitle visibility xattr");
    }
}

/// Parses SRT text back into segments, used by round-trip tests.
pub fn parse_srt(text: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let blocks = text.split("\n\n").filter(|b| !b.trim().is_empty());

    for block in blocks {
        let mut lines = block.lines();
        let Some(index_line) = lines.next() else { continue };
        let Ok(index) = index_line.trim().parse::<usize>() else { continue };
        let Some(time_line) = lines.next() else { continue };
        let Some((start_str, end_str)) = time_line.split_once(" --> ") else { continue };
        let (Some(start_time), Some(end_time)) = (parse_timestamp(start_str), parse_timestamp(end_str)) else {
            continue;
        };
        let text: String = lines.collect::<Vec<_>>().join("\n");
        segments.push(TranscriptSegment { index: index - 1, start_time, end_time, text });
    }

    segments
}

fn parse_timestamp(s: &str) -> Option<f64> {
    let s = s.trim();
    let (hms, ms) = s.split_once(',')?;
    let mut parts = hms.split(':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let sec: f64 = parts.next()?.parse().ok()?;
    let ms: f64 = ms.parse().ok()?;
    Some(h * 3600.0 + m * 60.0 + sec + ms / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: usize, start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment { index, start_time: start, end_time: end, text: text.to_string() }
    }

    #[test]
    fn formats_timestamp_with_comma_millis() {
        assert_eq!(format_timestamp(3661.5), "01:01:01,500");
    }

    #[test]
    fn negative_timestamp_clamps_to_zero() {
        assert_eq!(format_timestamp(-1.0), "00:00:00,000");
    }

    #[test]
    fn srt_round_trips_through_render_and_parse() {
        let segments = vec![seg(0, 0.0, 1.5, "hello there"), seg(1, 1.5, 3.2, "second line")];
        let rendered = render_srt(&segments);
        let parsed = parse_srt(&rendered);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].text, "hello there");
        assert!((parsed[1].end_time - 3.2).abs() < 0.001);
    }

    #[tokio::test]
    async fn primary_write_succeeds_when_directory_is_writable() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("video.srt");
        let fallback_dir = dir.path().join("fallback");
        let result = write_subtitle("/vol/video.mp4", &primary, &fallback_dir, "1\n00:00:00,000 --> 00:00:01,000\nhi\n\n")
            .await
            .unwrap();
        assert!(!result.used_fallback);
        assert_eq!(result.path, primary);
    }

    #[tokio::test]
    async fn fallback_write_used_when_primary_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocking_file = dir.path().join("not_a_dir");
        tokio::fs::write(&blocking_file, b"x").await.unwrap();
        let primary = blocking_file.join("video.srt");
        let fallback_dir = dir.path().join("fallback");
        let result = write_subtitle("/vol/video.mp4", &primary, &fallback_dir, "1\n00:00:00,000 --> 00:00:01,000\nhi\n\n")
            .await
            .unwrap();
        assert!(result.used_fallback);
        assert!(result.path.starts_with(&fallback_dir));
    }
}
