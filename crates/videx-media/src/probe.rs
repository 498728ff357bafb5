//! ffprobe-based metadata probing, used as an alternate duration source to
//! the scene detector's log parsing (layer 0 can use either).

use serde::Deserialize;

use crate::bridge::{self, DEFAULT_TIMEOUT_SECS};
use crate::error::{MediaError, MediaResult};

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub duration_secs: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

pub async fn probe_video(ffprobe_path: &str, input_path: &str) -> MediaResult<VideoInfo> {
    if !tokio::fs::try_exists(input_path).await.unwrap_or(false) {
        return Err(MediaError::InputFileNotFound(input_path.into()));
    }

    let args = vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        input_path.to_string(),
    ];
    let output = bridge::run(ffprobe_path, &args, Some(DEFAULT_TIMEOUT_SECS)).await?;
    if output.exit_code != 0 {
        return Err(MediaError::process_exited(output.exit_code, &output.stderr));
    }

    let parsed: FfprobeOutput = serde_json::from_str(&output.stdout)
        .map_err(|e| MediaError::output_parsing_failed(format!("invalid ffprobe json: {e}")))?;

    let duration_secs: f64 = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse().ok())
        .ok_or_else(|| MediaError::output_parsing_failed("no duration field in ffprobe output"))?;

    let video_stream = parsed.streams.iter().find(|s| s.codec_type == "video");
    let has_audio = parsed.streams.iter().any(|s| s.codec_type == "audio");

    Ok(VideoInfo {
        duration_secs,
        width: video_stream.and_then(|s| s.width),
        height: video_stream.and_then(|s| s.height),
        has_audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_json_shape() {
        let json = r#"{
            "format": {"duration": "25.040000"},
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080},
                {"codec_type": "audio"}
            ]
        }"#;
        let parsed: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.format.duration.as_deref(), Some("25.040000"));
        assert!(parsed.streams.iter().any(|s| s.codec_type == "audio"));
    }
}
