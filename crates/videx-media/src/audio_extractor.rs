//! Produces a 16 kHz mono WAV sidecar from a video, used when layer-1's
//! combined scene-detector call didn't already emit one (e.g. a fresh STT
//! request reusing a cached layer-0 video).

use crate::bridge::{self, DEFAULT_TIMEOUT_SECS};
use crate::error::{MediaError, MediaResult};

#[derive(Debug, Clone)]
pub struct AudioExtractorConfig {
    pub ffmpeg_path: String,
    pub timeout_secs: u64,
}

impl Default for AudioExtractorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub struct AudioExtractor {
    config: AudioExtractorConfig,
}

impl AudioExtractor {
    pub fn new(config: AudioExtractorConfig) -> Self {
        Self { config }
    }

    pub async fn extract(&self, input_path: &str, output_wav_path: &str) -> MediaResult<()> {
        if let Some(parent) = std::path::Path::new(output_wav_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let args = vec![
            "-i".to_string(),
            input_path.to_string(),
            "-vn".to_string(),
            "-ar".to_string(),
            "16000".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-y".to_string(),
            output_wav_path.to_string(),
        ];
        let output = bridge::run(&self.config.ffmpeg_path, &args, Some(self.config.timeout_secs)).await?;

        if output.exit_code != 0 {
            return Err(MediaError::process_exited(output.exit_code, &output.stderr));
        }
        if !tokio::fs::try_exists(output_wav_path).await.unwrap_or(false) {
            return Err(MediaError::OutputFileNotCreated(output_wav_path.into()));
        }
        Ok(())
    }
}
