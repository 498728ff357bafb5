//! Runs external media tools with a timeout and deadlock-free concurrent
//! stdout/stderr draining.
//!
//! Never call `child.wait()` before both stream readers have been spawned:
//! scene detection emits multi-megabyte `showinfo` logs on stderr, and a
//! single-threaded drain-after-wait deadlocks once the OS pipe buffer
//! (typically 64 KiB) fills while the child is still writing.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program` with `args`, draining stdout and stderr concurrently on
/// background tasks, then waiting for exit. Times out after `timeout_secs`
/// (default `DEFAULT_TIMEOUT_SECS`), killing the child and returning
/// `MediaError::Timeout`.
pub async fn run(program: &str, args: &[String], timeout_secs: Option<u64>) -> MediaResult<RunOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let stdout_task = tokio::spawn(drain_lines(stdout, false));
    let stderr_task = tokio::spawn(drain_lines(stderr, true));

    let wait_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    let run_fut = async {
        let status = child.wait().await?;
        let stdout_lines = stdout_task.await.unwrap_or_default();
        let stderr_lines = stderr_task.await.unwrap_or_default();
        Ok::<_, std::io::Error>((status, stdout_lines, stderr_lines))
    };

    let (status, stdout_lines, stderr_lines) = match timeout(Duration::from_secs(wait_secs), run_fut).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = child.kill().await;
            return Err(MediaError::Timeout(wait_secs));
        }
    };

    let stdout_joined = stdout_lines.join("\n");
    let stderr_joined = stderr_lines.join("\n");
    let exit_code = status.code().unwrap_or(-1);

    Ok(RunOutput {
        exit_code,
        stdout: stdout_joined,
        stderr: stderr_joined,
    })
}

/// Like [`run`], but treats a non-zero exit as a failure unless the caller
/// passes a predicate that accepts the observed stderr (e.g. the
/// documented "always exits non-zero but writes a parsable duration"
/// probe call).
pub async fn run_validated(
    program: &str,
    args: &[String],
    timeout_secs: Option<u64>,
    accept_nonzero: impl Fn(&RunOutput) -> bool,
) -> MediaResult<RunOutput> {
    let output = run(program, args, timeout_secs).await?;
    if output.exit_code == 0 || accept_nonzero(&output) {
        Ok(output)
    } else {
        Err(MediaError::process_exited(output.exit_code, &output.stderr))
    }
}

async fn drain_lines<R: tokio::io::AsyncRead + Unpin>(reader: R, is_stderr: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buf = BufReader::new(reader);
    let mut line = String::new();
    loop {
        line.clear();
        match buf.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if is_stderr {
                    debug!(target: "videx_media::bridge", "{}", trimmed);
                } else {
                    debug!(target: "videx_media::bridge", "{}", trimmed);
                }
                lines.push(trimmed.to_string());
            }
            Err(e) => {
                warn!("error reading subprocess stream: {e}");
                break;
            }
        }
    }
    lines
}

/// Parses a `HH:MM:SS.ss` duration line out of tool stderr (the common
/// progress-log format). Returns `None` if no such line is present.
pub fn extract_duration_from_log(stderr: &str) -> Option<f64> {
    let re = regex::Regex::new(r"Duration:\s*(\d+):(\d+):(\d+(?:\.\d+)?)").ok()?;
    let caps = re.captures(stderr)?;
    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Pure predicate classifying stderr text as a "no audio stream" failure,
/// used by callers to downgrade a failed combined call into a non-fatal
/// scene-only retry.
pub fn is_missing_audio_stream_error(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("stream map '0:a' matches no streams")
        || lower.contains("does not contain any stream")
        || (lower.contains("audio") && lower.contains("not found"))
        || lower.contains("no audio streams")
}

pub async fn check_executable(name: &str) -> MediaResult<()> {
    which::which(name)
        .map(|_| ())
        .map_err(|_| MediaError::ExecutableNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_duration_format() {
        let log = "Input #0, mov,mp4\n  Duration: 00:00:25.04, start: 0.0";
        assert_eq!(extract_duration_from_log(log), Some(25.04));
    }

    #[test]
    fn missing_duration_line_returns_none() {
        assert_eq!(extract_duration_from_log("nothing here"), None);
    }

    #[test]
    fn classifies_missing_audio_stream_variants() {
        assert!(is_missing_audio_stream_error(
            "Stream map '0:a' matches no streams."
        ));
        assert!(is_missing_audio_stream_error(
            "Output file #0 does not contain any stream"
        ));
        assert!(!is_missing_audio_stream_error("unrelated ffmpeg error"));
    }

    #[tokio::test]
    async fn run_captures_stdout_and_exit_code() {
        let output = run("true", &[], Some(5)).await.unwrap();
        assert_eq!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn run_times_out_and_kills_child() {
        let args = vec!["5".to_string()];
        let result = run("sleep", &args, Some(0)).await;
        assert!(matches!(result, Err(MediaError::Timeout(_))));
    }
}
