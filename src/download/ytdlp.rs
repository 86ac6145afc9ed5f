//! yt-dlp backend for [`MediaExtractor`].
//!
//! The binary is driven through `tokio::process`: probes use
//! `--dump-single-json`, fetches stream `--newline` progress from stdout.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::core::config;
use crate::core::error::AppError;
use crate::download::error::DownloadError;
use crate::download::extractor::{FetchRequest, MediaExtractor, MediaMetadata, MediaRequest};
use crate::download::progress::{parse_progress, ProgressInfo};

/// Number of trailing stderr bytes kept for error messages
const STDERR_TAIL: usize = 600;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    creator: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    track: Option<String>,
}

impl From<ProbeOutput> for MediaMetadata {
    fn from(raw: ProbeOutput) -> Self {
        MediaMetadata {
            title: raw.title,
            artist: raw.artist.or(raw.creator).or(raw.uploader),
            track: raw.track,
        }
    }
}

/// Parses the JSON printed by `yt-dlp --dump-single-json`.
pub(crate) fn parse_probe_json(raw: &str) -> Result<MediaMetadata, AppError> {
    let parsed: ProbeOutput = serde_json::from_str(raw)
        .map_err(|e| DownloadError::YtDlp(format!("unparsable yt-dlp metadata: {}", e)))?;
    Ok(parsed.into())
}

/// Extractor backed by the yt-dlp binary
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    bin: String,
    probe_timeout: Duration,
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new(config::YTDL_BIN.clone(), config::download::probe_timeout())
    }
}

impl YtDlpExtractor {
    pub fn new(bin: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            probe_timeout,
        }
    }

    fn probe_args(url: &str) -> Vec<String> {
        vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificate".to_string(),
            url.to_string(),
        ]
    }

    pub(crate) fn fetch_args(request: &FetchRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "--no-check-certificate".to_string(),
            "--format".to_string(),
            request.media.format_selector(),
            "--output".to_string(),
            request.output_template(),
        ];
        match request.media {
            MediaRequest::Audio => args.extend(
                [
                    "--extract-audio",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    config::download::AUDIO_BITRATE,
                ]
                .map(String::from),
            ),
            MediaRequest::Video(_) => args.extend(["--merge-output-format", "mp4"].map(String::from)),
        }
        args.push(request.url.clone());
        args
    }
}

/// Finds the file yt-dlp produced for `stem`, preferring `preferred_ext`.
///
/// Partial and temporary files are skipped.
pub(crate) fn find_output_file(stem: &Path, preferred_ext: &str) -> Result<PathBuf, DownloadError> {
    let dir = stem.parent().unwrap_or_else(|| Path::new("."));
    let prefix = stem
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| format!("{}.", s))
        .ok_or_else(|| DownloadError::FileNotFound(format!("bad output stem: {}", stem.display())))?;

    let expected = dir.join(format!("{}{}", prefix, preferred_ext));
    if expected.exists() {
        return Ok(expected);
    }

    let mut candidates: Vec<PathBuf> = fs_err::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| {
                    name.starts_with(&prefix)
                        && !name.ends_with(".part")
                        && !name.ends_with(".ytdl")
                        && !name.contains(".temp")
                })
        })
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| DownloadError::FileNotFound(format!("no output file for {}", stem.display())))
}

fn tail(text: &str) -> &str {
    let text = text.trim();
    let mut start = text.len().saturating_sub(STDERR_TAIL);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<MediaMetadata, AppError> {
        let args = Self::probe_args(url);
        log::debug!("yt-dlp probe command: {} {}", self.bin, args.join(" "));

        let mut command = TokioCommand::new(&self.bin);
        command.args(&args).stdin(Stdio::null()).kill_on_drop(true);

        let output = timeout(self.probe_timeout, command.output())
            .await
            .map_err(|_| {
                log::error!("yt-dlp probe timed out after {}s", self.probe_timeout.as_secs());
                DownloadError::Timeout(format!("metadata probe timed out for {}", url))
            })?
            .map_err(|e| {
                log::error!("Failed to execute {}: {}", self.bin, e);
                DownloadError::YtDlp(format!("failed to run {}: {}", self.bin, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::YtDlp(format!("probe failed: {}", tail(&stderr))).into());
        }
        parse_probe_json(&String::from_utf8_lossy(&output.stdout))
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress_tx: mpsc::UnboundedSender<ProgressInfo>,
    ) -> Result<PathBuf, AppError> {
        let args = Self::fetch_args(request);
        log::debug!("yt-dlp fetch command: {} {}", self.bin, args.join(" "));

        let mut child = TokioCommand::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::YtDlp(format!("failed to run {}: {}", self.bin, e)))?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(info) = parse_progress(&line) {
                    // Receiver gone means the job was abandoned; keep draining stdout.
                    let _ = progress_tx.send(info);
                }
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        if !status.success() {
            log::error!("yt-dlp exited with {}: {}", status, tail(&stderr));
            return Err(DownloadError::YtDlp(format!("yt-dlp exited with {}: {}", status, tail(&stderr))).into());
        }

        let ext = match request.media {
            MediaRequest::Audio => "mp3",
            MediaRequest::Video(_) => "mp4",
        };
        Ok(find_output_file(&request.output_stem, ext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::extractor::VideoQuality;

    #[test]
    fn test_fetch_args_audio() {
        let request = FetchRequest {
            url: "https://youtu.be/x".into(),
            media: MediaRequest::Audio,
            output_stem: PathBuf::from("downloads/job"),
        };
        let args = YtDlpExtractor::fetch_args(&request);
        assert!(args.windows(2).any(|w| w == ["--format", "bestaudio/best"]));
        assert!(args.windows(2).any(|w| w == ["--audio-quality", "192K"]));
        assert!(args.windows(2).any(|w| w == ["--output", "downloads/job.%(ext)s"]));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/x"));
    }

    #[test]
    fn test_fetch_args_video_merges_mp4() {
        let request = FetchRequest {
            url: "https://youtu.be/x".into(),
            media: MediaRequest::Video(VideoQuality::P360),
            output_stem: PathBuf::from("job"),
        };
        let args = YtDlpExtractor::fetch_args(&request);
        assert!(args
            .windows(2)
            .any(|w| w == ["--format", "bestvideo[height<=360]+bestaudio/best/best"]));
        assert!(args.windows(2).any(|w| w == ["--merge-output-format", "mp4"]));
        assert!(!args.iter().any(|a| a == "--extract-audio"));
    }

    #[test]
    fn test_parse_probe_json_artist_fallback() {
        let meta = parse_probe_json(r#"{"title":"Song","uploader":"Chan","track":null}"#).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Song"));
        assert_eq!(meta.artist.as_deref(), Some("Chan"));
        assert!(parse_probe_json("not json").is_err());
    }

    #[test]
    fn test_find_output_file_skips_partials() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("abc");
        fs_err::write(dir.path().join("abc.webm.part"), b"x").unwrap();
        fs_err::write(dir.path().join("abcdef.mp3"), b"x").unwrap();
        assert!(find_output_file(&stem, "mp3").is_err());

        fs_err::write(dir.path().join("abc.mkv"), b"x").unwrap();
        assert_eq!(find_output_file(&stem, "mp4").unwrap(), dir.path().join("abc.mkv"));

        fs_err::write(dir.path().join("abc.mp4"), b"x").unwrap();
        assert_eq!(find_output_file(&stem, "mp4").unwrap(), dir.path().join("abc.mp4"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timed_out_metadata_read_kills_the_process() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let bin = dir.path().join("slow-ytdlp");
        fs_err::write(&bin, format!("#!/bin/sh\necho $$ > {}\nexec sleep 30\n", pid_file.display())).unwrap();
        fs_err::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let extractor = YtDlpExtractor::new(bin.display().to_string(), Duration::from_millis(500));
        let err = extractor.probe("https://youtu.be/x").await.unwrap_err();
        assert!(matches!(err, AppError::Download(DownloadError::Timeout(_))));

        let pid = fs_err::read_to_string(&pid_file).unwrap().trim().to_string();
        let stat = format!("/proc/{}/stat", pid);
        let mut gone = false;
        for _ in 0..40 {
            // a killed but unreaped child shows up as a zombie
            gone = match std::fs::read_to_string(&stat) {
                Ok(line) => line.rsplit(')').next().is_some_and(|rest| rest.trim_start().starts_with('Z')),
                Err(_) => true,
            };
            if gone {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(gone, "yt-dlp process {} still running", pid);
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        let long = "ж".repeat(STDERR_TAIL);
        assert!(tail(&long).len() <= STDERR_TAIL);
    }
}
