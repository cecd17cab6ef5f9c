use std::path::{Path, PathBuf};

use tokio::{fs, process::Command};

use crate::{
    cache::{get_concat_list_path, get_silence_path},
    error::{HeroldError, Result},
};

/// Range a single `atempo` stage accepts.
pub const MIN_TEMPO_STAGE: f64 = 0.5;
pub const MAX_TEMPO_STAGE: f64 = 2.0;
const TEMPO_EPSILON: f64 = 0.001;

fn tool_failed(tool: &str, path: &Path, reason: impl Into<String>) -> HeroldError {
    HeroldError::ToolFailed {
        tool: tool.to_string(),
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn spawn_failed(tool: &str, path: &Path, e: std::io::Error) -> HeroldError {
    tool_failed(tool, path, format!("{e}. Install ffmpeg (provides {tool})."))
}

/// Parse the duration ffprobe printed for `path`
pub fn parse_duration(path: &Path, stdout: &str) -> Result<f64> {
    let value = stdout.trim();
    match value.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => Ok(seconds),
        _ => Err(HeroldError::InvalidDuration {
            path: path.to_path_buf(),
            value: value.to_string(),
        }),
    }
}

/// Measure an audio file's duration in seconds with ffprobe
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path)
        .output()
        .await
        .map_err(|e| spawn_failed("ffprobe", path, e))?;

    if !output.status.success() {
        return Err(tool_failed(
            "ffprobe",
            path,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let seconds = parse_duration(path, &String::from_utf8_lossy(&output.stdout))?;
    tracing::debug!(path = %path.display(), seconds, "probed duration");
    Ok(seconds)
}

/// Split a tempo factor into `atempo` stages that each stay within [0.5, 2.0].
///
/// The product of the returned stages equals `factor`. A factor close enough
/// to 1.0 yields a single no-op stage.
pub fn build_tempo_filter_chain(factor: f64) -> Result<Vec<f64>> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(HeroldError::InvalidTempoFactor(factor));
    }

    let mut stages = Vec::new();
    let mut remaining = factor;

    while remaining > MAX_TEMPO_STAGE {
        stages.push(MAX_TEMPO_STAGE);
        remaining /= MAX_TEMPO_STAGE;
    }

    while remaining < MIN_TEMPO_STAGE {
        stages.push(MIN_TEMPO_STAGE);
        remaining /= MIN_TEMPO_STAGE;
    }

    if (remaining - 1.0).abs() > TEMPO_EPSILON {
        stages.push(remaining);
    }

    if stages.is_empty() {
        stages.push(1.0);
    }

    Ok(stages)
}

/// Render tempo stages as an ffmpeg audio filter expression
pub fn tempo_filter_expression(stages: &[f64]) -> String {
    stages
        .iter()
        .map(|stage| {
            if stage.fract() == 0.0 {
                format!("atempo={}", stage)
            } else {
                format!("atempo={:.6}", stage)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the concat demuxer list, optionally interleaving a silence clip between segments
pub fn build_concat_list(filenames: &[String], silence: Option<&str>) -> String {
    let mut lines = Vec::new();
    for (i, filename) in filenames.iter().enumerate() {
        lines.push(format!("file '{}'", filename.replace('\'', "'\\''")));
        if let Some(silence) = silence
            && i + 1 < filenames.len()
        {
            lines.push(format!("file '{}'", silence));
        }
    }
    format!("{}\n", lines.join("\n"))
}

/// Generate a silence clip once and reuse it on later runs
pub async fn ensure_silence_clip(
    audio_dir: &Path,
    seconds: f64,
    sample_rate: u32,
) -> Result<PathBuf> {
    let silence_path = get_silence_path(audio_dir, seconds);
    if silence_path.exists() {
        return Ok(silence_path);
    }

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-f")
        .arg("lavfi")
        .arg("-i")
        .arg(format!("anullsrc=r={}:cl=mono", sample_rate))
        .arg("-t")
        .arg(format!("{:.3}", seconds))
        .arg("-c:a")
        .arg("libmp3lame")
        .arg("-q:a")
        .arg("9")
        .arg(&silence_path)
        .output()
        .await
        .map_err(|e| spawn_failed("ffmpeg", &silence_path, e))?;

    if !output.status.success() {
        return Err(tool_failed(
            "ffmpeg",
            &silence_path,
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    tracing::debug!(path = %silence_path.display(), "generated silence clip");
    Ok(silence_path)
}

/// Losslessly concatenate segment files (all inside `audio_dir`) into `raw_output`
pub async fn concat_segments(
    audio_dir: &Path,
    filenames: &[String],
    silence: Option<&Path>,
    raw_output: &Path,
) -> Result<()> {
    let silence_name = silence
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().to_string());

    let list_path = get_concat_list_path(audio_dir);
    fs::write(&list_path, build_concat_list(filenames, silence_name.as_deref())).await?;

    // concat entries resolve relative to the list file
    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-f")
        .arg("concat")
        .arg("-safe")
        .arg("0")
        .arg("-i")
        .arg(&list_path)
        .arg("-c")
        .arg("copy")
        .arg(raw_output)
        .output()
        .await
        .map_err(|e| spawn_failed("ffmpeg", raw_output, e))?;

    if !output.status.success() {
        return Err(tool_failed(
            "ffmpeg",
            raw_output,
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    tracing::debug!(segments = filenames.len(), "concatenated segments");
    Ok(())
}

pub struct RescaleOptions<'a> {
    pub target_duration: f64,
    pub sample_rate: u32,
    pub bitrate: &'a str,
}

/// Time-stretch `raw` into `output` so it lasts exactly the target duration,
/// then delete `raw`. Returns the tempo stages applied.
pub async fn rescale_track(
    raw: &Path,
    output: &Path,
    raw_duration: f64,
    options: &RescaleOptions<'_>,
) -> Result<Vec<f64>> {
    let stages = build_tempo_filter_chain(raw_duration / options.target_duration)?;
    let filter = tempo_filter_expression(&stages);
    tracing::debug!(%filter, raw_duration, "rescaling track");

    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(raw)
        .arg("-vn")
        .arg("-af")
        .arg(&filter)
        .arg("-ar")
        .arg(options.sample_rate.to_string())
        .arg("-b:a")
        .arg(options.bitrate)
        .arg("-t")
        .arg(options.target_duration.to_string())
        .arg(output)
        .output()
        .await
        .map_err(|e| spawn_failed("ffmpeg", output, e))?;

    if !result.status.success() {
        return Err(tool_failed(
            "ffmpeg",
            output,
            String::from_utf8_lossy(&result.stderr).to_string(),
        ));
    }

    fs::remove_file(raw).await?;
    Ok(stages)
}
