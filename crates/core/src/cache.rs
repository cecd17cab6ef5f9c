use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::Result;

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn get_kokoro_model_dir() -> PathBuf {
    home_dir().join(".cache").join("kokoro-models")
}

pub fn get_piper_voice_dir() -> PathBuf {
    home_dir().join(".local").join("piper-voices")
}

/// Get the path of the reusable silence clip for a gap length
pub fn get_silence_path(audio_dir: &Path, seconds: f64) -> PathBuf {
    let millis = (seconds * 1000.0).round() as u64;
    audio_dir.join(format!("silence-{}ms.mp3", millis))
}

pub fn get_concat_list_path(audio_dir: &Path) -> PathBuf {
    audio_dir.join("concat.txt")
}

fn is_generated(name: &str) -> bool {
    (name.ends_with(".mp3") && !name.starts_with("silence-")) || name == "concat.txt"
}

/// Remove audio left by a previous run, preserving the keep-list and cached silence clips
pub async fn clean_audio_dir(audio_dir: &Path, keep: &[String]) -> Result<usize> {
    if !audio_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    let mut entries = fs::read_dir(audio_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if keep.contains(&name) || entry.file_type().await?.is_dir() {
            continue;
        }
        if is_generated(&name) {
            fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }

    tracing::debug!(dir = %audio_dir.display(), removed, "cleaned audio dir");
    Ok(removed)
}

/// Return true when the directory exists and has at least one entry
pub fn dir_has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
