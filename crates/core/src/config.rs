use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    cache::{get_kokoro_model_dir, get_piper_voice_dir},
    error::{HeroldError, Result},
};

pub const TARGET_DURATION_SECONDS: f64 = 180.0;
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Everything provider probes and synthesizers read from the outside world.
///
/// Built once at startup so nothing deep inside provider logic reaches for
/// environment variables or the home directory.
#[derive(Debug, Clone, Default)]
pub struct ProviderEnv {
    pub openai_api_key: Option<String>,
    pub kokoro_model_dir: PathBuf,
    pub piper_voice_dir: PathBuf,
    /// Directories searched for executables, in order.
    pub search_path: Vec<PathBuf>,
    pub node_bin: String,
    pub python_bin: String,
}

impl ProviderEnv {
    pub fn from_env() -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();

        Self {
            openai_api_key: std::env::var(OPENAI_API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty()),
            kokoro_model_dir: get_kokoro_model_dir(),
            piper_voice_dir: get_piper_voice_dir(),
            search_path,
            node_bin: "node".to_string(),
            python_bin: "python".to_string(),
        }
    }

    /// Locate an executable on the configured search path
    pub fn find_executable(&self, name: &str) -> Option<PathBuf> {
        self.search_path
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub audio_dir: PathBuf,
    pub data_dir: PathBuf,
    pub manifest_name: String,
    pub final_output_name: String,
    pub raw_output_name: String,
    pub target_duration: f64,
    pub sample_rate: u32,
    pub bitrate: String,
    /// Pause between segments to stay under cloud rate limits.
    pub segment_delay: Duration,
    /// Silence inserted between adjacent segments, in seconds.
    pub silence_gap: Option<f64>,
    /// Files in the audio dir that survive cleanup.
    pub keep: Vec<String>,
}

impl PipelineConfig {
    pub fn new(project_root: &Path) -> Self {
        let public = project_root.join("public");
        Self {
            audio_dir: public.join("audio"),
            data_dir: public.join("data"),
            manifest_name: "slide-timings.json".to_string(),
            final_output_name: "herold-presentation.mp3".to_string(),
            raw_output_name: "herold-presentation.raw.mp3".to_string(),
            target_duration: TARGET_DURATION_SECONDS,
            sample_rate: 44100,
            bitrate: "192k".to_string(),
            segment_delay: Duration::from_millis(400),
            silence_gap: None,
            keep: vec![".gitkeep".to_string()],
        }
    }

    /// Reject settings the track assembly could never honor
    pub fn validate(&self) -> Result<()> {
        if !self.target_duration.is_finite() || self.target_duration <= 0.0 {
            return Err(HeroldError::InvalidSetting {
                name: "target duration".to_string(),
                reason: format!("{} is not a positive number of seconds", self.target_duration),
            });
        }
        if let Some(gap) = self.silence_gap
            && (!gap.is_finite() || gap < 0.0)
        {
            return Err(HeroldError::InvalidSetting {
                name: "silence gap".to_string(),
                reason: format!("{} is not a non-negative number of seconds", gap),
            });
        }
        Ok(())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir.join(&self.manifest_name)
    }

    pub fn final_output_path(&self) -> PathBuf {
        self.audio_dir.join(&self.final_output_name)
    }

    pub fn raw_output_path(&self) -> PathBuf {
        self.audio_dir.join(&self.raw_output_name)
    }
}
