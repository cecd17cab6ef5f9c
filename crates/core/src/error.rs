use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeroldError {
    #[error("Unknown provider: {name}. Available: {available}")]
    UnknownProvider { name: String, available: String },

    #[error("Requested provider '{name}' is not available. {hint}")]
    ProviderUnavailable { name: String, hint: String },

    #[error("No TTS provider available!\n{hints}")]
    NoProviderAvailable { hints: String },

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("{provider} model not found at {path}. {hint}")]
    MissingModel {
        provider: String,
        path: PathBuf,
        hint: String,
    },

    #[error("{provider} generation failed for {filename}: {reason}")]
    SynthesisFailed {
        provider: String,
        filename: String,
        reason: String,
    },

    #[error("{tool} failed for {path}: {reason}")]
    ToolFailed {
        tool: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Unable to read duration for {path}: invalid value {value:?}")]
    InvalidDuration { path: PathBuf, value: String },

    #[error("Invalid tempo factor: {0}")]
    InvalidTempoFactor(f64),

    #[error("Slide {slide_id} is missing narration text")]
    MissingNarration { slide_id: u32 },

    #[error("No narration segments defined in slides data")]
    NoNarration,

    #[error("Missing audio segments for slide {slide_id}")]
    MissingSegments { slide_id: u32 },

    #[error("Timing manifest has {found} slides, expected {expected}")]
    SlideCountMismatch { expected: usize, found: usize },

    #[error("Invalid timeline: {reason}")]
    InvalidTimeline { reason: String },

    #[error("Timeline has no slides")]
    EmptyTimeline,

    #[error("Model download failed for {url}: {reason}")]
    ModelDownloadFailed { url: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

impl HeroldError {
    /// Configuration errors are reported before any synthesis starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HeroldError::UnknownProvider { .. }
                | HeroldError::ProviderUnavailable { .. }
                | HeroldError::NoProviderAvailable { .. }
                | HeroldError::InvalidSetting { .. }
                | HeroldError::MissingApiKey { .. }
                | HeroldError::MissingModel { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HeroldError>;
