//! Herold Core Library
//!
//! Narration audio generation for the Herold slideshow: TTS provider
//! resolution, segment synthesis, ffmpeg track assembly, the timing manifest,
//! and the slide player that consumes it.

pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod format;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod player;
pub mod provider;
pub mod synth;
pub mod timeline;
pub mod timing;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{PipelineConfig, ProviderEnv, TARGET_DURATION_SECONDS};
pub use content::{load_slides, narration_segments};
pub use error::{HeroldError, Result};
pub use format::{format_manifest_readable, format_progress_bar, format_timestamp};
pub use media::{build_tempo_filter_chain, probe_duration};
pub use models::ensure_kokoro_models;
pub use pipeline::{PipelineEvent, PipelineSummary, generate_narration};
pub use player::{AudioEvent, AudioTransport, PlayerCommand, SlidePlayer};
pub use provider::{AvailabilityProbe, SystemProbe, TtsProvider, resolve_provider};
pub use synth::{ProviderSynthesizer, Synthesizer};
pub use timeline::{ManifestSource, Timeline, find_slide_for_time, load_timeline_or_even};
pub use timing::{build_manifest, load_manifest, save_manifest};
pub use types::{NarrationSegment, SegmentDuration, Slide, SlideWindow, TimingManifest};
