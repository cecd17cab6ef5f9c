use std::path::PathBuf;

use tokio::{fs, time::sleep};

use crate::{
    cache::clean_audio_dir,
    config::PipelineConfig,
    content::narration_segments,
    error::Result,
    media::{RescaleOptions, concat_segments, ensure_silence_clip, probe_duration, rescale_track},
    synth::Synthesizer,
    timing::{build_manifest, save_manifest},
    types::{SegmentDuration, Slide, TimingManifest},
};

/// Progress reported while the pipeline runs.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Cleaned {
        removed: usize,
    },
    SegmentStarted {
        index: usize,
        total: usize,
        filename: String,
    },
    SegmentSynthesized {
        index: usize,
        total: usize,
        filename: String,
        duration: f64,
    },
    Concatenated {
        raw_duration: f64,
    },
    Rescaled {
        tempo_stages: Vec<f64>,
    },
    ManifestWritten {
        path: PathBuf,
    },
}

#[derive(Debug)]
pub struct PipelineSummary {
    pub segments: usize,
    pub raw_duration: f64,
    pub duration_scale: f64,
    pub tempo_stages: Vec<f64>,
    pub audio_path: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: TimingManifest,
}

/// Synthesize every narration segment and assemble the narrated track.
///
/// Settings are checked before anything is synthesized. Segments run one at a
/// time in authored order. The first failure aborts the run before any
/// manifest is written.
pub async fn generate_narration(
    config: &PipelineConfig,
    slides: &[Slide],
    synth: &impl Synthesizer,
    voice: &str,
    mut on_event: impl FnMut(PipelineEvent),
) -> Result<PipelineSummary> {
    config.validate()?;
    let segments = narration_segments(slides)?;
    tracing::info!(
        provider = synth.provider_name(),
        segments = segments.len(),
        "generating narration"
    );

    fs::create_dir_all(&config.audio_dir).await?;
    fs::create_dir_all(&config.data_dir).await?;
    let removed = clean_audio_dir(&config.audio_dir, &config.keep).await?;
    on_event(PipelineEvent::Cleaned { removed });

    let total = segments.len();
    let mut records = Vec::with_capacity(total);
    for (index, segment) in segments.into_iter().enumerate() {
        on_event(PipelineEvent::SegmentStarted {
            index,
            total,
            filename: segment.filename.clone(),
        });

        let path = synth
            .synthesize(&segment.text, &segment.filename, voice)
            .await?;
        let duration = probe_duration(&path).await?;

        on_event(PipelineEvent::SegmentSynthesized {
            index,
            total,
            filename: segment.filename.clone(),
            duration,
        });
        records.push(SegmentDuration {
            segment,
            duration_seconds: duration,
        });

        sleep(config.segment_delay).await;
    }

    let silence = match config.silence_gap {
        Some(gap) if gap > 0.0 => {
            Some(ensure_silence_clip(&config.audio_dir, gap, config.sample_rate).await?)
        }
        _ => None,
    };

    let filenames: Vec<String> = records
        .iter()
        .map(|record| record.segment.filename.clone())
        .collect();
    let raw_path = config.raw_output_path();
    concat_segments(&config.audio_dir, &filenames, silence.as_deref(), &raw_path).await?;

    let raw_duration = probe_duration(&raw_path).await?;
    on_event(PipelineEvent::Concatenated { raw_duration });

    let audio_path = config.final_output_path();
    let tempo_stages = rescale_track(
        &raw_path,
        &audio_path,
        raw_duration,
        &RescaleOptions {
            target_duration: config.target_duration,
            sample_rate: config.sample_rate,
            bitrate: &config.bitrate,
        },
    )
    .await?;
    on_event(PipelineEvent::Rescaled {
        tempo_stages: tempo_stages.clone(),
    });

    let duration_scale = config.target_duration / raw_duration;
    let gap = if silence.is_some() {
        config.silence_gap.unwrap_or(0.0)
    } else {
        0.0
    };
    let manifest = build_manifest(
        slides,
        &records,
        duration_scale,
        config.target_duration,
        gap,
    )?;

    let manifest_path = config.manifest_path();
    save_manifest(&manifest, &manifest_path).await?;
    on_event(PipelineEvent::ManifestWritten {
        path: manifest_path.clone(),
    });

    Ok(PipelineSummary {
        segments: records.len(),
        raw_duration,
        duration_scale,
        tempo_stages,
        audio_path,
        manifest_path,
        manifest,
    })
}
