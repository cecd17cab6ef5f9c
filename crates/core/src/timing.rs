use std::path::Path;

use chrono::{SecondsFormat, Utc};
use tokio::fs;

use crate::{
    error::{HeroldError, Result},
    types::{SegmentDuration, SegmentTiming, Slide, SlideWindow, TimingManifest},
};

/// Round to millisecond precision
pub fn round_ms(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Build slide windows from probed segment durations.
///
/// Windows follow the authored slide order, not the order records arrive in.
/// `gap_seconds` of silence follows every segment except the last one in the
/// track and counts toward the owning slide.
pub fn build_manifest(
    slides: &[Slide],
    records: &[SegmentDuration],
    duration_scale: f64,
    target_duration: f64,
    gap_seconds: f64,
) -> Result<TimingManifest> {
    let last_index = records.len().saturating_sub(1);
    let mut cursor = 0.0;
    let mut windows = Vec::with_capacity(slides.len());

    for slide in slides {
        let owned: Vec<(usize, &SegmentDuration)> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.segment.slide_id == slide.id)
            .collect();

        if owned.is_empty() {
            return Err(HeroldError::MissingSegments { slide_id: slide.id });
        }

        let raw_duration: f64 = owned
            .iter()
            .map(|(index, record)| {
                let gap = if *index < last_index { gap_seconds } else { 0.0 };
                record.duration_seconds + gap
            })
            .sum();
        let scaled_duration = raw_duration * duration_scale;
        let start = cursor;
        let end = start + scaled_duration;

        windows.push(SlideWindow {
            id: slide.id,
            start: round_ms(start),
            end: round_ms(end),
            duration: round_ms(scaled_duration),
            segments: owned
                .iter()
                .map(|(_, record)| SegmentTiming {
                    filename: record.segment.filename.clone(),
                    raw_duration: round_ms(record.duration_seconds),
                    duration: round_ms(record.duration_seconds * duration_scale),
                })
                .collect(),
        });

        cursor = end;
    }

    Ok(TimingManifest {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        target_duration: round_ms(target_duration),
        total_duration: round_ms(target_duration),
        duration_scale,
        slides: windows,
    })
}

/// Serialize a manifest as pretty JSON with a trailing newline
pub fn manifest_to_json(manifest: &TimingManifest) -> Result<String> {
    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');
    Ok(json)
}

pub async fn save_manifest(manifest: &TimingManifest, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, manifest_to_json(manifest)?).await?;
    tracing::info!(path = %path.display(), slides = manifest.slides.len(), "wrote timing manifest");
    Ok(())
}

pub async fn load_manifest(path: &Path) -> Result<TimingManifest> {
    let json_content = fs::read_to_string(path).await?;
    let manifest: TimingManifest = serde_json::from_str(&json_content)?;
    Ok(manifest)
}
