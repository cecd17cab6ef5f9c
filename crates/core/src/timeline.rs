use std::path::PathBuf;

use crate::{
    config::TARGET_DURATION_SECONDS,
    error::{HeroldError, Result},
    timing::load_manifest,
    types::TimingManifest,
};

/// Tolerance for playback jitter around window boundaries, in seconds.
pub const BOUNDARY_EPSILON: f64 = 0.05;

/// Total length assumed when no timing manifest can be loaded.
pub const DEFAULT_TOTAL_DURATION: f64 = TARGET_DURATION_SECONDS;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineWindow {
    pub start: f64,
    pub end: f64,
}

/// Map a playback time onto a slide index.
///
/// Picks the window containing `time`, where a window may start up to
/// [`BOUNDARY_EPSILON`] early. When two windows qualify, the one whose start
/// is nearest to `time` wins, with ties going to the later window. Falls back
/// to the next window when `time` sits in a gap, and to the last window once
/// `time` reaches the end. Pure and total: every time maps to a valid index.
pub fn find_slide_for_time(time: f64, windows: &[TimelineWindow]) -> usize {
    let Some(last) = windows.len().checked_sub(1) else {
        return 0;
    };

    let mut containing: Option<(usize, f64)> = None;
    for (index, w) in windows.iter().enumerate() {
        if time >= w.start - BOUNDARY_EPSILON && time < w.end {
            let distance = (time - w.start).abs();
            if containing.is_none_or(|(_, best)| distance <= best) {
                containing = Some((index, distance));
            }
        }
    }
    if let Some((index, _)) = containing {
        return index;
    }

    windows
        .iter()
        .position(|w| w.start - BOUNDARY_EPSILON > time)
        .unwrap_or(last)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    windows: Vec<TimelineWindow>,
    total_duration: f64,
}

impl Timeline {
    /// Evenly divide `total_duration` across `slide_count` slides
    pub fn even(slide_count: usize, total_duration: f64) -> Result<Self> {
        if slide_count == 0 {
            return Err(HeroldError::EmptyTimeline);
        }

        let step = total_duration / slide_count as f64;
        let windows = (0..slide_count)
            .map(|i| TimelineWindow {
                start: step * i as f64,
                end: if i + 1 == slide_count {
                    total_duration
                } else {
                    step * (i + 1) as f64
                },
            })
            .collect();

        Ok(Self {
            windows,
            total_duration,
        })
    }

    /// Build a timeline from a manifest that must describe exactly `expected_slides` slides
    pub fn from_manifest(manifest: &TimingManifest, expected_slides: usize) -> Result<Self> {
        if manifest.slides.len() != expected_slides {
            return Err(HeroldError::SlideCountMismatch {
                expected: expected_slides,
                found: manifest.slides.len(),
            });
        }
        if manifest.slides.is_empty() {
            return Err(HeroldError::EmptyTimeline);
        }

        let windows: Vec<TimelineWindow> = manifest
            .slides
            .iter()
            .map(|slide| TimelineWindow {
                start: slide.start,
                end: slide.end,
            })
            .collect();

        let ordered = windows
            .iter()
            .all(|w| w.start.is_finite() && w.end.is_finite() && w.end >= w.start)
            && windows
                .windows(2)
                .all(|pair| pair[0].end <= pair[1].start + BOUNDARY_EPSILON);
        if !ordered {
            return Err(HeroldError::InvalidTimeline {
                reason: "slide windows overlap or run backwards".to_string(),
            });
        }

        let last_end = windows.last().map(|w| w.end).unwrap_or(0.0);
        Ok(Self {
            windows,
            total_duration: manifest.total_duration.max(last_end),
        })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn windows(&self) -> &[TimelineWindow] {
        &self.windows
    }

    pub fn slide_for_time(&self, time: f64) -> usize {
        find_slide_for_time(time, &self.windows)
    }

    /// Start time of a slide, clamped to the last slide
    pub fn start_of(&self, index: usize) -> f64 {
        self.windows
            .get(index.min(self.windows.len().saturating_sub(1)))
            .map(|w| w.start)
            .unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ManifestSource {
    File(PathBuf),
    Url(String),
}

impl ManifestSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            ManifestSource::Url(source.to_string())
        } else {
            ManifestSource::File(PathBuf::from(source))
        }
    }
}

/// Fetch and validate the timing manifest
pub async fn load_timeline(source: &ManifestSource, slide_count: usize) -> Result<Timeline> {
    let manifest = match source {
        ManifestSource::File(path) => load_manifest(path).await?,
        ManifestSource::Url(url) => {
            reqwest::get(url)
                .await?
                .error_for_status()?
                .json::<TimingManifest>()
                .await?
        }
    };
    Timeline::from_manifest(&manifest, slide_count)
}

/// Load the manifest, falling back to an even split so playback keeps working
pub async fn load_timeline_or_even(
    source: &ManifestSource,
    slide_count: usize,
) -> Result<Timeline> {
    match load_timeline(source, slide_count).await {
        Ok(timeline) => Ok(timeline),
        Err(e) => {
            tracing::warn!(error = %e, "timing manifest unavailable, using even timeline");
            Timeline::even(slide_count, DEFAULT_TOTAL_DURATION)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SlideWindow;

    fn windows(bounds: &[(f64, f64)]) -> Vec<TimelineWindow> {
        bounds
            .iter()
            .map(|&(start, end)| TimelineWindow { start, end })
            .collect()
    }

    fn manifest(bounds: &[(f64, f64)]) -> TimingManifest {
        TimingManifest {
            generated_at: "2026-01-01T00:00:00.000Z".into(),
            target_duration: 18.0,
            total_duration: 18.0,
            duration_scale: 1.0,
            slides: bounds
                .iter()
                .enumerate()
                .map(|(i, &(start, end))| SlideWindow {
                    id: i as u32 + 1,
                    start,
                    end,
                    duration: end - start,
                    segments: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn picks_containing_window() {
        let w = windows(&[(0.0, 7.5), (7.5, 13.5), (13.5, 18.0)]);
        assert_eq!(find_slide_for_time(0.0, &w), 0);
        assert_eq!(find_slide_for_time(7.0, &w), 0);
        assert_eq!(find_slide_for_time(7.5, &w), 1);
        assert_eq!(find_slide_for_time(15.0, &w), 2);
    }

    #[test]
    fn boundary_jitter_lands_on_the_next_slide() {
        let w = windows(&[(0.0, 7.5), (7.5, 13.5)]);
        assert_eq!(find_slide_for_time(7.49, &w), 1);
        assert_eq!(find_slide_for_time(-0.01, &w), 0);
    }

    #[test]
    fn gaps_and_overrun_are_covered() {
        let w = windows(&[(1.0, 2.0), (5.0, 6.0)]);
        assert_eq!(find_slide_for_time(0.0, &w), 0);
        assert_eq!(find_slide_for_time(3.0, &w), 1);
        assert_eq!(find_slide_for_time(6.0, &w), 1);
        assert_eq!(find_slide_for_time(600.0, &w), 1);
        assert_eq!(find_slide_for_time(1.0, &[]), 0);
    }

    #[test]
    fn selection_is_monotonic_over_time() {
        let w = windows(&[(0.0, 3.0), (3.0, 3.2), (4.0, 9.0), (9.0, 10.0)]);
        let mut previous = 0;
        let mut time = -0.1;
        while time <= 11.0 {
            let index = find_slide_for_time(time, &w);
            assert!(index < w.len());
            assert!(index >= previous, "went back at {time}");
            previous = index;
            time += 0.01;
        }
        assert_eq!(previous, 3);
    }

    #[test]
    fn windows_shorter_than_the_tolerance_stay_reachable() {
        let w = windows(&[(0.0, 5.0), (5.0, 5.04), (5.04, 10.0)]);
        assert_eq!(find_slide_for_time(5.0, &w), 1);
        assert_eq!(find_slide_for_time(5.01, &w), 1);
        assert_eq!(find_slide_for_time(5.04, &w), 2);
        assert_eq!(find_slide_for_time(4.99, &w), 1);

        let timeline = Timeline {
            windows: w.clone(),
            total_duration: 10.0,
        };
        assert_eq!(timeline.slide_for_time(timeline.start_of(1)), 1);
    }

    #[test]
    fn even_timeline_splits_total() {
        let timeline = Timeline::even(4, 180.0).unwrap();
        let starts: Vec<f64> = timeline.windows().iter().map(|w| w.start).collect();
        assert_eq!(starts, [0.0, 45.0, 90.0, 135.0]);
        assert_eq!(timeline.windows()[3].end, 180.0);
        assert_eq!(timeline.slide_for_time(100.0), 2);
        assert!(matches!(Timeline::even(0, 180.0), Err(HeroldError::EmptyTimeline)));
    }

    #[test]
    fn manifest_must_match_slide_count() {
        let m = manifest(&[(0.0, 7.5), (7.5, 18.0)]);
        assert!(Timeline::from_manifest(&m, 2).is_ok());
        assert!(matches!(
            Timeline::from_manifest(&m, 3),
            Err(HeroldError::SlideCountMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn overlapping_manifest_is_rejected() {
        let m = manifest(&[(0.0, 9.0), (7.5, 18.0)]);
        assert!(matches!(
            Timeline::from_manifest(&m, 2),
            Err(HeroldError::InvalidTimeline { .. })
        ));
    }

    #[test]
    fn unbounded_windows_are_rejected() {
        let m = manifest(&[(0.0, 7.5), (7.5, f64::INFINITY)]);
        assert!(matches!(
            Timeline::from_manifest(&m, 2),
            Err(HeroldError::InvalidTimeline { .. })
        ));

        let m = manifest(&[(0.0, f64::NAN), (7.5, 18.0)]);
        assert!(Timeline::from_manifest(&m, 2).is_err());
    }

    #[tokio::test]
    async fn missing_manifest_falls_back_to_even_split() {
        let source = ManifestSource::parse("/definitely/missing/slide-timings.json");
        let timeline = load_timeline_or_even(&source, 5).await.unwrap();

        assert_eq!(timeline, Timeline::even(5, DEFAULT_TOTAL_DURATION).unwrap());
        assert_eq!(timeline.total_duration(), DEFAULT_TOTAL_DURATION);
    }

    #[test]
    fn sources_are_told_apart_by_scheme() {
        assert_eq!(
            ManifestSource::parse("https://example.com/data/slide-timings.json"),
            ManifestSource::Url("https://example.com/data/slide-timings.json".into())
        );
        assert_eq!(
            ManifestSource::parse("public/data/slide-timings.json"),
            ManifestSource::File(PathBuf::from("public/data/slide-timings.json"))
        );
    }
}
