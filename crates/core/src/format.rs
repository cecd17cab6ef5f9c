use crate::{media::tempo_filter_expression, types::TimingManifest};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Render a fixed-width text progress bar
pub fn format_progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Format a timing manifest as a human-readable slide table
pub fn format_manifest_readable(manifest: &TimingManifest) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Target {} | scale {:.4} | {} slides\n\n",
        format_timestamp(manifest.target_duration),
        manifest.duration_scale,
        manifest.slides.len()
    ));

    for window in &manifest.slides {
        output.push_str(&format!(
            "[{}–{}] slide {:>2}  {:>7.3}s\n",
            format_timestamp(window.start),
            format_timestamp(window.end),
            window.id,
            window.duration
        ));
        for segment in &window.segments {
            output.push_str(&format!(
                "    {}  {:.3}s → {:.3}s\n",
                segment.filename, segment.raw_duration, segment.duration
            ));
        }
    }

    output
}

pub fn format_tempo_chain(stages: &[f64]) -> String {
    tempo_filter_expression(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SegmentTiming, SlideWindow};

    #[test]
    fn timestamps_are_minutes_and_seconds() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(75.9), "01:15");
        assert_eq!(format_timestamp(-3.0), "00:00");
    }

    #[test]
    fn progress_bar_is_clamped() {
        assert_eq!(format_progress_bar(0.5, 4), "██░░");
        assert_eq!(format_progress_bar(2.0, 3), "███");
        assert_eq!(format_progress_bar(f64::NAN, 2), "░░");
    }

    #[test]
    fn manifest_table_lists_every_slide() {
        let manifest = TimingManifest {
            generated_at: "2026-01-01T00:00:00.000Z".into(),
            target_duration: 90.0,
            total_duration: 90.0,
            duration_scale: 0.9,
            slides: vec![SlideWindow {
                id: 1,
                start: 0.0,
                end: 90.0,
                duration: 90.0,
                segments: vec![SegmentTiming {
                    filename: "slide-01-1.mp3".into(),
                    raw_duration: 100.0,
                    duration: 90.0,
                }],
            }],
        };

        let table = format_manifest_readable(&manifest);
        assert!(table.starts_with("Target 01:30 | scale 0.9000 | 1 slides"));
        assert!(table.contains("[00:00–01:30] slide  1"));
        assert!(table.contains("slide-01-1.mp3  100.000s → 90.000s"));
    }
}
