use serde::{Deserialize, Serialize};

/// Authored slide content. Never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    pub id: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<String>,
    #[serde(default)]
    pub narration: Vec<String>,
}

/// One unit of narration text mapped to one output audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationSegment {
    pub slide_id: u32,
    pub text: String,
    pub filename: String,
}

/// A synthesized segment paired with its probed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDuration {
    pub segment: NarrationSegment,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingManifest {
    pub generated_at: String,
    pub target_duration: f64,
    pub total_duration: f64,
    pub duration_scale: f64,
    pub slides: Vec<SlideWindow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideWindow {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    #[serde(default)]
    pub segments: Vec<SegmentTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentTiming {
    pub filename: String,
    pub raw_duration: f64,
    pub duration: f64,
}
