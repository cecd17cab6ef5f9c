use std::path::Path;

use tokio::fs;

use crate::{
    error::{HeroldError, Result},
    types::{NarrationSegment, Slide},
};

/// Load authored slides from a JSON file
pub async fn load_slides(path: &Path) -> Result<Vec<Slide>> {
    let json_content = fs::read_to_string(path).await?;
    let slides: Vec<Slide> = serde_json::from_str(&json_content)?;
    Ok(slides)
}

pub fn segment_filename(slide_id: u32, index: usize) -> String {
    format!("slide-{:02}-{}.mp3", slide_id, index + 1)
}

/// Flatten slides into narration segments, in authored order
pub fn narration_segments(slides: &[Slide]) -> Result<Vec<NarrationSegment>> {
    let mut segments = Vec::new();

    for slide in slides {
        if slide.narration.is_empty() {
            return Err(HeroldError::MissingNarration { slide_id: slide.id });
        }

        segments.extend(
            slide
                .narration
                .iter()
                .enumerate()
                .map(|(index, text)| NarrationSegment {
                    slide_id: slide.id,
                    text: text.clone(),
                    filename: segment_filename(slide.id, index),
                }),
        );
    }

    if segments.is_empty() {
        return Err(HeroldError::NoNarration);
    }

    Ok(segments)
}
