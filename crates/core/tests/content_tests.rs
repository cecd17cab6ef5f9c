use std::path::PathBuf;

use herold_core::{Timeline, load_slides, narration_segments};

fn authored_slides_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../content/slides.json")
}

#[tokio::test]
async fn authored_slides_yield_one_segment_per_narration_line() {
    let slides = load_slides(&authored_slides_path()).await.unwrap();
    assert!(!slides.is_empty());

    let segments = narration_segments(&slides).unwrap();
    let expected: usize = slides.iter().map(|s| s.narration.len()).sum();
    assert_eq!(segments.len(), expected);
    assert_eq!(segments[0].filename, "slide-01-1.mp3");
}

#[tokio::test]
async fn fallback_timeline_covers_every_authored_slide() {
    let slides = load_slides(&authored_slides_path()).await.unwrap();
    let timeline = Timeline::even(slides.len(), 180.0).unwrap();

    assert_eq!(timeline.len(), slides.len());
    assert_eq!(timeline.slide_for_time(0.0), 0);
    assert_eq!(timeline.slide_for_time(180.0), slides.len() - 1);
}
