use std::{
    cell::Cell,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use herold_core::{
    HeroldError, PipelineConfig, PipelineEvent, Result, Slide, Synthesizer, generate_narration,
    load_manifest, probe_duration,
};
use tokio::process::Command;
use uuid::Uuid;

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("herold-test-{}", Uuid::new_v4()))
}

fn test_config(root: &Path, target: f64) -> PipelineConfig {
    let mut config = PipelineConfig::new(root);
    config.target_duration = target;
    config.segment_delay = Duration::ZERO;
    config
}

fn slide(id: u32, narration: &[&str]) -> Slide {
    Slide {
        id,
        title: format!("Slide {id}"),
        subtitle: None,
        content: None,
        points: Vec::new(),
        narration: narration.iter().map(|s| s.to_string()).collect(),
    }
}

async fn ffmpeg_with_mp3() -> bool {
    let probe = Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if !matches!(probe, Ok(status) if status.success()) {
        return false;
    }

    match Command::new("ffmpeg")
        .arg("-hide_banner")
        .arg("-encoders")
        .output()
        .await
    {
        Ok(output) => String::from_utf8_lossy(&output.stdout).contains("libmp3lame"),
        Err(_) => false,
    }
}

/// Renders a sine tone whose length in seconds is the segment text.
struct ToneSynth {
    dir: PathBuf,
}

impl Synthesizer for ToneSynth {
    fn provider_name(&self) -> &str {
        "Tone"
    }

    async fn synthesize(&self, text: &str, filename: &str, _voice: &str) -> Result<PathBuf> {
        let path = self.dir.join(filename);
        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-f")
            .arg("lavfi")
            .arg("-i")
            .arg(format!("sine=frequency=440:sample_rate=44100:duration={}", text))
            .arg("-c:a")
            .arg("libmp3lame")
            .arg(&path)
            .output()
            .await?;
        if !output.status.success() {
            return Err(HeroldError::SynthesisFailed {
                provider: "Tone".into(),
                filename: filename.into(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(path)
    }
}

struct FailingSynth;

impl Synthesizer for FailingSynth {
    fn provider_name(&self) -> &str {
        "Broken"
    }

    async fn synthesize(&self, _text: &str, filename: &str, _voice: &str) -> Result<PathBuf> {
        Err(HeroldError::SynthesisFailed {
            provider: "Broken".into(),
            filename: filename.into(),
            reason: "boom".into(),
        })
    }
}

/// Counts calls and never produces audio.
#[derive(Default)]
struct CountingSynth {
    calls: Cell<usize>,
}

impl Synthesizer for CountingSynth {
    fn provider_name(&self) -> &str {
        "Counting"
    }

    async fn synthesize(&self, _text: &str, filename: &str, _voice: &str) -> Result<PathBuf> {
        self.calls.set(self.calls.get() + 1);
        Err(HeroldError::SynthesisFailed {
            provider: "Counting".into(),
            filename: filename.into(),
            reason: "unexpected call".into(),
        })
    }
}

#[tokio::test]
async fn unusable_target_duration_fails_before_synthesis() {
    let slides: Vec<Slide> = (1..=5).map(|id| slide(id, &["line"])).collect();

    for target in [0.0, -30.0, f64::NAN] {
        let root = temp_root();
        let config = test_config(&root, target);
        let synth = CountingSynth::default();
        let mut events = Vec::new();

        let err = generate_narration(&config, &slides, &synth, "voice", |e| events.push(e))
            .await
            .unwrap_err();

        assert!(matches!(err, HeroldError::InvalidSetting { .. }), "{err}");
        assert!(err.is_configuration());
        assert_eq!(synth.calls.get(), 0);
        assert!(events.is_empty());
        assert!(!root.exists());
    }
}

#[tokio::test]
async fn negative_silence_gap_fails_before_synthesis() {
    let root = temp_root();
    let mut config = test_config(&root, 10.0);
    config.silence_gap = Some(-1.0);
    let synth = CountingSynth::default();

    let err = generate_narration(&config, &[slide(1, &["line"])], &synth, "voice", |_| {})
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(synth.calls.get(), 0);
    assert!(!root.exists());
}

#[tokio::test]
async fn first_failure_aborts_without_manifest() {
    let root = temp_root();
    let config = test_config(&root, 10.0);
    std::fs::create_dir_all(&config.audio_dir).unwrap();
    std::fs::write(config.audio_dir.join("slide-01-1.mp3"), "stale").unwrap();
    std::fs::write(config.audio_dir.join(".gitkeep"), "").unwrap();

    let slides = vec![slide(1, &["hello"]), slide(2, &["world"])];
    let mut events = Vec::new();
    let err = generate_narration(&config, &slides, &FailingSynth, "voice", |e| events.push(e))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HeroldError::SynthesisFailed { ref filename, .. } if filename == "slide-01-1.mp3"
    ));
    assert!(!config.manifest_path().exists());
    assert!(!config.audio_dir.join("slide-01-1.mp3").exists());
    assert!(config.audio_dir.join(".gitkeep").exists());
    assert!(matches!(events[0], PipelineEvent::Cleaned { removed: 1 }));

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn missing_narration_fails_before_touching_disk() {
    let root = temp_root();
    let config = test_config(&root, 10.0);
    let slides = vec![slide(1, &["hello"]), slide(2, &[])];

    let err = generate_narration(&config, &slides, &FailingSynth, "voice", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, HeroldError::MissingNarration { slide_id: 2 }));
    assert!(!root.exists());
}

#[tokio::test]
async fn assembles_track_and_manifest_at_target_duration() {
    if !ffmpeg_with_mp3().await {
        eprintln!("skipping: ffmpeg with libmp3lame not available");
        return;
    }

    let root = temp_root();
    let config = test_config(&root, 6.0);
    let synth = ToneSynth {
        dir: config.audio_dir.clone(),
    };
    let slides = vec![slide(1, &["2", "1"]), slide(2, &["3"])];

    let summary = generate_narration(&config, &slides, &synth, "voice", |_| {})
        .await
        .unwrap();

    assert_eq!(summary.segments, 3);
    assert!(!config.raw_output_path().exists());
    assert!((summary.duration_scale - 6.0 / summary.raw_duration).abs() < 1e-9);

    let final_duration = probe_duration(&summary.audio_path).await.unwrap();
    assert!((final_duration - 6.0).abs() < 0.2, "got {final_duration}");

    let manifest = load_manifest(&config.manifest_path()).await.unwrap();
    assert_eq!(manifest, summary.manifest);
    assert_eq!(manifest.slides.len(), 2);
    assert_eq!(manifest.slides[0].start, 0.0);
    assert_eq!(manifest.slides[0].end, manifest.slides[1].start);
    assert!((manifest.slides[1].end - 6.0).abs() < 0.1);
    assert_eq!(manifest.slides[0].segments.len(), 2);

    let raw_json = std::fs::read_to_string(config.manifest_path()).unwrap();
    assert!(raw_json.ends_with('\n'));

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn silence_gaps_are_cached_and_kept() {
    if !ffmpeg_with_mp3().await {
        eprintln!("skipping: ffmpeg with libmp3lame not available");
        return;
    }

    let root = temp_root();
    let mut config = test_config(&root, 4.0);
    config.silence_gap = Some(0.5);
    let synth = ToneSynth {
        dir: config.audio_dir.clone(),
    };
    let slides = vec![slide(1, &["1"]), slide(2, &["1"])];

    generate_narration(&config, &slides, &synth, "voice", |_| {})
        .await
        .unwrap();
    let silence = config.audio_dir.join("silence-500ms.mp3");
    assert!(silence.exists());

    // a second run reuses the clip instead of regenerating it
    let manifest = generate_narration(&config, &slides, &synth, "voice", |_| {})
        .await
        .unwrap()
        .manifest;
    assert!(silence.exists());
    assert!(manifest.slides[0].duration > manifest.slides[1].duration);
    assert_eq!(manifest.slides[0].start, 0.0);
    assert_eq!(manifest.slides[0].end, manifest.slides[1].start);
    assert!((manifest.slides[1].end - 4.0).abs() < 0.1);

    std::fs::remove_dir_all(&root).unwrap();
}
