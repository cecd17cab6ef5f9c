use std::time::Duration;

use anyhow::Result;
use console::{Key, Term, style};
use herold_core::{
    AudioTransport, ManifestSource, PlayerCommand, Slide, SlidePlayer, Timeline,
    format_progress_bar, format_timestamp, load_timeline_or_even,
    timeline::DEFAULT_TOTAL_DURATION,
};
use tokio::sync::mpsc;

use crate::transport::Transport;

const FRAME_INTERVAL: Duration = Duration::from_millis(60);
const PROGRESS_WIDTH: usize = 40;
const FRACTION_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Command(PlayerCommand),
    Nudge(f64),
    Quit,
}

/// Map a key press to a player action
pub fn action_for_key(key: &Key, slide_count: usize) -> Option<Action> {
    match key {
        Key::ArrowRight | Key::Char(' ') => Some(Action::Command(PlayerCommand::Next)),
        Key::ArrowLeft => Some(Action::Command(PlayerCommand::Previous)),
        Key::Enter | Key::Char('p') => Some(Action::Command(PlayerCommand::TogglePlay)),
        Key::Home => Some(Action::Command(PlayerCommand::SeekToFraction(0.0))),
        Key::Char('.') => Some(Action::Nudge(FRACTION_STEP)),
        Key::Char(',') => Some(Action::Nudge(-FRACTION_STEP)),
        Key::Char('q') | Key::Escape => Some(Action::Quit),
        Key::Char(c) => c
            .to_digit(10)
            .map(|d| d as usize)
            .filter(|d| (1..=slide_count).contains(d))
            .map(|d| Action::Command(PlayerCommand::SeekToSlide(d - 1))),
        _ => None,
    }
}

fn render(
    term: &Term,
    slides: &[Slide],
    player: &SlidePlayer<Transport>,
) -> std::io::Result<()> {
    let state = player.state();
    let Some(slide) = slides.get(state.current_slide) else {
        return Ok(());
    };

    let mut frame = String::new();
    frame.push_str(&format!("\n  {}\n", style(&slide.title).cyan().bold()));
    if let Some(subtitle) = &slide.subtitle {
        frame.push_str(&format!("  {}\n", style(subtitle).dim()));
    }
    frame.push('\n');
    if let Some(content) = &slide.content {
        frame.push_str(&format!("  {}\n\n", content));
    }
    for point in &slide.points {
        frame.push_str(&format!("  • {}\n", point));
    }

    let button = if player.is_playing() {
        "⏸ Pause"
    } else {
        "▶ Play"
    };
    frame.push_str(&format!(
        "\n  {}  {} {} / {}  {} / {}\n",
        style(button).bold(),
        style(format_progress_bar(player.progress(), PROGRESS_WIDTH)).cyan(),
        format_timestamp(state.current_time),
        format_timestamp(state.duration),
        state.current_slide + 1,
        slides.len()
    ));
    frame.push_str(&format!(
        "\n  {}\n",
        style("← → or Space to navigate • p play/pause • , . seek • 1-9 jump • q quit").dim()
    ));

    term.clear_screen()?;
    term.write_str(&frame)?;
    term.flush()
}

fn spawn_key_reader(term: Term) -> mpsc::UnboundedReceiver<Key> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while let Ok(key) = term.read_key() {
            if tx.send(key).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run the interactive slide player until the user quits
pub async fn present(
    slides: Vec<Slide>,
    mut transport: Transport,
    source: ManifestSource,
) -> Result<()> {
    let slide_count = slides.len();
    transport.set_duration(DEFAULT_TOTAL_DURATION);
    let fallback = Timeline::even(slide_count, DEFAULT_TOTAL_DURATION)?;
    let mut player = SlidePlayer::new(transport, fallback);

    // aborted below if the player exits before the manifest arrives
    let mut load_task =
        tokio::spawn(async move { load_timeline_or_even(&source, slide_count).await });
    let mut loaded = false;

    let term = Term::stdout();
    term.hide_cursor()?;
    let mut keys = spawn_key_reader(term.clone());
    let mut frames = tokio::time::interval(FRAME_INTERVAL);

    let outcome: Result<()> = async {
        loop {
            tokio::select! {
                result = &mut load_task, if !loaded => {
                    loaded = true;
                    let timeline = result??;
                    player.set_timeline(timeline);
                    let duration = player.state().duration;
                    player.transport_mut().set_duration(duration);
                    tracing::debug!(duration, "timeline loaded");
                }
                key = keys.recv() => {
                    let Some(key) = key else { break };
                    match action_for_key(&key, slide_count) {
                        Some(Action::Quit) => break,
                        Some(Action::Command(command)) => player.apply(command)?,
                        Some(Action::Nudge(step)) => {
                            let fraction = player.progress() + step;
                            player.apply(PlayerCommand::SeekToFraction(fraction))?;
                        }
                        None => continue,
                    }
                    render(&term, &slides, &player)?;
                }
                _ = frames.tick() => {
                    player.tick()?;
                    render(&term, &slides, &player)?;
                }
            }
        }
        Ok(())
    }
    .await;

    if !loaded {
        load_task.abort();
    }
    if player.is_playing() {
        let _ = player.apply(PlayerCommand::TogglePlay);
    }
    term.show_cursor()?;
    term.clear_screen()?;
    outcome
}
