//! Slide player state machine.
//!
//! The visible slide is always derived from the playback position. Navigation
//! moves the position on the transport and lets [`Timeline::slide_for_time`]
//! pick the slide, so the two can never drift apart.

use crate::{error::Result, timeline::Timeline};

/// Events reported by the audio backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AudioEvent {
    Play,
    Pause,
    Ended,
    TimeUpdate(f64),
}

/// The audio element the player drives.
pub trait AudioTransport {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn seek(&mut self, time: f64) -> Result<()>;
    fn current_time(&self) -> f64;
    /// Drain events emitted since the last call.
    fn poll_events(&mut self) -> Vec<AudioEvent>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Paused,
    Playing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlayerCommand {
    TogglePlay,
    Next,
    Previous,
    SeekToSlide(usize),
    SeekToFraction(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerState {
    pub current_slide: usize,
    pub playback: PlaybackState,
    pub current_time: f64,
    pub duration: f64,
}

pub struct SlidePlayer<T: AudioTransport> {
    transport: T,
    timeline: Timeline,
    state: PlayerState,
}

impl<T: AudioTransport> SlidePlayer<T> {
    pub fn new(transport: T, timeline: Timeline) -> Self {
        let current_time = transport.current_time();
        let state = PlayerState {
            current_slide: timeline.slide_for_time(current_time),
            playback: PlaybackState::Paused,
            current_time,
            duration: timeline.total_duration(),
        };
        Self {
            transport,
            timeline,
            state,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.state.playback == PlaybackState::Playing
    }

    /// Swap in a newly loaded timeline and re-derive the slide
    pub fn set_timeline(&mut self, timeline: Timeline) {
        self.timeline = timeline;
        self.state.duration = self.timeline.total_duration();
        self.state.current_slide = self.timeline.slide_for_time(self.state.current_time);
    }

    /// Fraction of the track played, in [0, 1]
    pub fn progress(&self) -> f64 {
        if self.state.duration <= 0.0 {
            return 0.0;
        }
        (self.state.current_time / self.state.duration).clamp(0.0, 1.0)
    }

    pub fn handle_event(&mut self, event: AudioEvent) -> Result<()> {
        match event {
            AudioEvent::Play => self.state.playback = PlaybackState::Playing,
            AudioEvent::Pause => self.state.playback = PlaybackState::Paused,
            AudioEvent::Ended => {
                self.state.playback = PlaybackState::Paused;
                self.transport.seek(0.0)?;
                self.update_time(0.0);
            }
            AudioEvent::TimeUpdate(time) => self.update_time(time),
        }
        Ok(())
    }

    /// Pull pending transport events and the current position
    pub fn tick(&mut self) -> Result<()> {
        for event in self.transport.poll_events() {
            self.handle_event(event)?;
        }
        if self.is_playing() {
            let time = self.transport.current_time();
            self.update_time(time);
        }
        Ok(())
    }

    pub fn apply(&mut self, command: PlayerCommand) -> Result<()> {
        match command {
            PlayerCommand::TogglePlay => self.toggle_play(),
            PlayerCommand::Next => self.next(),
            PlayerCommand::Previous => self.previous(),
            PlayerCommand::SeekToSlide(index) => self.seek_to_slide(index),
            PlayerCommand::SeekToFraction(fraction) => self.seek_to_fraction(fraction),
        }
    }

    /// Ask the transport to play or pause; state follows its events
    pub fn toggle_play(&mut self) -> Result<()> {
        if self.is_playing() {
            self.transport.pause()?;
        } else {
            self.transport.play()?;
        }
        self.tick()
    }

    pub fn next(&mut self) -> Result<()> {
        let current = self.state.current_slide;
        if current + 1 < self.timeline.len() {
            self.seek_to_slide(current + 1)?;
        }
        Ok(())
    }

    pub fn previous(&mut self) -> Result<()> {
        let current = self.state.current_slide;
        if current > 0 {
            self.seek_to_slide(current - 1)
        } else {
            self.seek(0.0)
        }
    }

    pub fn seek_to_slide(&mut self, index: usize) -> Result<()> {
        if self.timeline.is_empty() {
            return Ok(());
        }
        let start = self.timeline.start_of(index);
        self.seek(start)
    }

    pub fn seek_to_fraction(&mut self, fraction: f64) -> Result<()> {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.seek(fraction * self.state.duration)
    }

    pub fn seek(&mut self, time: f64) -> Result<()> {
        let time = time.clamp(0.0, self.state.duration.max(0.0));
        self.transport.seek(time)?;
        self.update_time(time);
        Ok(())
    }

    fn update_time(&mut self, time: f64) {
        self.state.current_time = time;
        self.state.current_slide = self.timeline.slide_for_time(time);
    }
}
