use std::{
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    time::Instant,
};

use herold_core::{AudioEvent, AudioTransport, Result};

/// Wall-clock playback position with no sound attached.
pub struct ClockTransport {
    position: f64,
    anchor: Option<Instant>,
    duration: f64,
    pending: Vec<AudioEvent>,
}

impl ClockTransport {
    pub fn new(duration: f64) -> Self {
        Self {
            position: 0.0,
            anchor: None,
            duration,
            pending: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    fn elapsed(&self) -> f64 {
        self.anchor
            .map(|anchor| anchor.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AudioTransport for ClockTransport {
    fn play(&mut self) -> Result<()> {
        if self.anchor.is_none() {
            self.anchor = Some(Instant::now());
            self.pending.push(AudioEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if self.anchor.is_some() {
            self.position = self.current_time();
            self.anchor = None;
            self.pending.push(AudioEvent::Pause);
        }
        Ok(())
    }

    fn seek(&mut self, time: f64) -> Result<()> {
        self.position = time;
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        (self.position + self.elapsed()).min(self.duration)
    }

    fn poll_events(&mut self) -> Vec<AudioEvent> {
        if self.anchor.is_some() && self.current_time() >= self.duration {
            self.position = self.duration;
            self.anchor = None;
            self.pending.push(AudioEvent::Pause);
            self.pending.push(AudioEvent::Ended);
        }
        std::mem::take(&mut self.pending)
    }
}

/// Plays the narration through `ffplay`, restarting it at every seek.
pub struct FfplayTransport {
    clock: ClockTransport,
    audio_path: PathBuf,
    child: Option<Child>,
}

impl FfplayTransport {
    pub fn new(audio_path: &Path, duration: f64) -> Self {
        Self {
            clock: ClockTransport::new(duration),
            audio_path: audio_path.to_path_buf(),
            child: None,
        }
    }

    fn stop_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn start_child(&mut self) -> Result<()> {
        self.stop_child();
        let child = Command::new("ffplay")
            .arg("-nodisp")
            .arg("-autoexit")
            .arg("-loglevel")
            .arg("quiet")
            .arg("-ss")
            .arg(format!("{:.3}", self.clock.current_time()))
            .arg(&self.audio_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        tracing::debug!(pid = child.id(), "started ffplay");
        self.child = Some(child);
        Ok(())
    }
}

impl AudioTransport for FfplayTransport {
    fn play(&mut self) -> Result<()> {
        self.clock.play()?;
        self.start_child()
    }

    fn pause(&mut self) -> Result<()> {
        self.clock.pause()?;
        self.stop_child();
        Ok(())
    }

    fn seek(&mut self, time: f64) -> Result<()> {
        self.clock.seek(time)?;
        if self.clock.is_running() {
            self.start_child()?;
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    fn poll_events(&mut self) -> Vec<AudioEvent> {
        let events = self.clock.poll_events();
        if events.contains(&AudioEvent::Ended) {
            self.stop_child();
        }
        events
    }
}

impl Drop for FfplayTransport {
    fn drop(&mut self) {
        self.stop_child();
    }
}

/// Either real audio or a silent clock, picked at startup.
pub enum Transport {
    Ffplay(FfplayTransport),
    Silent(ClockTransport),
}

impl Transport {
    pub fn set_duration(&mut self, duration: f64) {
        match self {
            Transport::Ffplay(t) => t.clock.set_duration(duration),
            Transport::Silent(t) => t.set_duration(duration),
        }
    }
}

impl AudioTransport for Transport {
    fn play(&mut self) -> Result<()> {
        match self {
            Transport::Ffplay(t) => t.play(),
            Transport::Silent(t) => t.play(),
        }
    }

    fn pause(&mut self) -> Result<()> {
        match self {
            Transport::Ffplay(t) => t.pause(),
            Transport::Silent(t) => t.pause(),
        }
    }

    fn seek(&mut self, time: f64) -> Result<()> {
        match self {
            Transport::Ffplay(t) => t.seek(time),
            Transport::Silent(t) => t.seek(time),
        }
    }

    fn current_time(&self) -> f64 {
        match self {
            Transport::Ffplay(t) => t.current_time(),
            Transport::Silent(t) => t.current_time(),
        }
    }

    fn poll_events(&mut self) -> Vec<AudioEvent> {
        match self {
            Transport::Ffplay(t) => t.poll_events(),
            Transport::Silent(t) => t.poll_events(),
        }
    }
}
