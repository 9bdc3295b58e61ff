//! Frame timing: a pausable game timer and once-per-second frame statistics.

use std::time::{Duration, Instant};

/// Pausable timer measuring total and per-frame time
///
/// Total time excludes every paused interval.
#[derive(Debug, Clone)]
pub struct GameTimer {
    base: Instant,
    previous: Instant,
    current: Instant,
    paused_total: Duration,
    stopped_at: Option<Instant>,
    delta: Duration,
}

impl GameTimer {
    /// Create a running timer, starting from now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub(crate) fn starting_at(now: Instant) -> Self {
        Self {
            base: now,
            previous: now,
            current: now,
            paused_total: Duration::ZERO,
            stopped_at: None,
            delta: Duration::ZERO,
        }
    }

    /// Restart from zero, running.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Resume after [`stop`](Self::stop).
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub(crate) fn start_at(&mut self, now: Instant) {
        if let Some(stopped_at) = self.stopped_at.take() {
            self.paused_total += now.saturating_duration_since(stopped_at);
            self.previous = now;
        }
    }

    /// Pause; total time stops advancing and delta becomes zero.
    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub(crate) fn stop_at(&mut self, now: Instant) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(now);
        }
    }

    /// Advance one frame.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub(crate) fn tick_at(&mut self, now: Instant) {
        if self.stopped_at.is_some() {
            self.delta = Duration::ZERO;
            return;
        }
        self.current = now;
        self.delta = now.saturating_duration_since(self.previous);
        self.previous = now;
    }

    pub fn is_paused(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Seconds since the last tick.
    pub fn delta_time(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Running seconds since creation or reset, pauses excluded.
    pub fn total_time(&self) -> f32 {
        let end = self.stopped_at.unwrap_or(self.current);
        end.saturating_duration_since(self.base)
            .saturating_sub(self.paused_total)
            .as_secs_f32()
    }
}

impl Default for GameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames per second and milliseconds per frame, refreshed once per second
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    frame_count: u32,
    window_start: f32,
    fps: f32,
    mspf: f32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame at `total_time` seconds
    ///
    /// Returns `true` when a full second elapsed and the averages were refreshed.
    pub fn record_frame(&mut self, total_time: f32) -> bool {
        self.frame_count += 1;
        if total_time - self.window_start < 1.0 {
            return false;
        }
        self.fps = self.frame_count as f32;
        self.mspf = 1000.0 / self.fps;
        self.frame_count = 0;
        self.window_start += 1.0;
        true
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn mspf(&self) -> f32 {
        self.mspf
    }

    /// `"<title>    fps: N   mspf: M"`
    pub fn window_title(&self, title: &str) -> String {
        format!("{}    fps: {:.0}   mspf: {:.3}", title, self.fps, self.mspf)
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
