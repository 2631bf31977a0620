// src/engine/timer.rs
use std::time::{Duration, Instant};

/// Longest delta handed to scripts; a stall (debugger, window drag) would
/// otherwise arrive as one giant step.
pub const MAX_DELTA: Duration = Duration::from_millis(250);

/// Paces the update loop at a fixed rate and measures real frame deltas.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    frames_per_second: u32,
    frame_duration: Duration,
    last_frame: Option<Instant>,
    next_deadline: Instant,
    frames: u64,
    elapsed: Duration,
}

impl FrameTimer {
    pub fn new(frames_per_second: u32, now: Instant) -> Self {
        let frames_per_second = frames_per_second.max(1);
        Self {
            frames_per_second,
            frame_duration: Duration::from_secs(1) / frames_per_second,
            last_frame: None,
            next_deadline: now,
            frames: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the time since the previous frame once a new one is due.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        if now < self.next_deadline {
            return None;
        }

        let delta = match self.last_frame {
            Some(last) => now.saturating_duration_since(last).min(MAX_DELTA),
            None => self.frame_duration,
        };
        self.last_frame = Some(now);

        // Stay on the ideal grid unless a whole frame was missed.
        self.next_deadline += self.frame_duration;
        if self.next_deadline <= now {
            self.next_deadline = now + self.frame_duration;
        }

        self.frames += 1;
        self.elapsed += delta;
        Some(delta)
    }
}
