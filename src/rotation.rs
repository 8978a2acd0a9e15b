//! # Rotation Scheduler
//! Index / play-state / progress bookkeeping for one card sequence.
//!
//! The scheduler is a plain value: it owns no timer and never sleeps. The
//! section controller feeds it `tick` deltas from a single task, which keeps
//! every mutation on one writer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CYCLE_MS: u64 = 5_000;
pub const DEFAULT_TICK_MS: u64 = 100;

/// Accumulated float deltas (e.g. 50 × 0.02) may land a hair under 1.0.
const PROGRESS_EPSILON: f64 = 1e-9;

/// Snapshot handed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationState {
    pub current_index: usize,
    pub is_playing: bool,
    /// Always within `[0.0, 1.0]`.
    pub progress_fraction: f64,
}

#[derive(Debug, Clone)]
pub struct RotationScheduler {
    len: usize,
    index: usize,
    playing: bool,
    progress: f64,
}

impl RotationScheduler {
    /// Fresh rotation over `sequence_len` cards: first card, playing, no
    /// progress. A zero length is treated as a single placeholder slot.
    pub fn start(sequence_len: usize) -> Self {
        Self {
            len: sequence_len.max(1),
            index: 0,
            playing: true,
            progress: 0.0,
        }
    }

    pub fn state(&self) -> RotationState {
        RotationState {
            current_index: self.index,
            is_playing: self.playing,
            progress_fraction: self.progress,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Add `delta` to the progress of the current card. Returns `true` when
    /// the cycle completed and the rotation moved to the next card.
    ///
    /// Ignored while paused; negative or non-finite deltas are ignored too so
    /// progress only ever grows between resets.
    pub fn tick(&mut self, delta: f64) -> bool {
        if !self.playing || !delta.is_finite() || delta <= 0.0 {
            return false;
        }
        self.progress += delta;
        if self.progress + PROGRESS_EPSILON >= 1.0 {
            self.advance();
            return true;
        }
        false
    }

    pub fn next(&mut self) {
        self.advance();
    }

    pub fn previous(&mut self) {
        self.index = (self.index + self.len - 1) % self.len;
        self.progress = 0.0;
    }

    /// Flip play state. Either direction restarts the current card's window.
    pub fn toggle_play(&mut self) {
        self.playing = !self.playing;
        self.progress = 0.0;
    }

    /// The card sequence was replaced: back to the first card, keep the play
    /// state.
    pub fn reload(&mut self, sequence_len: usize) {
        self.len = sequence_len.max(1);
        self.index = 0;
        self.progress = 0.0;
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % self.len;
        self.progress = 0.0;
    }
}

fn default_cycle_ms() -> u64 {
    DEFAULT_CYCLE_MS
}
fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

/// Timer settings (the `[rotation]` config section).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Full auto-advance cycle per card.
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,
    /// Timer granularity; each tick adds `tick_ms / cycle_ms` progress.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Periodic feed refresh while a section is active; `0` disables it.
    #[serde(default)]
    pub refresh_secs: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            cycle_ms: DEFAULT_CYCLE_MS,
            tick_ms: DEFAULT_TICK_MS,
            refresh_secs: 0,
        }
    }
}

impl RotationConfig {
    pub fn sanitized(mut self) -> Self {
        if self.cycle_ms == 0 {
            self.cycle_ms = DEFAULT_CYCLE_MS;
        }
        if self.tick_ms == 0 {
            self.tick_ms = DEFAULT_TICK_MS;
        }
        self.tick_ms = self.tick_ms.min(self.cycle_ms);
        self
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Progress added per tick.
    pub fn tick_delta(&self) -> f64 {
        self.tick_ms as f64 / self.cycle_ms.max(1) as f64
    }

    pub fn refresh_period(&self) -> Option<Duration> {
        (self.refresh_secs > 0).then(|| Duration::from_secs(self.refresh_secs))
    }
}
