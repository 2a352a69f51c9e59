//! Countdown engine implementation.
//!
//! The engine is a tick-driven state machine. It does not use internal
//! threads or clocks - the caller is responsible for calling `tick()` once
//! per second while the timer runs.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Countdown -> Warning -> Final -> Alarming
//!               \___________\_________\____-> Paused -> (resumed mode)
//! any -> Stopped (stop)        any -> Alarming (end)
//! ```
//!
//! `current_time_secs` counts down: it is the time remaining. On a tick
//! that crosses a threshold the returned [`Tick`] carries the
//! [`Transition`], and observers see the tick before the transition.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Thresholds::new(10, 5, 2))?;
//! engine.start();
//! // Once per second:
//! if let Some(tick) = engine.tick() { /* redraw */ }
//! ```

use serde::{Deserialize, Serialize};

use super::thresholds::Thresholds;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Stopped,
    Countdown,
    Warning,
    Final,
    Alarming,
    Paused,
}

impl TimerMode {
    /// Modes in which ticks advance the countdown.
    pub fn is_running(self) -> bool {
        matches!(self, TimerMode::Countdown | TimerMode::Warning | TimerMode::Final)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Stopped => "stopped",
            TimerMode::Countdown => "countdown",
            TimerMode::Warning => "warning",
            TimerMode::Final => "final",
            TimerMode::Alarming => "alarming",
            TimerMode::Paused => "paused",
        }
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: TimerMode,
    pub to: TimerMode,
}

/// Result of one tick of a running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub current_time_secs: u64,
    pub mode: TimerMode,
    /// Set when this tick crossed a threshold or reached the end.
    pub transition: Option<Transition>,
}

/// Core countdown engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEngine {
    thresholds: Thresholds,
    mode: TimerMode,
    /// Remaining time in seconds.
    current_time_secs: u64,
    /// Running mode to restore on resume (only set while paused).
    #[serde(default)]
    paused_from: Option<TimerMode>,
}

impl TimerEngine {
    /// Create a stopped engine, rewound to the starting time.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ThresholdOrder`] if the thresholds are
    /// out of order. Callers that edit thresholds interactively should
    /// pass them through [`Thresholds::clamped`] first.
    pub fn new(thresholds: Thresholds) -> Result<Self, ValidationError> {
        thresholds.validate()?;
        Ok(Self {
            thresholds,
            mode: TimerMode::Stopped,
            current_time_secs: thresholds.starting_time_secs,
            paused_from: None,
        })
    }

    /// Check state that did not come through [`TimerEngine::new`], such
    /// as a deserialized engine.
    pub(crate) fn check(&self) -> Result<(), ValidationError> {
        self.thresholds.validate()?;
        if self.current_time_secs > self.thresholds.starting_time_secs {
            return Err(ValidationError::InvalidValue {
                field: "current_time_secs".to_string(),
                message: format!(
                    "{} exceeds starting time {}",
                    self.current_time_secs, self.thresholds.starting_time_secs
                ),
            });
        }
        if self.paused_from.is_some_and(|mode| !mode.is_running()) {
            return Err(ValidationError::InvalidValue {
                field: "paused_from".to_string(),
                message: "must be a running mode".to_string(),
            });
        }
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn starting_time_secs(&self) -> u64 {
        self.thresholds.starting_time_secs
    }

    pub fn warning_time_secs(&self) -> u64 {
        self.thresholds.warning_time_secs
    }

    pub fn final_time_secs(&self) -> u64 {
        self.thresholds.final_time_secs
    }

    pub fn current_time_secs(&self) -> u64 {
        self.current_time_secs
    }

    /// Seconds counted off since the start. This is the sync value.
    pub fn elapsed_secs(&self) -> u64 {
        self.thresholds
            .starting_time_secs
            .saturating_sub(self.current_time_secs)
    }

    pub fn is_running(&self) -> bool {
        self.mode.is_running()
    }

    /// The running mode a paused engine was paused from.
    pub fn paused_from(&self) -> Option<TimerMode> {
        self.paused_from
    }

    /// The mode a running engine has with `remaining` seconds left.
    pub fn mode_at(&self, remaining: u64) -> TimerMode {
        let Thresholds {
            warning_time_secs,
            final_time_secs,
            ..
        } = self.thresholds;
        if remaining == 0 {
            TimerMode::Alarming
        } else if final_time_secs > 0 && remaining <= final_time_secs {
            TimerMode::Final
        } else if warning_time_secs > 0 && remaining <= warning_time_secs {
            TimerMode::Warning
        } else {
            TimerMode::Countdown
        }
    }

    /// 0.0 .. 1.0 fraction of the countdown already elapsed.
    pub fn progress(&self) -> f64 {
        let total = self.thresholds.starting_time_secs;
        if total == 0 {
            return 1.0;
        }
        self.elapsed_secs() as f64 / total as f64
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Transition> {
        if self.mode != TimerMode::Stopped {
            return None;
        }
        self.current_time_secs = self.thresholds.starting_time_secs;
        self.paused_from = None;
        let to = self.mode_at(self.current_time_secs);
        self.transition(to)
    }

    pub fn pause(&mut self) -> Option<Transition> {
        if !self.mode.is_running() {
            return None;
        }
        self.paused_from = Some(self.mode);
        self.transition(TimerMode::Paused)
    }

    pub fn resume(&mut self) -> Option<Transition> {
        if self.mode != TimerMode::Paused {
            return None;
        }
        self.paused_from = None;
        let to = self.mode_at(self.current_time_secs);
        self.transition(to)
    }

    /// Halt without rewinding. Use [`TimerEngine::reset`] to rewind.
    pub fn stop(&mut self) -> Option<Transition> {
        if self.mode == TimerMode::Stopped {
            return None;
        }
        self.paused_from = None;
        self.transition(TimerMode::Stopped)
    }

    /// Stop and rewind to the starting time.
    pub fn reset(&mut self) -> Option<Transition> {
        let transition = self.stop();
        self.current_time_secs = self.thresholds.starting_time_secs;
        transition
    }

    /// Skip straight to the alarm.
    pub fn end(&mut self) -> Option<Transition> {
        if self.mode == TimerMode::Alarming {
            return None;
        }
        self.current_time_secs = 0;
        self.paused_from = None;
        self.transition(TimerMode::Alarming)
    }

    /// Rebase the countdown to `secs` remaining, clamped to the duration.
    ///
    /// A running engine keeps ticking from the new value; its mode follows
    /// the new value, and zero sounds the alarm. A paused engine resumes
    /// into the mode matching the new value.
    pub fn set_current_time(&mut self, secs: u64) -> Option<Transition> {
        self.current_time_secs = secs.min(self.thresholds.starting_time_secs);
        match self.mode {
            mode if mode.is_running() => {
                let to = self.mode_at(self.current_time_secs);
                self.transition(to)
            }
            TimerMode::Paused => {
                if self.current_time_secs == 0 {
                    self.paused_from = None;
                    self.transition(TimerMode::Alarming)
                } else {
                    self.paused_from = Some(self.mode_at(self.current_time_secs));
                    None
                }
            }
            _ => None,
        }
    }

    /// Rebase using an elapsed-seconds sync value.
    pub fn set_elapsed_secs(&mut self, elapsed: u64) -> Option<Transition> {
        let remaining = self.thresholds.starting_time_secs.saturating_sub(elapsed);
        self.set_current_time(remaining)
    }

    /// Replace the thresholds and rewind.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotStopped`] unless the engine is stopped,
    /// or [`ValidationError::ThresholdOrder`] for out-of-order values.
    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<(), ValidationError> {
        if self.mode != TimerMode::Stopped {
            return Err(ValidationError::NotStopped { mode: self.mode });
        }
        thresholds.validate()?;
        self.thresholds = thresholds;
        self.current_time_secs = thresholds.starting_time_secs;
        Ok(())
    }

    /// Call once per second. Returns `None` unless the engine is running.
    pub fn tick(&mut self) -> Option<Tick> {
        if !self.mode.is_running() {
            return None;
        }
        self.current_time_secs = self.current_time_secs.saturating_sub(1);
        let to = self.mode_at(self.current_time_secs);
        let transition = self.transition(to);
        Some(Tick {
            current_time_secs: self.current_time_secs,
            mode: self.mode,
            transition,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn transition(&mut self, to: TimerMode) -> Option<Transition> {
        let from = self.mode;
        if from == to {
            return None;
        }
        self.mode = to;
        tracing::debug!(%from, %to, remaining = self.current_time_secs, "timer mode changed");
        Some(Transition { from, to })
    }
}
