use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::TimerMode;

/// Every state change in the model produces an Event.
/// The host polls for events, or hands a [`TimerObserver`] to
/// [`TimerModel::dispatch`](crate::TimerModel::dispatch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// One second counted off a running timer.
    TimerTick {
        timer_id: Uuid,
        current_time_secs: u64,
        mode: TimerMode,
        at: DateTime<Utc>,
    },
    /// The timer's mode changed (command or threshold crossing).
    ModeTransition {
        timer_id: Uuid,
        from: TimerMode,
        to: TimerMode,
        at: DateTime<Utc>,
    },
    /// The countdown was rebased, usually by a remote sync.
    TimerSynced {
        timer_id: Uuid,
        current_time_secs: u64,
        at: DateTime<Utc>,
    },
    /// A finished timer handed over to the next one.
    TimerAdvanced {
        from_timer: Uuid,
        to_timer: Uuid,
        crossed_group: bool,
        transition_sound: Option<String>,
        at: DateTime<Utc>,
    },
    /// The last timer of a group alarmed and sequencing stopped there.
    GroupCompleted {
        group_id: Uuid,
        timer_id: Uuid,
        at: DateTime<Utc>,
    },
    /// The last timer of the last group alarmed.
    SequenceCompleted {
        timer_id: Uuid,
        at: DateTime<Utc>,
    },
    SelectionChanged {
        from: Option<Uuid>,
        to: Option<Uuid>,
        at: DateTime<Utc>,
    },
    TimerAdded {
        timer_id: Uuid,
        group_id: Uuid,
        at: DateTime<Utc>,
    },
    TimerRemoved {
        timer_id: Uuid,
        group_id: Uuid,
        at: DateTime<Utc>,
    },
    GroupRemoved {
        group_id: Uuid,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        timer_id: Option<Uuid>,
        group_index: Option<usize>,
        timer_index: Option<usize>,
        mode: TimerMode,
        starting_time_secs: u64,
        warning_time_secs: u64,
        final_time_secs: u64,
        current_time_secs: u64,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Deliver this event to an observer: the specific callback first,
    /// then `on_event`.
    pub fn notify<O: TimerObserver + ?Sized>(&self, observer: &mut O) {
        match *self {
            Event::TimerTick {
                timer_id,
                current_time_secs,
                mode,
                ..
            } => observer.on_tick(timer_id, current_time_secs, mode),
            Event::ModeTransition {
                timer_id, from, to, ..
            } => observer.on_transition(timer_id, from, to),
            _ => {}
        }
        observer.on_event(self);
    }
}

/// Callback-style consumer of model events.
///
/// Per tick, `on_tick` is always delivered before the `on_transition` the
/// same tick caused.
pub trait TimerObserver {
    fn on_tick(&mut self, _timer_id: Uuid, _current_time_secs: u64, _mode: TimerMode) {}

    fn on_transition(&mut self, _timer_id: Uuid, _from: TimerMode, _to: TimerMode) {}

    fn on_event(&mut self, _event: &Event) {}
}
