//! Ordered timer groups, the global selection, and sequencing.
//!
//! The model owns every group and timer. Timers refer to their group by
//! id only; positions are looked up, never cached. Exactly one timer is
//! selected whenever the model is non-empty, and empty groups are removed
//! as soon as they appear.
//!
//! Commands act on the selected timer. When it reaches its alarm the model
//! hands over to the next timer of the group, then to the next group,
//! according to [`SequencingConfig`].

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::events::{Event, TimerObserver};
use crate::storage::{Config, DefaultsConfig, LimitsConfig, SequencingConfig};
use crate::timer::{
    DisplayType, SoundType, Thresholds, Tick, Timer, TimerEngine, TimerGroup, TimerMode,
    Transition,
};

/// Position of a timer: group within the model, timer within the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexPath {
    pub group: usize,
    pub timer: usize,
}

impl IndexPath {
    pub fn new(group: usize, timer: usize) -> Self {
        Self { group, timer }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.timer)
    }
}

impl FromStr for IndexPath {
    type Err = ValidationError;

    /// Parses `group.timer`, e.g. `1.0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidValue {
            field: "path".into(),
            message: format!("expected <group>.<timer>, got {s:?}"),
        };
        let (group, timer) = s.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            group: group.trim().parse().map_err(|_| invalid())?,
            timer: timer.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// Persistable settings of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    #[serde(default)]
    pub display_type: DisplayType,
    #[serde(default)]
    pub sound_type: SoundType,
    #[serde(default)]
    pub transition_sound_filename: Option<String>,
    pub timers: Vec<Thresholds>,
}

/// What the sequencer does after the selected timer alarms.
enum SequenceStep {
    Advance {
        next: IndexPath,
        crossed_group: bool,
        transition_sound: Option<String>,
    },
    GroupCompleted(Uuid),
    SequenceCompleted,
    Hold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerModel {
    groups: Vec<TimerGroup>,
    #[serde(default)]
    selected: Option<Uuid>,
    #[serde(skip)]
    limits: LimitsConfig,
    #[serde(skip)]
    sequencing: SequencingConfig,
    #[serde(skip)]
    defaults: DefaultsConfig,
    #[serde(skip)]
    events: VecDeque<Event>,
}

impl TimerModel {
    /// An empty model governed by `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            groups: Vec::new(),
            selected: None,
            limits: config.limits,
            sequencing: config.sequencing,
            defaults: config.defaults.clone(),
            events: VecDeque::new(),
        }
    }

    /// Replace limits, sequencing and defaults, e.g. after deserializing.
    /// Existing groups are kept even if they exceed the new limits.
    pub fn apply_config(&mut self, config: &Config) {
        self.limits = config.limits;
        self.sequencing = config.sequencing;
        self.defaults = config.defaults.clone();
    }

    /// Check and repair a model that did not come through the editing
    /// operations, e.g. one read back from disk.
    ///
    /// Empty groups are dropped, each timer's group id is pointed at the
    /// group holding it, and the selection flags are rebuilt from
    /// `selected` (falling back to the first flagged timer, then the first
    /// timer). No events are emitted.
    ///
    /// # Errors
    ///
    /// Fails when a timer's engine is inconsistent (out-of-order
    /// thresholds, remaining time above the duration) or when two timers
    /// share an id.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for timer in self.timers() {
            timer.engine().check()?;
            if !seen.insert(timer.id()) {
                return Err(ValidationError::InvalidValue {
                    field: "timer.id".to_string(),
                    message: format!("duplicate timer id {}", timer.id()),
                });
            }
        }

        let before = self.groups.len();
        self.groups.retain(|g| !g.is_empty());
        if self.groups.len() != before {
            tracing::warn!(dropped = before - self.groups.len(), "dropped empty groups");
        }

        for group in &mut self.groups {
            let group_id = group.id();
            for timer in group.iter_mut() {
                timer.set_group_id(group_id);
            }
        }

        let selected = self
            .selected
            .filter(|id| seen.contains(id))
            .or_else(|| self.timers().find(|t| t.is_selected()).map(Timer::id))
            .or_else(|| self.timers().next().map(Timer::id));
        if selected != self.selected {
            tracing::warn!(stored = ?self.selected, repaired = ?selected, "repaired selection");
        }
        self.set_selection(selected);
        self.events.clear();
        Ok(())
    }

    /// Rebuild a stopped model from persisted settings, selecting the
    /// first timer. Groups without timers are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings exceed the configured limits or
    /// contain out-of-order thresholds.
    pub fn from_settings(config: &Config, settings: &[GroupSettings]) -> Result<Self, ValidationError> {
        let mut model = Self::new(config);
        for group_settings in settings.iter().filter(|g| !g.timers.is_empty()) {
            model.check_group_capacity()?;
            if group_settings.timers.len() > model.limits.max_timers_per_group {
                return Err(ValidationError::CapacityExceeded {
                    collection: "group".into(),
                    limit: model.limits.max_timers_per_group,
                });
            }
            let mut group =
                TimerGroup::new(group_settings.display_type, group_settings.sound_type.clone());
            group.transition_sound_filename = group_settings.transition_sound_filename.clone();
            let group_id = group.id();
            for thresholds in &group_settings.timers {
                group.push(Timer::new(group_id, *thresholds)?);
            }
            model.groups.push(group);
        }
        let first = model.timers().next().map(Timer::id);
        model.set_selection(first);
        model.events.clear();
        Ok(model)
    }

    pub fn settings(&self) -> Vec<GroupSettings> {
        self.groups
            .iter()
            .map(|group| GroupSettings {
                display_type: group.display_type,
                sound_type: group.sound_type.clone(),
                transition_sound_filename: group.transition_sound_filename.clone(),
                timers: group.iter().map(|t| t.engine().thresholds()).collect(),
            })
            .collect()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn timer_count(&self) -> usize {
        self.groups.iter().map(TimerGroup::len).sum()
    }

    pub fn limits(&self) -> LimitsConfig {
        self.limits
    }

    pub fn default_thresholds(&self) -> Thresholds {
        self.defaults.thresholds()
    }

    pub fn groups(&self) -> &[TimerGroup] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&TimerGroup> {
        self.groups.get(index)
    }

    /// Access to a group's display and sound settings. Structural edits
    /// go through the model.
    pub fn group_mut(&mut self, index: usize) -> Option<&mut TimerGroup> {
        self.groups.get_mut(index)
    }

    /// All timers in run order.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> {
        self.groups.iter().flat_map(TimerGroup::iter)
    }

    pub fn timer(&self, timer_id: Uuid) -> Option<&Timer> {
        self.timers().find(|t| t.id() == timer_id)
    }

    pub fn timer_at(&self, path: IndexPath) -> Option<&Timer> {
        self.groups.get(path.group)?.get(path.timer)
    }

    pub fn index_path(&self, timer_id: Uuid) -> Option<IndexPath> {
        self.groups.iter().enumerate().find_map(|(group, g)| {
            g.index_of(timer_id).map(|timer| IndexPath { group, timer })
        })
    }

    /// The group a timer belongs to.
    pub fn group_of(&self, timer_id: Uuid) -> Option<&TimerGroup> {
        let group_id = self.timer(timer_id)?.group_id();
        self.groups.iter().find(|g| g.id() == group_id)
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn selected_timer(&self) -> Option<&Timer> {
        self.timer(self.selected?)
    }

    pub fn selected_path(&self) -> Option<IndexPath> {
        self.index_path(self.selected?)
    }

    /// Number of timers flagged as selected (1 unless the model is empty).
    pub fn selected_count(&self) -> usize {
        self.timers().filter(|t| t.is_selected()).count()
    }

    /// Build a full state snapshot event for the selected timer.
    pub fn snapshot(&self) -> Event {
        let path = self.selected_path();
        let engine = self.selected_timer().map(Timer::engine);
        Event::StateSnapshot {
            timer_id: self.selected,
            group_index: path.map(|p| p.group),
            timer_index: path.map(|p| p.timer),
            mode: engine.map(TimerEngine::mode).unwrap_or(TimerMode::Stopped),
            starting_time_secs: engine.map(TimerEngine::starting_time_secs).unwrap_or(0),
            warning_time_secs: engine.map(TimerEngine::warning_time_secs).unwrap_or(0),
            final_time_secs: engine.map(TimerEngine::final_time_secs).unwrap_or(0),
            current_time_secs: engine.map(TimerEngine::current_time_secs).unwrap_or(0),
            elapsed_secs: engine.map(TimerEngine::elapsed_secs).unwrap_or(0),
            at: Utc::now(),
        }
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Drain queued events, oldest first.
    pub fn poll_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Drain queued events into `observer`, oldest first.
    pub fn dispatch<O: TimerObserver + ?Sized>(&mut self, observer: &mut O) {
        while let Some(event) = self.events.pop_front() {
            event.notify(observer);
        }
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Make `timer_id` the selected timer.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownTimer`] for ids not in the model,
    /// or [`ValidationError::SelectionLocked`] while the current selection
    /// is not stopped.
    pub fn select(&mut self, timer_id: Uuid) -> Result<(), ValidationError> {
        if self.index_path(timer_id).is_none() {
            return Err(ValidationError::UnknownTimer(timer_id));
        }
        if self.selected == Some(timer_id) {
            return Ok(());
        }
        self.ensure_selection_unlocked()?;
        self.set_selection(Some(timer_id));
        Ok(())
    }

    /// # Errors
    ///
    /// See [`TimerModel::select`]; also fails for paths outside the model.
    pub fn select_path(&mut self, path: IndexPath) -> Result<(), ValidationError> {
        let timer_id = self
            .timer_at(path)
            .map(Timer::id)
            .ok_or_else(|| self.path_out_of_bounds(path))?;
        self.select(timer_id)
    }

    /// Select the following timer, crossing into the next group and
    /// wrapping from the last timer to the first.
    ///
    /// # Errors
    ///
    /// See [`TimerModel::select`].
    pub fn select_next(&mut self) -> Result<Option<Uuid>, ValidationError> {
        self.step_selection(true)
    }

    /// Select the preceding timer, wrapping from the first to the last.
    ///
    /// # Errors
    ///
    /// See [`TimerModel::select`].
    pub fn select_previous(&mut self) -> Result<Option<Uuid>, ValidationError> {
        self.step_selection(false)
    }

    fn step_selection(&mut self, forward: bool) -> Result<Option<Uuid>, ValidationError> {
        let ids: Vec<Uuid> = self.timers().map(Timer::id).collect();
        let Some(current) = self.selected else {
            return Ok(None);
        };
        let len = ids.len();
        let pos = ids.iter().position(|id| *id == current).unwrap_or(0);
        let target = if forward {
            ids[(pos + 1) % len]
        } else {
            ids[(pos + len - 1) % len]
        };
        self.select(target)?;
        Ok(Some(target))
    }

    fn ensure_selection_unlocked(&self) -> Result<(), ValidationError> {
        match self.selected_timer().map(|t| t.engine().mode()) {
            Some(mode) if mode != TimerMode::Stopped => Err(ValidationError::SelectionLocked { mode }),
            _ => Ok(()),
        }
    }

    fn set_selection(&mut self, new: Option<Uuid>) {
        for group in &mut self.groups {
            for timer in group.iter_mut() {
                let selected = Some(timer.id()) == new;
                timer.set_selected(selected);
            }
        }
        let old = std::mem::replace(&mut self.selected, new);
        if old != new {
            tracing::debug!(?old, ?new, "selection changed");
            self.emit(Event::SelectionChanged {
                from: old,
                to: new,
                at: Utc::now(),
            });
        }
    }

    // ── Structure ────────────────────────────────────────────────────

    /// Append a new group holding one timer. The group takes its display
    /// and sound settings from the configured defaults. The first timer of
    /// an empty model is always selected.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::CapacityExceeded`] at the group limit,
    /// [`ValidationError::ThresholdOrder`] for bad thresholds, or
    /// [`ValidationError::SelectionLocked`] if `and_select` would move a
    /// locked selection.
    pub fn add_group(&mut self, thresholds: Thresholds, and_select: bool) -> Result<IndexPath, ValidationError> {
        self.check_group_capacity()?;
        let mut group =
            TimerGroup::new(self.defaults.display_type, self.defaults.sound_type.clone());
        group.transition_sound_filename = self.defaults.transition_sound_filename.clone();
        let timer = Timer::new(group.id(), thresholds)?;
        let select = and_select || self.selected.is_none();
        if select {
            self.ensure_selection_unlocked()?;
        }

        let (timer_id, group_id) = (timer.id(), group.id());
        group.push(timer);
        self.groups.push(group);
        let path = IndexPath::new(self.groups.len() - 1, 0);
        tracing::info!(%path, "added group");
        self.emit(Event::TimerAdded {
            timer_id,
            group_id,
            at: Utc::now(),
        });
        if select {
            self.set_selection(Some(timer_id));
        }
        Ok(path)
    }

    /// Append a timer to an existing group.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfBounds`] for a missing group,
    /// [`ValidationError::CapacityExceeded`] at the per-group limit, or the
    /// errors of [`TimerModel::add_group`].
    pub fn add_timer(
        &mut self,
        group: usize,
        thresholds: Thresholds,
        and_select: bool,
    ) -> Result<IndexPath, ValidationError> {
        let max = self.limits.max_timers_per_group;
        let target = self
            .groups
            .get(group)
            .ok_or_else(|| self.group_out_of_bounds(group))?;
        if target.len() >= max {
            return Err(ValidationError::CapacityExceeded {
                collection: "group".into(),
                limit: max,
            });
        }
        let group_id = target.id();
        let timer = Timer::new(group_id, thresholds)?;
        if and_select {
            self.ensure_selection_unlocked()?;
        }

        let timer_id = timer.id();
        let index = self.groups[group].push(timer);
        let path = IndexPath::new(group, index);
        tracing::info!(%path, "added timer");
        self.emit(Event::TimerAdded {
            timer_id,
            group_id,
            at: Utc::now(),
        });
        if and_select {
            self.set_selection(Some(timer_id));
        }
        Ok(path)
    }

    /// Remove a timer, dropping its group if it was the last one there.
    ///
    /// A removed selected timer is replaced by, in order: the previous
    /// timer in its group, the timer that moved into its slot, the last
    /// timer of the previous group, the first timer of the group that moved
    /// into its group's slot.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfBounds`] for paths outside the model.
    pub fn remove_timer(&mut self, path: IndexPath) -> Result<Timer, ValidationError> {
        if self.timer_at(path).is_none() {
            return Err(self.path_out_of_bounds(path));
        }
        let group_id = self.groups[path.group].id();
        let mut removed = self.groups[path.group].remove(path.timer)?;
        let was_selected = self.selected == Some(removed.id());
        removed.set_selected(false);
        tracing::info!(%path, "removed timer");
        self.emit(Event::TimerRemoved {
            timer_id: removed.id(),
            group_id,
            at: Utc::now(),
        });

        let group_emptied = self.groups[path.group].is_empty();
        if group_emptied {
            self.groups.remove(path.group);
            self.emit(Event::GroupRemoved {
                group_id,
                at: Utc::now(),
            });
        }

        if was_selected {
            let replacement = if group_emptied {
                self.neighbor_of_removed_group(path.group)
            } else {
                self.neighbor_in_group(path)
            };
            self.set_selection(replacement);
        }
        Ok(removed)
    }

    /// Remove a whole group. A selection inside it moves to the last timer
    /// of the previous group, else the first timer of the next.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfBounds`] for a missing group.
    pub fn remove_group(&mut self, index: usize) -> Result<TimerGroup, ValidationError> {
        if index >= self.groups.len() {
            return Err(self.group_out_of_bounds(index));
        }
        let mut group = self.groups.remove(index);
        let was_selected = self.selected.is_some_and(|id| group.contains(id));
        for timer in group.iter_mut() {
            timer.set_selected(false);
        }
        tracing::info!(index, "removed group");
        self.emit(Event::GroupRemoved {
            group_id: group.id(),
            at: Utc::now(),
        });
        if was_selected {
            let replacement = self.neighbor_of_removed_group(index);
            self.set_selection(replacement);
        }
        Ok(group)
    }

    /// Move a timer within or between groups. `to.timer` is the position
    /// in the destination group after the move. An emptied source group is
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfBounds`] for bad paths or
    /// [`ValidationError::CapacityExceeded`] for a full destination group.
    pub fn move_timer(&mut self, from: IndexPath, to: IndexPath) -> Result<(), ValidationError> {
        if self.timer_at(from).is_none() {
            return Err(self.path_out_of_bounds(from));
        }
        if from.group == to.group {
            return self.groups[from.group].move_timer(from.timer, to.timer);
        }

        let target_len = self
            .groups
            .get(to.group)
            .map(TimerGroup::len)
            .ok_or_else(|| self.group_out_of_bounds(to.group))?;
        if target_len >= self.limits.max_timers_per_group {
            return Err(ValidationError::CapacityExceeded {
                collection: "group".into(),
                limit: self.limits.max_timers_per_group,
            });
        }
        if to.timer > target_len {
            return Err(self.path_out_of_bounds(to));
        }

        let timer = self.groups[from.group].remove(from.timer)?;
        self.groups[to.group].insert(to.timer, timer)?;
        if self.groups[from.group].is_empty() {
            let group = self.groups.remove(from.group);
            self.emit(Event::GroupRemoved {
                group_id: group.id(),
                at: Utc::now(),
            });
        }
        tracing::info!(%from, %to, "moved timer");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfBounds`] for a missing group.
    pub fn move_group(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        if from >= self.groups.len() {
            return Err(self.group_out_of_bounds(from));
        }
        if to >= self.groups.len() {
            return Err(self.group_out_of_bounds(to));
        }
        let group = self.groups.remove(from);
        self.groups.insert(to, group);
        tracing::info!(from, to, "moved group");
        Ok(())
    }

    /// Change a stopped timer's duration and thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfBounds`] for a bad path, or the
    /// errors of [`TimerEngine::set_thresholds`].
    pub fn set_thresholds(&mut self, path: IndexPath, thresholds: Thresholds) -> Result<(), ValidationError> {
        let out_of_bounds = self.path_out_of_bounds(path);
        let timer = self.timer_at_mut(path).ok_or(out_of_bounds)?;
        timer.engine_mut().set_thresholds(thresholds)
    }

    // ── Commands on the selected timer ───────────────────────────────

    pub fn start(&mut self) -> Option<Transition> {
        self.command(TimerEngine::start)
    }

    pub fn pause(&mut self) -> Option<Transition> {
        self.command(TimerEngine::pause)
    }

    pub fn resume(&mut self) -> Option<Transition> {
        self.command(TimerEngine::resume)
    }

    pub fn stop(&mut self) -> Option<Transition> {
        self.command(TimerEngine::stop)
    }

    pub fn reset(&mut self) -> Option<Transition> {
        self.command(TimerEngine::reset)
    }

    /// Fast-forward the selected timer to its alarm.
    pub fn end(&mut self) -> Option<Transition> {
        self.command(TimerEngine::end)
    }

    /// Rebase the selected timer to `secs` remaining.
    pub fn set_current_time(&mut self, secs: u64) -> Option<Transition> {
        let timer = self.selected_timer_mut()?;
        let timer_id = timer.id();
        let transition = timer.engine_mut().set_current_time(secs);
        let current_time_secs = timer.engine().current_time_secs();
        self.emit(Event::TimerSynced {
            timer_id,
            current_time_secs,
            at: Utc::now(),
        });
        if let Some(transition) = transition {
            self.after_transition(timer_id, transition);
        }
        transition
    }

    /// Rebase the selected timer from an elapsed-seconds sync value.
    pub fn set_elapsed_secs(&mut self, elapsed: u64) -> Option<Transition> {
        let starting = self.selected_timer()?.engine().starting_time_secs();
        self.set_current_time(starting.saturating_sub(elapsed))
    }

    /// Advance the selected timer by one second.
    ///
    /// Queues `TimerTick`, then `ModeTransition` if a threshold was
    /// crossed. If the timer alarmed, sequencing follows: `TimerAdvanced`,
    /// the finished timer's reset, `SelectionChanged` and the next timer's
    /// start, or `GroupCompleted` / `SequenceCompleted`.
    pub fn tick(&mut self) -> Option<Tick> {
        let timer = self.selected_timer_mut()?;
        let timer_id = timer.id();
        let tick = timer.engine_mut().tick()?;
        self.emit(Event::TimerTick {
            timer_id,
            current_time_secs: tick.current_time_secs,
            mode: tick.mode,
            at: Utc::now(),
        });
        if let Some(transition) = tick.transition {
            self.after_transition(timer_id, transition);
        }
        Some(tick)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn command(&mut self, f: impl FnOnce(&mut TimerEngine) -> Option<Transition>) -> Option<Transition> {
        let timer = self.selected_timer_mut()?;
        let timer_id = timer.id();
        let transition = f(timer.engine_mut())?;
        self.after_transition(timer_id, transition);
        Some(transition)
    }

    fn after_transition(&mut self, timer_id: Uuid, transition: Transition) {
        self.emit_transition(timer_id, transition);
        if transition.to == TimerMode::Alarming {
            self.sequence_from(timer_id);
        }
    }

    fn emit(&mut self, event: Event) {
        self.events.push_back(event);
    }

    fn emit_transition(&mut self, timer_id: Uuid, transition: Transition) {
        self.emit(Event::ModeTransition {
            timer_id,
            from: transition.from,
            to: transition.to,
            at: Utc::now(),
        });
    }

    fn next_step(&self, path: IndexPath) -> SequenceStep {
        let group = &self.groups[path.group];
        match group.next_index(path.timer) {
            Some(next) if self.sequencing.auto_advance_timers => SequenceStep::Advance {
                next: IndexPath::new(path.group, next),
                crossed_group: false,
                transition_sound: group.transition_sound_filename.clone(),
            },
            Some(_) => SequenceStep::Hold,
            None if path.group + 1 < self.groups.len() => {
                if self.sequencing.auto_advance_groups {
                    SequenceStep::Advance {
                        next: IndexPath::new(path.group + 1, 0),
                        crossed_group: true,
                        transition_sound: None,
                    }
                } else {
                    SequenceStep::GroupCompleted(group.id())
                }
            }
            None => SequenceStep::SequenceCompleted,
        }
    }

    /// Hand over from an alarmed timer. Zero-length timers alarm as soon as
    /// they start, so the hand-over can cascade, at most once per timer.
    fn sequence_from(&mut self, alarmed: Uuid) {
        let mut timer_id = alarmed;
        for _ in 0..self.timer_count() {
            let Some(path) = self.index_path(timer_id) else {
                return;
            };
            let (next, crossed_group, transition_sound) = match self.next_step(path) {
                SequenceStep::Advance {
                    next,
                    crossed_group,
                    transition_sound,
                } => (next, crossed_group, transition_sound),
                SequenceStep::GroupCompleted(group_id) => {
                    tracing::debug!(%group_id, "group completed");
                    self.emit(Event::GroupCompleted {
                        group_id,
                        timer_id,
                        at: Utc::now(),
                    });
                    return;
                }
                SequenceStep::SequenceCompleted => {
                    tracing::debug!(%timer_id, "sequence completed");
                    self.emit(Event::SequenceCompleted {
                        timer_id,
                        at: Utc::now(),
                    });
                    return;
                }
                SequenceStep::Hold => return,
            };

            let next_id = self.groups[next.group][next.timer].id();
            tracing::debug!(from = %path, to = %next, crossed_group, "advancing to next timer");
            self.emit(Event::TimerAdvanced {
                from_timer: timer_id,
                to_timer: next_id,
                crossed_group,
                transition_sound,
                at: Utc::now(),
            });

            if let Some(transition) = self.engine_mut(timer_id).and_then(TimerEngine::reset) {
                self.emit_transition(timer_id, transition);
            }
            self.set_selection(Some(next_id));
            if let Some(transition) = self.engine_mut(next_id).and_then(TimerEngine::reset) {
                self.emit_transition(next_id, transition);
            }
            let Some(started) = self.engine_mut(next_id).and_then(TimerEngine::start) else {
                return;
            };
            self.emit_transition(next_id, started);
            if started.to != TimerMode::Alarming {
                return;
            }
            timer_id = next_id;
        }
    }

    fn selected_timer_mut(&mut self) -> Option<&mut Timer> {
        let path = self.selected_path()?;
        self.timer_at_mut(path)
    }

    fn timer_at_mut(&mut self, path: IndexPath) -> Option<&mut Timer> {
        self.groups.get_mut(path.group)?.get_mut(path.timer)
    }

    fn engine_mut(&mut self, timer_id: Uuid) -> Option<&mut TimerEngine> {
        let path = self.index_path(timer_id)?;
        self.timer_at_mut(path).map(Timer::engine_mut)
    }

    fn neighbor_in_group(&self, removed: IndexPath) -> Option<Uuid> {
        let group = self.groups.get(removed.group)?;
        removed
            .timer
            .checked_sub(1)
            .and_then(|i| group.get(i))
            .or_else(|| group.get(removed.timer))
            .map(Timer::id)
    }

    fn neighbor_of_removed_group(&self, removed: usize) -> Option<Uuid> {
        removed
            .checked_sub(1)
            .and_then(|g| self.groups.get(g))
            .and_then(TimerGroup::last)
            .or_else(|| self.groups.get(removed).and_then(TimerGroup::first))
            .map(Timer::id)
    }

    fn check_group_capacity(&self) -> Result<(), ValidationError> {
        if self.groups.len() >= self.limits.max_groups {
            return Err(ValidationError::CapacityExceeded {
                collection: "model".into(),
                limit: self.limits.max_groups,
            });
        }
        Ok(())
    }

    fn group_out_of_bounds(&self, index: usize) -> ValidationError {
        ValidationError::OutOfBounds {
            collection: "model".into(),
            index,
            len: self.groups.len(),
        }
    }

    fn path_out_of_bounds(&self, path: IndexPath) -> ValidationError {
        match self.groups.get(path.group) {
            None => self.group_out_of_bounds(path.group),
            Some(group) => ValidationError::OutOfBounds {
                collection: "group".into(),
                index: path.timer,
                len: group.len(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with(groups: &[&[u64]]) -> TimerModel {
        let settings: Vec<GroupSettings> = groups
            .iter()
            .map(|timers| GroupSettings {
                display_type: DisplayType::Numerical,
                sound_type: SoundType::None,
                transition_sound_filename: Some("chime.mp3".into()),
                timers: timers.iter().map(|s| Thresholds::countdown(*s)).collect(),
            })
            .collect();
        TimerModel::from_settings(&Config::default(), &settings).unwrap()
    }

    fn id_at(model: &TimerModel, group: usize, timer: usize) -> Uuid {
        model.timer_at(IndexPath::new(group, timer)).unwrap().id()
    }

    fn mode_of(model: &TimerModel, id: Uuid) -> TimerMode {
        model.timer(id).unwrap().engine().mode()
    }

    #[test]
    fn index_path_parses_dotted_form() {
        assert_eq!("2.1".parse::<IndexPath>(), Ok(IndexPath::new(2, 1)));
        assert_eq!(IndexPath::new(0, 3).to_string(), "0.3");
        assert!("2".parse::<IndexPath>().is_err());
        assert!("a.b".parse::<IndexPath>().is_err());
    }

    #[test]
    fn first_added_timer_is_selected() {
        let mut model = TimerModel::new(&Config::default());
        let path = model.add_group(Thresholds::countdown(10), false).unwrap();
        assert_eq!(path, IndexPath::new(0, 0));
        assert_eq!(model.selected_path(), Some(path));
        assert_eq!(model.selected_count(), 1);
    }

    #[test]
    fn add_timer_and_select_moves_flag() {
        let mut model = model_with(&[&[10]]);
        let first = id_at(&model, 0, 0);
        let path = model.add_timer(0, Thresholds::countdown(20), true).unwrap();
        assert_eq!(path, IndexPath::new(0, 1));
        assert_eq!(model.selected_path(), Some(path));
        assert!(!model.timer(first).unwrap().is_selected());
        assert_eq!(model.selected_count(), 1);
    }

    #[test]
    fn add_timer_without_select_keeps_selection() {
        let mut model = model_with(&[&[10]]);
        let first = id_at(&model, 0, 0);
        model.add_timer(0, Thresholds::countdown(20), false).unwrap();
        assert_eq!(model.selected_id(), Some(first));
    }

    #[test]
    fn add_timer_enforces_group_limit() {
        let mut config = Config::default();
        config.limits.max_timers_per_group = 2;
        let mut model = TimerModel::new(&config);
        model.add_group(Thresholds::countdown(10), false).unwrap();
        model.add_timer(0, Thresholds::countdown(10), false).unwrap();
        assert_eq!(
            model.add_timer(0, Thresholds::countdown(10), false),
            Err(ValidationError::CapacityExceeded {
                collection: "group".into(),
                limit: 2,
            })
        );
    }

    #[test]
    fn add_group_enforces_model_limit() {
        let mut config = Config::default();
        config.limits.max_groups = 1;
        let mut model = TimerModel::new(&config);
        model.add_group(Thresholds::countdown(10), false).unwrap();
        assert!(matches!(
            model.add_group(Thresholds::countdown(10), false),
            Err(ValidationError::CapacityExceeded { limit: 1, .. })
        ));
    }

    #[test]
    fn add_timer_to_missing_group_fails() {
        let mut model = model_with(&[&[10]]);
        assert_eq!(
            model.add_timer(3, Thresholds::countdown(10), false),
            Err(ValidationError::OutOfBounds {
                collection: "model".into(),
                index: 3,
                len: 1,
            })
        );
    }

    #[test]
    fn add_group_uses_configured_defaults() {
        let mut config = Config::default();
        config.defaults.display_type = DisplayType::Stoplights;
        config.defaults.transition_sound_filename = Some("ding.mp3".into());
        let mut model = TimerModel::new(&config);
        model.add_group(model.default_thresholds(), false).unwrap();
        let group = model.group(0).unwrap();
        assert_eq!(group.display_type, DisplayType::Stoplights);
        assert_eq!(group.transition_sound_filename.as_deref(), Some("ding.mp3"));
        assert_eq!(group[0].engine().thresholds(), Thresholds::new(300, 60, 10));
    }

    #[test]
    fn removing_selected_timer_selects_previous() {
        let mut model = model_with(&[&[10, 20, 30]]);
        model.select_path(IndexPath::new(0, 2)).unwrap();
        let expected = id_at(&model, 0, 1);
        model.remove_timer(IndexPath::new(0, 2)).unwrap();
        assert_eq!(model.selected_id(), Some(expected));
        assert_eq!(model.selected_count(), 1);
    }

    #[test]
    fn removing_first_selected_timer_selects_successor() {
        let mut model = model_with(&[&[10, 20, 30]]);
        let expected = id_at(&model, 0, 1);
        let removed = model.remove_timer(IndexPath::new(0, 0)).unwrap();
        assert!(!removed.is_selected());
        assert_eq!(model.selected_id(), Some(expected));
        assert_eq!(model.selected_path(), Some(IndexPath::new(0, 0)));
    }

    #[test]
    fn removing_last_timer_of_group_drops_group_and_selects_previous_group() {
        let mut model = model_with(&[&[10, 20], &[30]]);
        model.select_path(IndexPath::new(1, 0)).unwrap();
        let expected = id_at(&model, 0, 1);
        model.remove_timer(IndexPath::new(1, 0)).unwrap();
        assert_eq!(model.group_count(), 1);
        assert_eq!(model.selected_id(), Some(expected));
    }

    #[test]
    fn removing_only_timer_of_first_group_selects_next_group() {
        let mut model = model_with(&[&[10], &[20, 30]]);
        let expected = id_at(&model, 1, 0);
        model.remove_timer(IndexPath::new(0, 0)).unwrap();
        assert_eq!(model.selected_id(), Some(expected));
        assert_eq!(model.selected_path(), Some(IndexPath::new(0, 0)));
    }

    #[test]
    fn removing_everything_clears_selection() {
        let mut model = model_with(&[&[10]]);
        model.remove_timer(IndexPath::new(0, 0)).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.selected_id(), None);
        assert_eq!(model.selected_count(), 0);
    }

    #[test]
    fn removing_unselected_timer_keeps_selection() {
        let mut model = model_with(&[&[10, 20]]);
        let selected = model.selected_id();
        model.remove_timer(IndexPath::new(0, 1)).unwrap();
        assert_eq!(model.selected_id(), selected);
    }

    #[test]
    fn remove_group_moves_selection_to_neighbor() {
        let mut model = model_with(&[&[10], &[20, 30], &[40]]);
        model.select_path(IndexPath::new(1, 1)).unwrap();
        let expected = id_at(&model, 0, 0);
        let removed = model.remove_group(1).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|t| !t.is_selected()));
        assert_eq!(model.selected_id(), Some(expected));
    }

    #[test]
    fn select_next_crosses_groups_and_wraps() {
        let mut model = model_with(&[&[10, 20], &[30]]);
        let order: Vec<Uuid> = model.timers().map(Timer::id).collect();
        assert_eq!(model.select_next().unwrap(), Some(order[1]));
        assert_eq!(model.select_next().unwrap(), Some(order[2]));
        assert_eq!(model.select_next().unwrap(), Some(order[0]));
        assert_eq!(model.select_previous().unwrap(), Some(order[2]));
    }

    #[test]
    fn selection_is_locked_while_running() {
        let mut model = model_with(&[&[10, 20]]);
        model.start();
        assert_eq!(
            model.select_next(),
            Err(ValidationError::SelectionLocked {
                mode: TimerMode::Countdown
            })
        );
        model.stop();
        assert!(model.select_next().is_ok());
    }

    #[test]
    fn select_unknown_timer_fails() {
        let mut model = model_with(&[&[10]]);
        let id = Uuid::new_v4();
        assert_eq!(model.select(id), Err(ValidationError::UnknownTimer(id)));
    }

    #[test]
    fn move_timer_between_groups_keeps_selection_and_drops_empty_group() {
        let mut model = model_with(&[&[10], &[20, 30]]);
        let moved = id_at(&model, 0, 0);
        model.move_timer(IndexPath::new(0, 0), IndexPath::new(1, 2)).unwrap();
        assert_eq!(model.group_count(), 1);
        assert_eq!(model.index_path(moved), Some(IndexPath::new(0, 2)));
        assert_eq!(model.selected_id(), Some(moved));
        assert_eq!(model.group_of(moved).unwrap().id(), model.group(0).unwrap().id());
    }

    #[test]
    fn move_timer_respects_destination_capacity() {
        let mut config = Config::default();
        config.limits.max_timers_per_group = 1;
        let mut model = TimerModel::new(&config);
        model.add_group(Thresholds::countdown(10), false).unwrap();
        model.add_group(Thresholds::countdown(20), false).unwrap();
        assert!(model
            .move_timer(IndexPath::new(0, 0), IndexPath::new(1, 0))
            .is_err());
        assert_eq!(model.group_count(), 2);
    }

    #[test]
    fn move_group_reorders() {
        let mut model = model_with(&[&[10], &[20]]);
        let second = model.group(1).unwrap().id();
        model.move_group(1, 0).unwrap();
        assert_eq!(model.group(0).unwrap().id(), second);
        assert!(model.move_group(0, 2).is_err());
    }

    #[test]
    fn move_group_keeps_selected_timer() {
        let mut model = model_with(&[&[10], &[20], &[30]]);
        let selected = model.selected_id().unwrap();
        model.move_group(0, 2).unwrap();
        assert_eq!(model.selected_id(), Some(selected));
        assert_eq!(model.selected_path(), Some(IndexPath::new(2, 0)));
        assert!(model.poll_events().is_empty());
    }

    #[test]
    fn validate_repairs_selection_and_group_ids() {
        let model = model_with(&[&[10, 20], &[30]]);
        let mut json = serde_json::to_value(&model).unwrap();
        json["selected"] = serde_json::json!(Uuid::new_v4());
        json["groups"][0]["timers"][0]["is_selected"] = serde_json::json!(false);
        json["groups"][1]["timers"][0]["is_selected"] = serde_json::json!(true);
        json["groups"][1]["timers"][0]["group_id"] = serde_json::json!(Uuid::new_v4());
        json["groups"].as_array_mut().unwrap().push(serde_json::json!({
            "id": Uuid::new_v4(),
            "timers": [],
        }));

        let mut restored: TimerModel = serde_json::from_value(json).unwrap();
        restored.validate().unwrap();

        assert_eq!(restored.group_count(), 2);
        assert_eq!(restored.selected_path(), Some(IndexPath::new(1, 0)));
        assert_eq!(restored.timers().filter(|t| t.is_selected()).count(), 1);
        let group_id = restored.group(1).unwrap().id();
        assert_eq!(restored.timer_at(IndexPath::new(1, 0)).unwrap().group_id(), group_id);
        assert!(restored.poll_events().is_empty());
    }

    #[test]
    fn validate_rejects_duplicate_timer_ids() {
        let model = model_with(&[&[10, 20]]);
        let mut json = serde_json::to_value(&model).unwrap();
        let first = json["groups"][0]["timers"][0]["id"].clone();
        json["groups"][0]["timers"][1]["id"] = first;
        let mut restored: TimerModel = serde_json::from_value(json).unwrap();
        assert!(matches!(
            restored.validate(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn set_thresholds_requires_stopped_timer() {
        let mut model = model_with(&[&[10]]);
        let path = IndexPath::new(0, 0);
        model.set_thresholds(path, Thresholds::new(20, 10, 5)).unwrap();
        model.start();
        assert!(matches!(
            model.set_thresholds(path, Thresholds::new(30, 10, 5)),
            Err(ValidationError::NotStopped { .. })
        ));
        assert_eq!(model.timer_at(path).unwrap().engine().starting_time_secs(), 20);
    }

    #[test]
    fn tick_queues_tick_before_transition() {
        let settings = [GroupSettings {
            display_type: DisplayType::Circular,
            sound_type: SoundType::Vibrate,
            transition_sound_filename: None,
            timers: vec![Thresholds::new(3, 2, 0)],
        }];
        let mut model = TimerModel::from_settings(&Config::default(), &settings).unwrap();
        model.start();
        model.poll_events();
        model.tick();
        let events = model.poll_events();
        assert!(matches!(events[0], Event::TimerTick { current_time_secs: 2, .. }));
        assert!(matches!(
            events[1],
            Event::ModeTransition {
                from: TimerMode::Countdown,
                to: TimerMode::Warning,
                ..
            }
        ));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn alarm_advances_within_group_with_transition_sound() {
        let mut model = model_with(&[&[1, 5]]);
        let (first, second) = (id_at(&model, 0, 0), id_at(&model, 0, 1));
        model.start();
        model.poll_events();
        model.tick();

        assert_eq!(model.selected_id(), Some(second));
        assert_eq!(mode_of(&model, second), TimerMode::Countdown);
        assert_eq!(mode_of(&model, first), TimerMode::Stopped);
        assert_eq!(model.timer(first).unwrap().engine().current_time_secs(), 1);

        let advanced = model
            .poll_events()
            .into_iter()
            .find_map(|e| match e {
                Event::TimerAdvanced {
                    from_timer,
                    to_timer,
                    crossed_group,
                    transition_sound,
                    ..
                } => Some((from_timer, to_timer, crossed_group, transition_sound)),
                _ => None,
            })
            .unwrap();
        assert_eq!(advanced, (first, second, false, Some("chime.mp3".into())));
    }

    #[test]
    fn alarm_crosses_into_next_group_without_transition_sound() {
        let mut model = model_with(&[&[1], &[5]]);
        let second = id_at(&model, 1, 0);
        model.start();
        model.tick();
        assert_eq!(model.selected_id(), Some(second));
        let crossed = model.poll_events().into_iter().any(|e| {
            matches!(
                e,
                Event::TimerAdvanced {
                    crossed_group: true,
                    transition_sound: None,
                    ..
                }
            )
        });
        assert!(crossed);
    }

    #[test]
    fn group_boundary_halts_when_group_advance_disabled() {
        let mut config = Config::default();
        config.sequencing.auto_advance_groups = false;
        let settings = model_with(&[&[1], &[5]]).settings();
        let mut model = TimerModel::from_settings(&config, &settings).unwrap();
        let first = id_at(&model, 0, 0);
        model.start();
        model.tick();
        assert_eq!(model.selected_id(), Some(first));
        assert_eq!(mode_of(&model, first), TimerMode::Alarming);
        assert!(model
            .poll_events()
            .iter()
            .any(|e| matches!(e, Event::GroupCompleted { .. })));
    }

    #[test]
    fn timer_advance_disabled_holds_alarm() {
        let mut config = Config::default();
        config.sequencing.auto_advance_timers = false;
        let settings = model_with(&[&[1, 5]]).settings();
        let mut model = TimerModel::from_settings(&config, &settings).unwrap();
        let first = id_at(&model, 0, 0);
        model.start();
        model.tick();
        assert_eq!(model.selected_id(), Some(first));
        assert_eq!(mode_of(&model, first), TimerMode::Alarming);
    }

    #[test]
    fn last_timer_alarms_and_reports_sequence_completed() {
        let mut model = model_with(&[&[1]]);
        let only = id_at(&model, 0, 0);
        model.start();
        model.tick();
        assert_eq!(mode_of(&model, only), TimerMode::Alarming);
        let events = model.poll_events();
        assert!(matches!(
            events.last(),
            Some(Event::SequenceCompleted { timer_id, .. }) if *timer_id == only
        ));
        assert_eq!(model.tick(), None);
    }

    #[test]
    fn zero_length_timers_cascade() {
        let mut model = model_with(&[&[2, 0, 0, 3]]);
        let last = id_at(&model, 0, 3);
        model.start();
        model.tick();
        model.tick();
        assert_eq!(model.selected_id(), Some(last));
        assert_eq!(mode_of(&model, last), TimerMode::Countdown);
        assert_eq!(model.selected_count(), 1);
    }

    #[test]
    fn end_fast_forwards_into_next_timer() {
        let mut model = model_with(&[&[60, 30]]);
        let second = id_at(&model, 0, 1);
        model.start();
        model.end();
        assert_eq!(model.selected_id(), Some(second));
        assert_eq!(mode_of(&model, second), TimerMode::Countdown);
    }

    #[test]
    fn set_elapsed_secs_rebases_selected_timer() {
        let mut model = model_with(&[&[60]]);
        model.start();
        model.poll_events();
        model.set_elapsed_secs(15);
        assert_eq!(
            model.selected_timer().unwrap().engine().current_time_secs(),
            45
        );
        assert!(matches!(
            model.poll_events()[0],
            Event::TimerSynced {
                current_time_secs: 45,
                ..
            }
        ));
    }

    #[test]
    fn commands_on_empty_model_do_nothing() {
        let mut model = TimerModel::new(&Config::default());
        assert_eq!(model.start(), None);
        assert_eq!(model.tick(), None);
        assert_eq!(model.set_current_time(3), None);
        assert_eq!(model.select_next().unwrap(), None);
        assert!(matches!(
            model.snapshot(),
            Event::StateSnapshot {
                timer_id: None,
                mode: TimerMode::Stopped,
                ..
            }
        ));
    }

    #[test]
    fn settings_roundtrip_through_from_settings() {
        let model = model_with(&[&[10, 20], &[30]]);
        let settings = model.settings();
        let rebuilt = TimerModel::from_settings(&Config::default(), &settings).unwrap();
        assert_eq!(rebuilt.settings(), settings);
        assert_eq!(rebuilt.selected_path(), Some(IndexPath::new(0, 0)));
        assert_eq!(rebuilt.pending_events(), 0);
    }

    #[test]
    fn from_settings_skips_empty_groups_and_checks_limits() {
        let empty = GroupSettings {
            display_type: DisplayType::Numerical,
            sound_type: SoundType::None,
            transition_sound_filename: None,
            timers: Vec::new(),
        };
        let model = TimerModel::from_settings(&Config::default(), &[empty]).unwrap();
        assert!(model.is_empty());

        let mut config = Config::default();
        config.limits.max_timers_per_group = 1;
        let settings = model_with(&[&[1, 2]]).settings();
        assert!(TimerModel::from_settings(&config, &settings).is_err());
    }

    #[test]
    fn snapshot_reports_selected_timer() {
        let mut model = model_with(&[&[10], &[20]]);
        model.select_path(IndexPath::new(1, 0)).unwrap();
        model.start();
        model.tick();
        match model.snapshot() {
            Event::StateSnapshot {
                group_index,
                timer_index,
                mode,
                current_time_secs,
                elapsed_secs,
                ..
            } => {
                assert_eq!(group_index, Some(1));
                assert_eq!(timer_index, Some(0));
                assert_eq!(mode, TimerMode::Countdown);
                assert_eq!(current_time_secs, 19);
                assert_eq!(elapsed_secs, 1);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
