//! Ordered timers that share display and sound settings.
//!
//! Groups are walls for navigation: `next_index`/`previous_index` never
//! wrap. Crossing into a neighbouring group is the model's job.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::node::Timer;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    #[default]
    Numerical,
    Circular,
    Stoplights,
}

/// What the alarm does when a timer in the group ends.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "file", rename_all = "snake_case")]
pub enum SoundType {
    #[default]
    None,
    Vibrate,
    Sound(String),
    SoundVibrate(String),
}

impl SoundType {
    pub fn filename(&self) -> Option<&str> {
        match self {
            SoundType::Sound(file) | SoundType::SoundVibrate(file) => Some(file),
            SoundType::None | SoundType::Vibrate => None,
        }
    }

    pub fn vibrates(&self) -> bool {
        matches!(self, SoundType::Vibrate | SoundType::SoundVibrate(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerGroup {
    id: Uuid,
    timers: Vec<Timer>,
    #[serde(default)]
    pub display_type: DisplayType,
    #[serde(default)]
    pub sound_type: SoundType,
    /// Played when the group moves from one timer to the next.
    #[serde(default)]
    pub transition_sound_filename: Option<String>,
}

impl TimerGroup {
    pub fn new(display_type: DisplayType, sound_type: SoundType) -> Self {
        Self {
            id: Uuid::new_v4(),
            timers: Vec::new(),
            display_type,
            sound_type,
            transition_sound_filename: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Timer> {
        self.timers.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Timer> {
        self.timers.get_mut(index)
    }

    pub fn first(&self) -> Option<&Timer> {
        self.timers.first()
    }

    pub fn last(&self) -> Option<&Timer> {
        self.timers.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Timer> {
        self.timers.iter()
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn index_of(&self, timer_id: Uuid) -> Option<usize> {
        self.timers.iter().position(|t| t.id() == timer_id)
    }

    pub fn contains(&self, timer_id: Uuid) -> bool {
        self.index_of(timer_id).is_some()
    }

    /// The timer that runs after `index`, if the group has one.
    pub fn next_index(&self, index: usize) -> Option<usize> {
        let next = index.checked_add(1)?;
        (next < self.timers.len()).then_some(next)
    }

    /// The timer that runs before `index`, if the group has one.
    pub fn previous_index(&self, index: usize) -> Option<usize> {
        if index >= self.timers.len() {
            return None;
        }
        index.checked_sub(1)
    }

    // Structural edits go through the model so selection stays consistent.

    pub(crate) fn push(&mut self, mut timer: Timer) -> usize {
        timer.set_group_id(self.id);
        self.timers.push(timer);
        self.timers.len() - 1
    }

    pub(crate) fn insert(&mut self, index: usize, mut timer: Timer) -> Result<(), ValidationError> {
        if index > self.timers.len() {
            return Err(self.out_of_bounds(index));
        }
        timer.set_group_id(self.id);
        self.timers.insert(index, timer);
        Ok(())
    }

    pub(crate) fn remove(&mut self, index: usize) -> Result<Timer, ValidationError> {
        if index >= self.timers.len() {
            return Err(self.out_of_bounds(index));
        }
        Ok(self.timers.remove(index))
    }

    pub(crate) fn move_timer(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        let len = self.timers.len();
        if from >= len {
            return Err(self.out_of_bounds(from));
        }
        if to >= len {
            return Err(self.out_of_bounds(to));
        }
        let timer = self.timers.remove(from);
        self.timers.insert(to, timer);
        Ok(())
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Timer> {
        self.timers.iter_mut()
    }

    fn out_of_bounds(&self, index: usize) -> ValidationError {
        ValidationError::OutOfBounds {
            collection: "group".into(),
            index,
            len: self.timers.len(),
        }
    }
}

impl Default for TimerGroup {
    fn default() -> Self {
        Self::new(DisplayType::default(), SoundType::default())
    }
}

impl Index<usize> for TimerGroup {
    type Output = Timer;

    fn index(&self, index: usize) -> &Timer {
        &self.timers[index]
    }
}

impl<'a> IntoIterator for &'a TimerGroup {
    type Item = &'a Timer;
    type IntoIter = std::slice::Iter<'a, Timer>;

    fn into_iter(self) -> Self::IntoIter {
        self.timers.iter()
    }
}
