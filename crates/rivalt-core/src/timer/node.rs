use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::engine::TimerEngine;
use super::thresholds::Thresholds;
use crate::error::ValidationError;

/// One countdown inside a [`TimerGroup`](super::TimerGroup).
///
/// Identity is the `id`: two timers are equal when their ids are, whatever
/// their engine state. The owning group is referenced by id and resolved
/// through the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    id: Uuid,
    group_id: Uuid,
    #[serde(default)]
    is_selected: bool,
    engine: TimerEngine,
}

impl Timer {
    /// # Errors
    ///
    /// Returns [`ValidationError::ThresholdOrder`] for out-of-order thresholds.
    pub fn new(group_id: Uuid, thresholds: Thresholds) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            is_selected: false,
            engine: TimerEngine::new(thresholds)?,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TimerEngine {
        &mut self.engine
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.is_selected = selected;
    }

    pub(crate) fn set_group_id(&mut self, group_id: Uuid) {
        self.group_id = group_id;
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Timer {}

impl Hash for Timer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
