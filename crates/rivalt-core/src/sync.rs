//! Commands exchanged with a paired device.
//!
//! The transport is the host's business. A message carries a discrete
//! command and, optionally, the sender's coarse sync value: the elapsed
//! seconds of its selected timer. The receiver applies the command and
//! then rebases to the sync value so both displays agree.

use serde::{Deserialize, Serialize};

use crate::model::TimerModel;
use crate::timer::{TimerMode, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SyncCommand {
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
    FastForward,
    SetTime { elapsed_secs: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMessage {
    #[serde(flatten)]
    pub command: SyncCommand,
    /// Elapsed seconds on the sender's selected timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<u64>,
}

impl SyncMessage {
    pub fn new(command: SyncCommand) -> Self {
        Self {
            command,
            sync: None,
        }
    }

    /// A message stamped with the model's current sync value.
    pub fn outgoing(command: SyncCommand, model: &TimerModel) -> Self {
        Self {
            command,
            sync: model.selected_timer().map(|t| t.engine().elapsed_secs()),
        }
    }
}

impl TimerModel {
    /// Apply a message from the paired device to the selected timer.
    ///
    /// The sync value is only applied to a running or paused timer; a
    /// stopped timer keeps its rewound value.
    pub fn apply_sync(&mut self, message: &SyncMessage) -> Option<Transition> {
        tracing::debug!(?message, "applying sync message");
        let transition = match message.command {
            SyncCommand::Start => self.start(),
            SyncCommand::Pause => self.pause(),
            SyncCommand::Resume => self.resume(),
            SyncCommand::Stop => self.stop(),
            SyncCommand::Reset => self.reset(),
            SyncCommand::FastForward => self.end(),
            SyncCommand::SetTime { elapsed_secs } => self.set_elapsed_secs(elapsed_secs),
        };

        let Some(elapsed) = message.sync else {
            return transition;
        };
        let active = self.selected_timer().is_some_and(|t| {
            let mode = t.engine().mode();
            mode.is_running() || mode == TimerMode::Paused
        });
        if !active {
            return transition;
        }
        self.set_elapsed_secs(elapsed).or(transition)
    }
}
