//! # RiValT Core Library
//!
//! Host-agnostic countdown logic for a multi-timer "stoplight" timer.
//! The phone, watch and CLI front ends are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-driven countdown state machine with warning
//!   and final thresholds. The host calls `tick()` once per second.
//! - **Groups and Model**: timers are ordered in groups, groups in the
//!   model. The model owns the single selection and advances from one
//!   timer to the next when an alarm sounds.
//! - **Events**: every state change is queued as an [`Event`] the host
//!   polls, or dispatches to a [`TimerObserver`].
//! - **Sync**: commands and elapsed-time values from a paired device.
//! - **Storage**: TOML configuration and a JSON snapshot of the model.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core countdown state machine
//! - [`TimerModel`]: Groups, selection, sequencing
//! - [`Config`]: Application configuration, passed to the model explicitly

pub mod error;
pub mod events;
pub mod model;
pub mod storage;
pub mod sync;
pub mod timer;

pub use error::{ConfigError, CoreError, ValidationError};
pub use events::{Event, TimerObserver};
pub use model::{GroupSettings, IndexPath, TimerModel};
pub use storage::{Config, ModelStore};
pub use sync::{SyncCommand, SyncMessage};
pub use timer::{
    DisplayType, SoundType, Thresholds, Tick, Timer, TimerEngine, TimerGroup, TimerMode, Transition,
};
