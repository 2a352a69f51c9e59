mod engine;
mod group;
mod node;
mod thresholds;

pub use engine::{Tick, TimerEngine, TimerMode, Transition};
pub use group::{DisplayType, SoundType, TimerGroup};
pub use node::Timer;
pub use thresholds::Thresholds;
