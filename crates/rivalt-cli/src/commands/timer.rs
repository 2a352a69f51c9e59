use clap::Subcommand;
use rivalt_core::IndexPath;

use super::{CliResult, Session, ThresholdArgs};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the selected timer from its full duration
    Start,
    /// Pause the selected timer
    Pause,
    /// Resume a paused timer
    Resume,
    /// Stop the selected timer without rewinding
    Stop,
    /// Stop and rewind the selected timer
    Reset,
    /// Fast-forward the selected timer to its alarm
    End,
    /// Count off seconds on the selected timer
    Tick {
        /// Number of one-second ticks
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,
    },
    /// Rebase the selected timer to an elapsed-seconds value
    SetTime {
        /// Seconds elapsed since the start
        elapsed: u64,
    },
    /// Print the selected timer's state as JSON
    Status,
    /// Add a timer to a group, or a new group if none is given
    Add {
        /// Group index to append to
        #[arg(long)]
        group: Option<usize>,
        /// Select the new timer
        #[arg(long)]
        select: bool,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Change a stopped timer's duration and thresholds
    Edit {
        /// Timer path as <group>.<timer>
        path: IndexPath,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Remove a timer
    Remove {
        /// Timer path as <group>.<timer>
        path: IndexPath,
    },
    /// Move a timer within or between groups
    Move {
        from: IndexPath,
        to: IndexPath,
    },
    /// Select a timer
    Select {
        /// Timer path as <group>.<timer>
        path: IndexPath,
    },
    /// Select the following timer
    Next,
    /// Select the preceding timer
    Previous,
}

pub fn run(action: TimerAction) -> CliResult {
    let mut session = Session::open()?;
    let model = &mut session.model;

    match action {
        TimerAction::Start => {
            model.start();
        }
        TimerAction::Pause => {
            model.pause();
        }
        TimerAction::Resume => {
            model.resume();
        }
        TimerAction::Stop => {
            model.stop();
        }
        TimerAction::Reset => {
            model.reset();
        }
        TimerAction::End => {
            model.end();
        }
        TimerAction::Tick { count } => {
            for _ in 0..count {
                if model.tick().is_none() {
                    break;
                }
            }
        }
        TimerAction::SetTime { elapsed } => {
            model.set_elapsed_secs(elapsed);
        }
        TimerAction::Status => {
            println!("{}", serde_json::to_string_pretty(&model.snapshot())?);
            return Ok(());
        }
        TimerAction::Add {
            group,
            select,
            thresholds,
        } => {
            let thresholds = thresholds.apply(model.default_thresholds());
            match group {
                Some(group) => model.add_timer(group, thresholds, select)?,
                None => model.add_group(thresholds, select)?,
            };
        }
        TimerAction::Edit { path, thresholds } => {
            let current = model
                .timer_at(path)
                .map(|t| t.engine().thresholds())
                .ok_or_else(|| format!("no timer at {path}"))?;
            model.set_thresholds(path, thresholds.apply(current))?;
        }
        TimerAction::Remove { path } => {
            model.remove_timer(path)?;
        }
        TimerAction::Move { from, to } => {
            model.move_timer(from, to)?;
        }
        TimerAction::Select { path } => {
            model.select_path(path)?;
        }
        TimerAction::Next => {
            model.select_next()?;
        }
        TimerAction::Previous => {
            model.select_previous()?;
        }
    }

    session.report()?;
    session.save()
}
