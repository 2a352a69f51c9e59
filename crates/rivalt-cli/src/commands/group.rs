use clap::{Subcommand, ValueEnum};
use rivalt_core::{DisplayType, SoundType, TimerModel};
use serde_json::json;

use super::{CliResult, Session, ThresholdArgs};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DisplayArg {
    Numerical,
    Circular,
    Stoplights,
}

impl From<DisplayArg> for DisplayType {
    fn from(display: DisplayArg) -> Self {
        match display {
            DisplayArg::Numerical => DisplayType::Numerical,
            DisplayArg::Circular => DisplayType::Circular,
            DisplayArg::Stoplights => DisplayType::Stoplights,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SoundArg {
    None,
    Vibrate,
    Sound,
    SoundVibrate,
}

#[derive(Subcommand)]
pub enum GroupAction {
    /// Append a new group holding one timer
    Add {
        /// Select the new group's timer
        #[arg(long)]
        select: bool,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Remove a group and all its timers
    Remove { index: usize },
    /// Move a group to another position
    Move { from: usize, to: usize },
    /// List groups and their timers as JSON
    List,
    /// Set how a group's timers are displayed
    Display {
        index: usize,
        #[arg(value_enum)]
        display: DisplayArg,
    },
    /// Set a group's alarm and transition sounds
    Sound {
        index: usize,
        #[arg(value_enum)]
        sound: SoundArg,
        /// Sound file, required for `sound` and `sound-vibrate`
        #[arg(long)]
        file: Option<String>,
        /// Sound played between timers of the group ("none" clears it)
        #[arg(long)]
        transition: Option<String>,
    },
}

fn sound_type(sound: SoundArg, file: Option<String>) -> Result<SoundType, String> {
    let require_file = || file.clone().ok_or_else(|| "--file is required for this sound".to_string());
    Ok(match sound {
        SoundArg::None => SoundType::None,
        SoundArg::Vibrate => SoundType::Vibrate,
        SoundArg::Sound => SoundType::Sound(require_file()?),
        SoundArg::SoundVibrate => SoundType::SoundVibrate(require_file()?),
    })
}

fn listing(model: &TimerModel) -> serde_json::Value {
    let groups: Vec<serde_json::Value> = model
        .groups()
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let timers: Vec<serde_json::Value> = group
                .iter()
                .enumerate()
                .map(|(index, timer)| {
                    let engine = timer.engine();
                    json!({
                        "index": index,
                        "id": timer.id(),
                        "selected": timer.is_selected(),
                        "mode": engine.mode(),
                        "starting_time_secs": engine.starting_time_secs(),
                        "warning_time_secs": engine.warning_time_secs(),
                        "final_time_secs": engine.final_time_secs(),
                        "current_time_secs": engine.current_time_secs(),
                    })
                })
                .collect();
            json!({
                "index": index,
                "id": group.id(),
                "display_type": group.display_type,
                "sound_type": group.sound_type,
                "transition_sound_filename": group.transition_sound_filename,
                "timers": timers,
            })
        })
        .collect();
    json!({
        "selected": model.selected_path().map(|p| p.to_string()),
        "groups": groups,
    })
}

pub fn run(action: GroupAction) -> CliResult {
    let mut session = Session::open()?;
    let model = &mut session.model;

    match action {
        GroupAction::Add { select, thresholds } => {
            let thresholds = thresholds.apply(model.default_thresholds());
            model.add_group(thresholds, select)?;
        }
        GroupAction::Remove { index } => {
            model.remove_group(index)?;
        }
        GroupAction::Move { from, to } => {
            model.move_group(from, to)?;
        }
        GroupAction::List => {
            println!("{}", serde_json::to_string_pretty(&listing(model))?);
            return Ok(());
        }
        GroupAction::Display { index, display } => {
            let group = model
                .group_mut(index)
                .ok_or_else(|| format!("no group at {index}"))?;
            group.display_type = display.into();
        }
        GroupAction::Sound {
            index,
            sound,
            file,
            transition,
        } => {
            let new_sound = sound_type(sound, file)?;
            let group = model
                .group_mut(index)
                .ok_or_else(|| format!("no group at {index}"))?;
            group.sound_type = new_sound;
            if let Some(transition) = transition {
                group.transition_sound_filename = (transition != "none").then_some(transition);
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&listing(&session.model))?);
    session.model.poll_events();
    session.save()
}
