pub mod config;
pub mod group;
pub mod run;
pub mod sync;
pub mod timer;

use rivalt_core::{Config, Event, ModelStore, Thresholds, TimerModel};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// The persisted model plus where it goes back to.
pub struct Session {
    store: ModelStore,
    pub model: TimerModel,
}

impl Session {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let store = ModelStore::open()?;
        let model = store.load(&config)?;
        Ok(Self { store, model })
    }

    pub fn save(&self) -> CliResult {
        self.store.save(&self.model)?;
        Ok(())
    }

    /// Print queued events followed by a snapshot of the selected timer,
    /// as one JSON array.
    pub fn report(&mut self) -> CliResult {
        let mut events: Vec<Event> = self.model.poll_events();
        events.push(self.model.snapshot());
        println!("{}", serde_json::to_string_pretty(&events)?);
        Ok(())
    }
}

/// Duration flags shared by the commands that create or edit timers.
#[derive(clap::Args, Debug, Default)]
pub struct ThresholdArgs {
    /// Countdown length in seconds
    #[arg(long)]
    pub starting: Option<u64>,
    /// Seconds remaining when the warning starts (0 disables)
    #[arg(long)]
    pub warning: Option<u64>,
    /// Seconds remaining when the final phase starts (0 disables)
    #[arg(long = "final")]
    pub final_secs: Option<u64>,
}

impl ThresholdArgs {
    /// Overlay the given flags on `base`. Inherited thresholds are pulled
    /// below the new duration; explicit ones are kept as given, so
    /// out-of-order values are reported as errors.
    pub fn apply(&self, base: Thresholds) -> Thresholds {
        let starting = self.starting.unwrap_or(base.starting_time_secs);
        let warning = self
            .warning
            .unwrap_or_else(|| base.warning_time_secs.min(starting.saturating_sub(1)));
        let ceiling = if warning > 0 { warning } else { starting };
        let final_secs = self
            .final_secs
            .unwrap_or_else(|| base.final_time_secs.min(ceiling.saturating_sub(1)));
        Thresholds::new(starting, warning, final_secs)
    }
}
