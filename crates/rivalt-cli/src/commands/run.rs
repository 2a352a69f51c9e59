use std::time::Duration;

use clap::Args;
use rivalt_core::{TimerMode, TimerModel};

use super::{CliResult, Session};

#[derive(Args)]
pub struct RunArgs {
    /// Milliseconds per tick; the engine counts one second per tick
    #[arg(long, default_value = "1000")]
    tick_ms: u64,
}

/// Print queued events as JSON lines. Returns false once the selected
/// timer is no longer counting down.
fn drain(model: &mut TimerModel) -> Result<bool, serde_json::Error> {
    for event in model.poll_events() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(model
        .selected_timer()
        .is_some_and(|t| t.engine().mode().is_running()))
}

async fn tick_loop(model: &mut TimerModel, tick_ms: u64) -> CliResult {
    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                model.tick();
                if !drain(model)? {
                    tracing::info!("selected timer halted");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, pausing");
                model.pause();
                drain(model)?;
                break;
            }
        }
    }
    Ok(())
}

pub fn run(args: RunArgs) -> CliResult {
    let mut session = Session::open()?;
    let model = &mut session.model;
    if model.is_empty() {
        return Err("no timers; add one with `timer add`".into());
    }

    match model.selected_timer().map(|t| t.engine().mode()) {
        Some(TimerMode::Stopped) => {
            model.start();
        }
        Some(TimerMode::Paused) => {
            model.resume();
        }
        _ => {}
    }

    if drain(model)? {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(tick_loop(model, args.tick_ms))?;
    }

    println!("{}", serde_json::to_string(&model.snapshot())?);
    session.save()
}
