//! Property tests for the countdown engine.
//!
//! These cover restartability, monotonic mode progression, and pause
//! transparency over arbitrary valid configurations.

use proptest::prelude::*;
use rivalt_core::{Thresholds, Tick, TimerEngine, TimerMode};

fn mode_rank(mode: TimerMode) -> u8 {
    match mode {
        TimerMode::Countdown => 0,
        TimerMode::Warning => 1,
        TimerMode::Final => 2,
        TimerMode::Alarming => 3,
        TimerMode::Stopped | TimerMode::Paused => u8::MAX,
    }
}

fn run(engine: &mut TimerEngine) -> Vec<Tick> {
    let mut ticks = Vec::new();
    while let Some(tick) = engine.tick() {
        ticks.push(tick);
    }
    ticks
}

fn thresholds() -> impl Strategy<Value = Thresholds> {
    (1u64..400, 0u64..400, 0u64..400)
        .prop_map(|(starting, warning, final_secs)| {
            Thresholds::new(starting, warning, final_secs).clamped()
        })
}

proptest! {
    #[test]
    fn stop_then_start_reproduces_tick_sequence(t in thresholds(), stop_after in 0usize..400) {
        let mut engine = TimerEngine::new(t).unwrap();
        engine.start();
        let reference = run(&mut engine);

        engine.stop();
        engine.start();
        for _ in 0..stop_after.min(reference.len()) {
            engine.tick();
        }
        engine.stop();
        engine.start();
        prop_assert_eq!(run(&mut engine), reference);
    }

    #[test]
    fn modes_never_move_backward_in_one_run(t in thresholds()) {
        let mut engine = TimerEngine::new(t).unwrap();
        engine.start();
        let mut last = mode_rank(engine.mode());
        for tick in run(&mut engine) {
            let rank = mode_rank(tick.mode);
            prop_assert!(rank >= last, "{:?} after rank {}", tick.mode, last);
            if let Some(transition) = tick.transition {
                prop_assert_eq!(transition.to, tick.mode);
            }
            last = rank;
        }
        prop_assert_eq!(engine.mode(), TimerMode::Alarming);
    }

    #[test]
    fn pausing_does_not_change_alarm_tick(
        t in thresholds(),
        pauses in proptest::collection::vec(0u64..400, 0..10),
    ) {
        let mut plain = TimerEngine::new(t).unwrap();
        plain.start();
        let expected = run(&mut plain).len();

        let mut engine = TimerEngine::new(t).unwrap();
        engine.start();
        let mut ticks = 0;
        let mut pause_points: Vec<u64> = pauses;
        pause_points.sort_unstable();
        let mut next_pause = pause_points.into_iter().peekable();
        while engine.mode() != TimerMode::Alarming {
            while next_pause.next_if(|p| *p <= ticks as u64).is_some() {
                engine.pause();
                // Paused engines ignore ticks.
                prop_assert!(engine.tick().is_none());
                engine.resume();
            }
            prop_assert!(engine.tick().is_some());
            ticks += 1;
        }
        prop_assert_eq!(ticks, expected);
    }

    #[test]
    fn every_tick_matches_threshold_table(t in thresholds()) {
        let mut engine = TimerEngine::new(t).unwrap();
        engine.start();
        for tick in run(&mut engine) {
            let r = tick.current_time_secs;
            let expected = if r == 0 {
                TimerMode::Alarming
            } else if t.final_time_secs > 0 && r <= t.final_time_secs {
                TimerMode::Final
            } else if t.warning_time_secs > 0 && r <= t.warning_time_secs {
                TimerMode::Warning
            } else {
                TimerMode::Countdown
            };
            prop_assert_eq!(tick.mode, expected);
        }
    }
}

#[test]
fn ten_five_two_example() {
    let mut engine = TimerEngine::new(Thresholds::new(10, 5, 2)).unwrap();
    engine.start();
    assert_eq!(engine.mode(), TimerMode::Countdown);
    let modes: Vec<(u64, TimerMode)> = run(&mut engine)
        .into_iter()
        .map(|t| (t.current_time_secs, t.mode))
        .collect();
    for (remaining, mode) in modes {
        let expected = match remaining {
            6..=10 => TimerMode::Countdown,
            3..=5 => TimerMode::Warning,
            1..=2 => TimerMode::Final,
            _ => TimerMode::Alarming,
        };
        assert_eq!(mode, expected, "remaining {remaining}");
    }
}

#[test]
fn final_at_or_above_warning_never_reaches_engine() {
    let bad = Thresholds::new(10, 5, 5);
    assert!(TimerEngine::new(bad).is_err());

    let mut engine = TimerEngine::new(Thresholds::countdown(10)).unwrap();
    assert!(engine.set_thresholds(bad).is_err());

    engine.set_thresholds(bad.clamped()).unwrap();
    let t = engine.thresholds();
    assert!(t.final_time_secs < t.warning_time_secs);
    assert!(t.warning_time_secs <= t.starting_time_secs);
}
