//! Countdown duration and warn/final thresholds.
//!
//! A threshold of zero is disabled. Nonzero thresholds are remaining-time
//! boundaries and must be strictly ordered: `final < warning < starting`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Thresholds {
    /// Total countdown duration.
    pub starting_time_secs: u64,
    /// Remaining time at which the timer enters `Warning`.
    #[serde(default)]
    pub warning_time_secs: u64,
    /// Remaining time at which the timer enters `Final`.
    #[serde(default)]
    pub final_time_secs: u64,
}

impl Thresholds {
    pub fn new(starting_time_secs: u64, warning_time_secs: u64, final_time_secs: u64) -> Self {
        Self {
            starting_time_secs,
            warning_time_secs,
            final_time_secs,
        }
    }

    /// A plain countdown with no thresholds.
    pub fn countdown(starting_time_secs: u64) -> Self {
        Self::new(starting_time_secs, 0, 0)
    }

    /// Check the ordering invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ThresholdOrder`] when a nonzero threshold
    /// is not below the boundary above it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationError::ThresholdOrder {
                starting_secs: self.starting_time_secs,
                warning_secs: self.warning_time_secs,
                final_secs: self.final_time_secs,
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        let warning_ok =
            self.warning_time_secs == 0 || self.warning_time_secs < self.starting_time_secs;
        let final_ok = self.final_time_secs == 0 || self.final_time_secs < self.final_ceiling();
        warning_ok && final_ok
    }

    /// Pull out-of-order thresholds down to the nearest valid value.
    ///
    /// This is the editing policy: `warning = min(starting - 1, warning)`,
    /// then `final = min(warning - 1, final)` (or `starting - 1` when the
    /// warning threshold is disabled). The result always validates.
    pub fn clamped(self) -> Self {
        let warning_time_secs = self
            .warning_time_secs
            .min(self.starting_time_secs.saturating_sub(1));
        let clamped = Self {
            warning_time_secs,
            ..self
        };
        let final_time_secs = clamped
            .final_time_secs
            .min(clamped.final_ceiling().saturating_sub(1));
        Self {
            final_time_secs,
            ..clamped
        }
    }

    /// Exclusive upper bound for a nonzero final threshold.
    fn final_ceiling(&self) -> u64 {
        if self.warning_time_secs > 0 {
            self.warning_time_secs
        } else {
            self.starting_time_secs
        }
    }
}
