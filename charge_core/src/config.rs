//! Configuration types for the scheduler.
//!
//! These are the runtime configuration structs used by `SchedulerCore`.
//! They are separate from the TOML-deserialized config in `charge_config`.

use chrono::TimeDelta;

/// Electrical limits of the loadpoint the scheduler drives.
#[derive(Debug, Clone)]
pub struct LoadpointCfg {
    /// Lowest current accepted while charging (A).
    pub min_current: u32,
    /// Highest current the charger may deliver (A).
    pub max_current: u32,
    /// Active phase count.
    pub phases: u32,
    /// Nominal line voltage (V).
    pub voltage: f64,
}

impl Default for LoadpointCfg {
    fn default() -> Self {
        Self {
            min_current: 6,
            max_current: 16,
            phases: 3,
            voltage: 230.0,
        }
    }
}

/// Tuning of the start-current heuristic and the adjustment dead-band.
#[derive(Debug, Clone)]
pub struct SchedulerCfg {
    /// Fraction of `max_current` assumed when nothing is delivered yet. Default: 0.6.
    pub utilization: f64,
    /// Finish times in `[target - deviation, target]` hold the current. Default: 30 min.
    pub deviation: TimeDelta,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            utilization: 0.6,
            deviation: TimeDelta::minutes(30),
        }
    }
}
