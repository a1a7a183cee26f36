//! `From` implementations bridging `charge_config` types to `charge_core` types.

use chrono::TimeDelta;

use crate::config::{LoadpointCfg, SchedulerCfg};
use crate::runner::RunParams;

// ── LoadpointCfg ─────────────────────────────────────────────────────────────

impl From<&charge_config::LoadpointCfg> for LoadpointCfg {
    fn from(c: &charge_config::LoadpointCfg) -> Self {
        Self {
            min_current: c.min_current,
            max_current: c.max_current,
            phases: c.phases,
            voltage: c.voltage,
        }
    }
}

// ── SchedulerCfg ─────────────────────────────────────────────────────────────

impl From<&charge_config::SchedulerCfg> for SchedulerCfg {
    fn from(c: &charge_config::SchedulerCfg) -> Self {
        let minutes = i64::try_from(c.deviation_min).unwrap_or(i64::MAX);
        Self {
            utilization: c.utilization,
            deviation: TimeDelta::try_minutes(minutes).unwrap_or(TimeDelta::MAX),
        }
    }
}

// ── RunParams ────────────────────────────────────────────────────────────────

impl From<&charge_config::RunnerCfg> for RunParams {
    fn from(c: &charge_config::RunnerCfg) -> Self {
        Self {
            tick: std::time::Duration::from_secs(c.tick_s),
            ..Self::default()
        }
    }
}
