#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the target-time charge planner.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Only `[loadpoint]` is mandatory; every other section has defaults.
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Electrical limits of the loadpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct LoadpointCfg {
    /// Lowest current the charger accepts while charging (A)
    pub min_current: u32,
    /// Highest current the charger may deliver (A)
    pub max_current: u32,
    /// Active phase count (1..=3)
    #[serde(default = "default_phases")]
    pub phases: u32,
    /// Nominal line voltage (V)
    #[serde(default = "default_voltage")]
    pub voltage: f64,
}

fn default_phases() -> u32 {
    3
}

fn default_voltage() -> f64 {
    230.0
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerCfg {
    /// Assumed fraction of max current when nothing is being delivered yet
    pub utilization: f64,
    /// Dead-band before the deadline in which current is held (minutes)
    pub deviation_min: u64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            utilization: 0.6,
            deviation_min: 30,
        }
    }
}

/// Simulated vehicle battery.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VehicleCfg {
    pub capacity_kwh: f64,
    /// SoC at simulation start (%)
    pub soc: f64,
    /// Grid-to-battery efficiency (0.0, 1.0]
    pub efficiency: f64,
}

impl Default for VehicleCfg {
    fn default() -> Self {
        Self {
            capacity_kwh: 50.0,
            soc: 20.0,
            efficiency: 0.9,
        }
    }
}

/// Simulated charger behaviour.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChargerCfg {
    /// Amps the delivered current moves towards its target per tick
    pub ramp_step_a: u32,
}

impl Default for ChargerCfg {
    fn default() -> Self {
        Self { ramp_step_a: 2 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerCfg {
    /// Evaluation tick length (seconds)
    pub tick_s: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self { tick_s: 60 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Optional default request used when the CLI gets no target flags.
#[derive(Debug, Deserialize, Clone)]
pub struct TargetCfg {
    pub soc: u8,
    /// Absolute deadline (RFC 3339)
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    /// Deadline relative to start, used when `time` is absent
    #[serde(default)]
    pub in_minutes: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub loadpoint: LoadpointCfg,
    #[serde(default)]
    pub scheduler: SchedulerCfg,
    #[serde(default)]
    pub vehicle: VehicleCfg,
    #[serde(default)]
    pub charger: ChargerCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub target: Option<TargetCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Loadpoint
        let lp = &self.loadpoint;
        if lp.max_current == 0 {
            eyre::bail!("loadpoint.max_current must be > 0");
        }
        if lp.min_current > lp.max_current {
            eyre::bail!(
                "loadpoint.min_current ({}) must be <= loadpoint.max_current ({})",
                lp.min_current,
                lp.max_current
            );
        }
        if !(1..=3).contains(&lp.phases) {
            eyre::bail!("loadpoint.phases must be in 1..=3");
        }
        if !(lp.voltage.is_finite() && lp.voltage > 0.0) {
            eyre::bail!("loadpoint.voltage must be > 0");
        }

        // Scheduler
        let u = self.scheduler.utilization;
        if !(u > 0.0 && u <= 1.0) {
            eyre::bail!("scheduler.utilization must be in (0.0, 1.0]");
        }
        if self.scheduler.deviation_min > 24 * 60 {
            eyre::bail!("scheduler.deviation_min is unreasonably large (>24h)");
        }

        // Vehicle
        let v = &self.vehicle;
        if !(v.capacity_kwh.is_finite() && v.capacity_kwh > 0.0) {
            eyre::bail!("vehicle.capacity_kwh must be > 0");
        }
        if !(0.0..=100.0).contains(&v.soc) {
            eyre::bail!("vehicle.soc must be in [0, 100]");
        }
        if !(v.efficiency > 0.0 && v.efficiency <= 1.0) {
            eyre::bail!("vehicle.efficiency must be in (0.0, 1.0]");
        }

        // Charger
        if self.charger.ramp_step_a == 0 {
            eyre::bail!("charger.ramp_step_a must be >= 1");
        }

        // Runner
        if self.runner.tick_s == 0 {
            eyre::bail!("runner.tick_s must be >= 1");
        }
        if self.runner.tick_s > 60 * 60 {
            eyre::bail!("runner.tick_s is unreasonably large (>1h)");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {r:?}");
        }

        // Target
        if let Some(t) = &self.target {
            if t.soc > 100 {
                eyre::bail!("target.soc must be <= 100");
            }
            if t.time.is_none() && t.in_minutes.is_none() {
                eyre::bail!("target needs either target.time or target.in_minutes");
            }
        }

        Ok(())
    }
}
