//! Config mapping, simulator assembly, and the plan/simulate commands.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use charge_config::Config;
use charge_core::error::Result as CoreResult;
use charge_core::runner::{RunParams, RunSummary, TickHost};
use charge_core::util::start_current;
use charge_core::{Report, SharedRequest, TargetChargeRequest, TargetChargeScheduler, TickOutcome};
use charge_sim::{Sim, SimCharger, SimParams};
use charge_traits::{BoxError, Clock, ManualClock, Publisher, Signal};
use chrono::{DateTime, TimeDelta, Utc};

use crate::cli::TargetArgs;

/// Env hook for tests: inject a charger fault with this message.
const FAULT_ENV: &str = "CHARGE_TEST_SIM_FAULT";

/// Longest uninterrupted sleep while pacing a `--realtime` run.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

pub fn sim_params(cfg: &Config) -> SimParams {
    SimParams {
        capacity_wh: cfg.vehicle.capacity_kwh * 1000.0,
        soc: cfg.vehicle.soc,
        efficiency: cfg.vehicle.efficiency,
        phases: cfg.loadpoint.phases,
        voltage: cfg.loadpoint.voltage,
        ramp_step_a: cfg.charger.ramp_step_a,
    }
}

/// Resolve the request from CLI flags, then `[target]`, relative to `now`.
pub fn resolve_target(
    cfg: &Config,
    args: &TargetArgs,
    now: DateTime<Utc>,
) -> CoreResult<(u8, DateTime<Utc>)> {
    let from_cfg = cfg.target.as_ref();
    let soc = args
        .soc
        .or_else(|| from_cfg.map(|t| t.soc))
        .ok_or_else(|| eyre::eyre!("no target soc given; pass --soc or set target.soc"))?;

    let minutes = |m: u64| {
        i64::try_from(m)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| eyre::eyre!("deadline {m} minutes from now is out of range"))
    };
    let time = match (args.at, args.in_minutes) {
        (Some(t), _) => t,
        (None, Some(m)) => minutes(m)?,
        (None, None) => match from_cfg.map(|t| (t.time, t.in_minutes)) {
            Some((Some(t), _)) => t,
            Some((None, Some(m))) => minutes(m)?,
            _ => eyre::bail!("no deadline given; pass --at or --in-minutes"),
        },
    };
    Ok((soc, time))
}

/// Publisher forwarding signals to the log.
struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&mut self, signal: Signal, value: bool) -> Result<(), BoxError> {
        tracing::debug!(signal = %signal, value, "publish");
        Ok(())
    }
}

/// Simulator plus the scheduler wired to it.
pub struct Rig {
    pub sim: Sim,
    pub charger: SimCharger,
    pub clock: ManualClock,
    pub scheduler: TargetChargeScheduler,
}

pub fn build_rig(cfg: &Config, start: DateTime<Utc>) -> CoreResult<Rig> {
    let sim = Sim::new(sim_params(cfg))?;
    if let Ok(msg) = std::env::var(FAULT_ENV) {
        sim.inject_fault(msg);
    }
    let clock = ManualClock::new(start);
    let charger = sim.charger();
    let scheduler = TargetChargeScheduler::builder()
        .with_meter(charger.clone())
        .with_ramper(charger.clone())
        .with_estimator(sim.vehicle())
        .with_publisher(LogPublisher)
        .with_loadpoint((&cfg.loadpoint).into())
        .with_tuning((&cfg.scheduler).into())
        .with_clock(clock.clone())
        .try_build()?;
    Ok(Rig {
        sim,
        charger,
        clock,
        scheduler,
    })
}

/// Result of a single `plan` evaluation.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub now: DateTime<Utc>,
    pub target_soc: u8,
    pub target_time: DateTime<Utc>,
    pub soc: f64,
    pub start_current_a: u32,
    pub estimated_finish: Option<DateTime<Utc>>,
    pub charge_required: bool,
}

impl PlanReport {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "timestamp": self.now.timestamp(),
            "target_soc": self.target_soc,
            "target_time": self.target_time.to_rfc3339(),
            "soc": self.soc,
            "start_current_a": self.start_current_a,
            "estimated_finish": self.estimated_finish.map(|t| t.to_rfc3339()),
            "charge_required": self.charge_required,
        })
    }
}

pub fn run_plan(cfg: &Config, target: &TargetArgs, now: DateTime<Utc>) -> CoreResult<PlanReport> {
    let mut rig = build_rig(cfg, now)?;
    let (soc, time) = resolve_target(cfg, target, now)?;
    let mut req = TargetChargeRequest::default();
    rig.scheduler.set_target(&mut req, soc, time)?;
    let required = rig.scheduler.start_required(&mut req)?;
    let lp = rig.scheduler.loadpoint();
    Ok(PlanReport {
        now,
        target_soc: soc,
        target_time: time,
        soc: rig.sim.soc(),
        start_current_a: start_current(lp.min_current, lp.max_current, rig.scheduler.tuning().utilization),
        estimated_finish: req.estimated_finish(),
        charge_required: required,
    })
}

/// Tick host advancing the simulated world between ticks.
struct SimHost {
    sim: Sim,
    charger: SimCharger,
    clock: ManualClock,
    realtime: bool,
    json: bool,
    shutdown: Arc<AtomicBool>,
    tick_no: u64,
}

impl SimHost {
    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Sleep for `tick` in slices; false if shutdown cut it short.
    fn pace(&self, tick: Duration) -> bool {
        let mut left = tick;
        while !left.is_zero() {
            if self.shutdown_requested() {
                return false;
            }
            let slice = left.min(SLEEP_SLICE);
            std::thread::sleep(slice);
            left -= slice;
        }
        !self.shutdown_requested()
    }

    fn stop_on_shutdown(&mut self) -> ControlFlow<()> {
        if self.shutdown_requested() {
            tracing::warn!("shutdown requested; stopping");
            self.charger.stop();
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn report(&self, state: &str, finish: Option<DateTime<Utc>>, current: Option<u32>) {
        let now = self.clock.now();
        let soc = self.sim.soc();
        if self.json {
            println!(
                "{}",
                serde_json::json!({
                    "tick": self.tick_no,
                    "time": now.to_rfc3339(),
                    "state": state,
                    "soc": soc,
                    "current_a": current,
                    "finish": finish.map(|t| t.to_rfc3339()),
                })
            );
        } else {
            tracing::info!(tick = self.tick_no, time = %now, state, soc, ?current, "tick");
        }
    }
}

impl TickHost for SimHost {
    fn on_tick(&mut self, outcome: &TickOutcome) -> ControlFlow<()> {
        self.tick_no += 1;
        match *outcome {
            TickOutcome::Idle => {
                self.charger.stop();
                self.report("idle", None, None);
                return ControlFlow::Break(());
            }
            TickOutcome::Waiting { finish } => {
                self.charger.stop();
                self.report("waiting", Some(finish), None);
            }
            TickOutcome::Charging { finish, decision } => {
                self.report(decision.adjustment.as_str(), Some(finish), Some(decision.current));
            }
        }
        self.stop_on_shutdown()
    }

    fn on_error(&mut self, err: &Report) -> ControlFlow<()> {
        self.tick_no += 1;
        tracing::warn!(tick = self.tick_no, error = %err, "tick failed");
        self.stop_on_shutdown()
    }

    fn wait(&mut self, tick: Duration) {
        // interrupted: the next tick sees the flag and ends the run
        if self.realtime && !self.pace(tick) {
            return;
        }
        self.sim.advance(tick);
        match TimeDelta::from_std(tick) {
            Ok(d) => self.clock.advance(d),
            Err(_) => self.clock.set(DateTime::<Utc>::MAX_UTC),
        }
    }
}

/// Outcome of a `simulate` run.
#[derive(Debug, Clone)]
pub struct SimReport {
    pub summary: RunSummary,
    pub target_soc: u8,
    pub target_time: DateTime<Utc>,
    pub final_soc: f64,
    pub finished_at: DateTime<Utc>,
}

impl SimReport {
    pub fn reached(&self) -> bool {
        self.final_soc >= f64::from(self.target_soc)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ticks": self.summary.ticks,
            "charging_ticks": self.summary.charging_ticks,
            "failed_ticks": self.summary.failed_ticks,
            "target_soc": self.target_soc,
            "target_time": self.target_time.to_rfc3339(),
            "final_soc": self.final_soc,
            "finished_at": self.finished_at.to_rfc3339(),
            "reached": self.reached(),
        })
    }
}

pub struct SimOptions {
    pub max_ticks: u64,
    pub realtime: bool,
    pub json: bool,
}

pub fn run_simulation(
    cfg: &Config,
    target: &TargetArgs,
    start: DateTime<Utc>,
    opts: &SimOptions,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<SimReport> {
    let mut rig = build_rig(cfg, start)?;
    let (soc, time) = resolve_target(cfg, target, start)?;
    let mut req = TargetChargeRequest::default();
    rig.scheduler.set_target(&mut req, soc, time)?;
    let shared = SharedRequest::new(req);

    let mut params: RunParams = (&cfg.runner).into();
    params.max_ticks = opts.max_ticks;

    tracing::info!(target_soc = soc, target_time = %time, soc = rig.sim.soc(), "simulation start");
    let mut host = SimHost {
        sim: rig.sim.clone(),
        charger: rig.charger.clone(),
        clock: rig.clock.clone(),
        realtime: opts.realtime,
        json: opts.json,
        shutdown,
        tick_no: 0,
    };
    let summary = charge_core::runner::run(&mut rig.scheduler, &shared, &mut host, &params)?;
    rig.charger.stop();

    Ok(SimReport {
        summary,
        target_soc: soc,
        target_time: time,
        final_soc: rig.sim.soc(),
        finished_at: rig.clock.now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use charge_traits::Ramper;

    fn cfg(extra: &str) -> Config {
        let s = format!("[loadpoint]\nmin_current = 6\nmax_current = 16\n{extra}");
        charge_config::load_toml(&s).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_760_400_000, 0).unwrap()
    }

    #[test]
    fn flags_override_config_target() {
        let c = cfg("[target]\nsoc = 60\nin_minutes = 120\n");
        let args = TargetArgs {
            soc: Some(80),
            at: None,
            in_minutes: Some(30),
        };
        let (soc, time) = resolve_target(&c, &args, t0()).unwrap();
        assert_eq!(soc, 80);
        assert_eq!(time, t0() + TimeDelta::minutes(30));
    }

    #[test]
    fn config_target_used_without_flags() {
        let c = cfg("[target]\nsoc = 60\nin_minutes = 120\n");
        let (soc, time) = resolve_target(&c, &TargetArgs::default(), t0()).unwrap();
        assert_eq!(soc, 60);
        assert_eq!(time, t0() + TimeDelta::hours(2));
    }

    #[test]
    fn missing_target_is_an_error() {
        let c = cfg("");
        let err = resolve_target(&c, &TargetArgs::default(), t0()).unwrap_err();
        assert!(err.to_string().contains("--soc"));
    }

    #[test]
    fn plan_with_tight_deadline_requires_charging() {
        // 60% of 50 kWh at 0.9 efficiency needs far more than one hour
        let c = cfg("");
        let args = TargetArgs {
            soc: Some(80),
            at: None,
            in_minutes: Some(60),
        };
        let report = run_plan(&c, &args, t0()).unwrap();
        assert!(report.charge_required);
        assert_eq!(report.start_current_a, 10);
    }

    #[test]
    fn plan_with_loose_deadline_waits() {
        let c = cfg("");
        let args = TargetArgs {
            soc: Some(30),
            at: None,
            in_minutes: Some(24 * 60),
        };
        let report = run_plan(&c, &args, t0()).unwrap();
        assert!(!report.charge_required);
        assert!(report.estimated_finish.is_some());
    }

    #[test]
    fn simulation_reaches_reachable_target() {
        let c = cfg("");
        let args = TargetArgs {
            soc: Some(40),
            at: None,
            in_minutes: Some(6 * 60),
        };
        let opts = SimOptions {
            max_ticks: 0,
            realtime: false,
            json: false,
        };
        let report = run_simulation(&c, &args, t0(), &opts, Arc::new(AtomicBool::new(false))).unwrap();
        // charging stops once the projection meets the deadline, so the
        // last minute of charge may be missing
        assert!(report.final_soc > 39.0, "final soc {}", report.final_soc);
        assert!(report.summary.charging_ticks > 0);
        assert!(report.finished_at > report.target_time);
    }

    fn host(c: &Config, shutdown: Arc<AtomicBool>) -> SimHost {
        let sim = Sim::new(sim_params(c)).unwrap();
        SimHost {
            charger: sim.charger(),
            sim,
            clock: ManualClock::new(t0()),
            realtime: true,
            json: false,
            shutdown,
            tick_no: 0,
        }
    }

    #[test]
    fn shutdown_requested_before_start_runs_one_tick() {
        let c = cfg("[runner]\ntick_s = 3600\n");
        let args = TargetArgs {
            soc: Some(100),
            at: None,
            in_minutes: Some(30),
        };
        let opts = SimOptions {
            max_ticks: 0,
            realtime: true,
            json: false,
        };
        let started = std::time::Instant::now();
        let report = run_simulation(&c, &args, t0(), &opts, Arc::new(AtomicBool::new(true))).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.summary.ticks, 1);
        assert_eq!(report.summary.charging_ticks, 1);
        // nothing was delivered and the clock never moved
        assert_eq!(report.final_soc, 20.0);
        assert_eq!(report.finished_at, t0());
    }

    #[test]
    fn shutdown_cuts_a_realtime_wait_short() {
        let c = cfg("");
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut h = host(&c, Arc::clone(&shutdown));
        h.charger.ramp(10).unwrap();

        let flag = Arc::clone(&shutdown);
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::Relaxed);
        });
        let started = std::time::Instant::now();
        h.wait(Duration::from_secs(3600));
        setter.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(h.clock.now(), t0());
        assert_eq!(h.sim.soc(), 20.0);

        let outcome = TickOutcome::Charging {
            finish: t0() + TimeDelta::hours(1),
            decision: charge_core::RampDecision {
                adjustment: charge_core::Adjustment::Hold,
                current: 10,
            },
        };
        assert!(h.on_tick(&outcome).is_break());
        assert!(!h.charger.is_enabled());
    }

    #[test]
    fn shutdown_ends_the_run_after_a_failed_tick() {
        let c = cfg("");
        let mut h = host(&c, Arc::new(AtomicBool::new(true)));
        h.charger.ramp(10).unwrap();
        let err = eyre::eyre!("charger busy");
        assert!(h.on_error(&err).is_break());
        assert!(!h.charger.is_enabled());
    }

    #[test]
    fn uninterrupted_wait_advances_clock_and_sim() {
        let c = cfg("");
        let mut h = host(&c, Arc::new(AtomicBool::new(false)));
        h.realtime = false;
        h.charger.ramp(10).unwrap();
        h.wait(Duration::from_secs(60));
        assert_eq!(h.clock.now(), t0() + TimeDelta::minutes(1));
        assert!(h.sim.soc() > 20.0);
    }
}
