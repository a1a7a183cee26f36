mod common;

use std::ops::ControlFlow;
use std::time::Duration;

use charge_core::runner::{RunParams, TickHost, run};
use charge_core::{ChargeError, Report, SharedRequest, TargetChargeRequest, TickOutcome};
use charge_traits::ManualClock;
use chrono::TimeDelta;
use common::{mins, rig, t0};

struct Host {
    clock: ManualClock,
    outcomes: Vec<TickOutcome>,
    errors: usize,
    stop_when_idle: bool,
    stop_on_error: bool,
}

impl Host {
    fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            outcomes: Vec::new(),
            errors: 0,
            stop_when_idle: true,
            stop_on_error: false,
        }
    }
}

impl TickHost for Host {
    fn on_tick(&mut self, outcome: &TickOutcome) -> ControlFlow<()> {
        self.outcomes.push(*outcome);
        if self.stop_when_idle && *outcome == TickOutcome::Idle {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn on_error(&mut self, _err: &Report) -> ControlFlow<()> {
        self.errors += 1;
        if self.stop_on_error {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn wait(&mut self, tick: Duration) {
        self.clock.advance(TimeDelta::from_std(tick).unwrap());
    }
}

#[test]
fn runs_until_deadline_passes() {
    let mut rig = rig(mins(180));
    let shared = SharedRequest::new(
        TargetChargeRequest::new(80, t0() + TimeDelta::hours(1)).unwrap(),
    );
    let mut host = Host::new(rig.clock.clone());
    let params = RunParams {
        tick: Duration::from_secs(15 * 60),
        ..RunParams::default()
    };

    let summary = run(&mut rig.scheduler, &shared, &mut host, &params).unwrap();
    // ticks at 0, 15, 30, 45, 60 min are active; 75 min is past the deadline
    assert_eq!(summary.ticks, 6);
    assert_eq!(summary.charging_ticks, 5);
    assert_eq!(summary.last_outcome, Some(TickOutcome::Idle));
    assert!(!shared.snapshot().charge_required());
    assert_eq!(rig.ramper.ramps(), vec![11, 12, 13, 14, 15]);
}

#[test]
fn max_ticks_bounds_the_run() {
    let mut rig = rig(mins(30));
    let shared = SharedRequest::new(
        TargetChargeRequest::new(80, t0() + TimeDelta::hours(10)).unwrap(),
    );
    let mut host = Host::new(rig.clock.clone());
    let params = RunParams {
        max_ticks: 4,
        ..RunParams::default()
    };
    let summary = run(&mut rig.scheduler, &shared, &mut host, &params).unwrap();
    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.charging_ticks, 0);
    assert!(matches!(host.outcomes[0], TickOutcome::Waiting { .. }));
}

#[test]
fn transient_ramp_failures_are_tolerated() {
    let mut rig = rig(mins(180));
    let shared = SharedRequest::new(
        TargetChargeRequest::new(80, t0() + TimeDelta::hours(2)).unwrap(),
    );
    *rig.ramper.fail.lock().unwrap() = Some("busy".into());
    let mut host = Host::new(rig.clock.clone());
    host.stop_when_idle = false;
    let params = RunParams {
        max_ticks: 3,
        max_consecutive_errors: 3,
        ..RunParams::default()
    };
    let summary = run(&mut rig.scheduler, &shared, &mut host, &params).unwrap();
    assert_eq!(summary.failed_ticks, 3);
    assert_eq!(host.errors, 3);
    // the mandate survives failed actuation
    assert!(shared.snapshot().charge_required());
}

#[test]
fn persistent_ramp_failure_aborts() {
    let mut rig = rig(mins(180));
    let shared = SharedRequest::new(
        TargetChargeRequest::new(80, t0() + TimeDelta::hours(2)).unwrap(),
    );
    *rig.ramper.fail.lock().unwrap() = Some("hardware fault".into());
    let mut host = Host::new(rig.clock.clone());
    let params = RunParams {
        max_consecutive_errors: 1,
        ..RunParams::default()
    };
    let err = run(&mut rig.scheduler, &shared, &mut host, &params).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChargeError>(),
        Some(ChargeError::Actuation { .. })
    ));
    assert_eq!(host.errors, 2);
}

#[test]
fn host_can_stop_after_a_failed_tick() {
    let mut rig = rig(mins(180));
    let shared = SharedRequest::new(
        TargetChargeRequest::new(80, t0() + TimeDelta::hours(2)).unwrap(),
    );
    *rig.ramper.fail.lock().unwrap() = Some("busy".into());
    let mut host = Host::new(rig.clock.clone());
    host.stop_on_error = true;

    let summary = run(&mut rig.scheduler, &shared, &mut host, &RunParams::default()).unwrap();
    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.failed_ticks, 1);
    assert_eq!(host.errors, 1);
    // no wait happened after the failed tick
    assert_eq!(rig.scheduler.now(), t0());
}
