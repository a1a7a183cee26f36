#![no_main]
use std::time::Duration;

use charge_core::mocks::{FixedEstimator, NoopPublisher};
use charge_core::{LoadpointCfg, TargetChargeRequest, TargetChargeScheduler};
use charge_traits::{BoxError, CurrentMeter, ManualClock, Ramper};
use chrono::{DateTime, TimeDelta, Utc};
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, Mutex};

#[derive(Debug, Arbitrary)]
enum Op {
    Set { soc: u8, ahead_min: u16 },
    Reset,
    Advance { secs: u16 },
    Remaining { mins: u32 },
    Meter { amps: u8 },
    Tick,
}

#[derive(Debug, Arbitrary)]
struct Input {
    min: u8,
    span: u8,
    ops: Vec<Op>,
}

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<u32>>);

impl CurrentMeter for Shared {
    fn effective_current(&self) -> u32 {
        *self.0.lock().unwrap()
    }
}

struct Sink(u32);

impl Ramper for Sink {
    fn target_current(&self) -> u32 {
        self.0
    }
    fn ramp(&mut self, amps: u32) -> Result<(), BoxError> {
        self.0 = amps;
        Ok(())
    }
}

fuzz_target!(|input: Input| {
    let t0 = DateTime::<Utc>::from_timestamp(1_760_400_000, 0).unwrap();
    let lp = LoadpointCfg {
        min_current: u32::from(input.min),
        max_current: (u32::from(input.min) + u32::from(input.span)).max(1),
        ..LoadpointCfg::default()
    };
    let clock = ManualClock::new(t0);
    let meter = Shared::default();
    let estimator = FixedEstimator::new(Duration::ZERO);
    let mut s = TargetChargeScheduler::builder()
        .with_meter(meter.clone())
        .with_ramper(Sink(0))
        .with_estimator(estimator.clone())
        .with_publisher(NoopPublisher)
        .with_loadpoint(lp.clone())
        .with_clock(clock.clone())
        .build()
        .unwrap();
    let mut req = TargetChargeRequest::default();

    for op in input.ops {
        match op {
            Op::Set { soc, ahead_min } => {
                let at = s.now() + TimeDelta::minutes(i64::from(ahead_min));
                let _ = s.set_target(&mut req, soc, at);
            }
            Op::Reset => s.reset(&mut req),
            Op::Advance { secs } => clock.advance(TimeDelta::seconds(i64::from(secs))),
            Op::Remaining { mins } => estimator.set_remaining(Duration::from_secs(u64::from(mins) * 60)),
            Op::Meter { amps } => *meter.0.lock().unwrap() = u32::from(amps),
            Op::Tick => {
                let out = s.tick(&mut req).unwrap();
                if let charge_core::TickOutcome::Charging { decision, .. } = out {
                    assert!(decision.current >= lp.min_current && decision.current <= lp.max_current);
                }
                assert_eq!(out.charge_required(), req.charge_required());
            }
        }
    }
});
