#![allow(dead_code)]

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use charge_core::mocks::{FixedEstimator, RecordingPublisher};
use charge_core::{LoadpointCfg, SchedulerCfg, TargetChargeScheduler};
use charge_traits::{CurrentMeter, ManualClock, Ramper};
use chrono::{DateTime, Utc};

pub fn t0() -> DateTime<Utc> {
    // 2025-10-14T00:00:00Z, a whole minute
    DateTime::<Utc>::from_timestamp(1_760_400_000, 0).unwrap()
}

/// Meter spy with a settable reading.
#[derive(Default, Clone)]
pub struct SpyMeter {
    pub amps: Arc<Mutex<u32>>,
}
impl CurrentMeter for SpyMeter {
    fn effective_current(&self) -> u32 {
        *self.amps.lock().unwrap()
    }
}

/// Ramper spy recording every requested current; can be told to fail.
#[derive(Default, Clone)]
pub struct SpyRamper {
    pub target: Arc<Mutex<u32>>,
    pub ramps: Arc<Mutex<Vec<u32>>>,
    pub fail: Arc<Mutex<Option<String>>>,
}
impl SpyRamper {
    pub fn at(amps: u32) -> Self {
        let r = Self::default();
        *r.target.lock().unwrap() = amps;
        r
    }
    pub fn ramps(&self) -> Vec<u32> {
        self.ramps.lock().unwrap().clone()
    }
}
impl Ramper for SpyRamper {
    fn target_current(&self) -> u32 {
        *self.target.lock().unwrap()
    }
    fn ramp(&mut self, amps: u32) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(msg) = self.fail.lock().unwrap().clone() {
            return Err(msg.into());
        }
        *self.target.lock().unwrap() = amps;
        self.ramps.lock().unwrap().push(amps);
        Ok(())
    }
}

/// Handles a test keeps after the scheduler took ownership of its collaborators.
pub struct Rig {
    pub scheduler: TargetChargeScheduler,
    pub clock: ManualClock,
    pub meter: SpyMeter,
    pub ramper: SpyRamper,
    pub estimator: FixedEstimator,
    pub publisher: RecordingPublisher,
}

pub fn rig(remaining: Duration) -> Rig {
    rig_with(remaining, LoadpointCfg::default(), SchedulerCfg::default(), 10)
}

pub fn rig_with(
    remaining: Duration,
    loadpoint: LoadpointCfg,
    tuning: SchedulerCfg,
    ramper_amps: u32,
) -> Rig {
    let clock = ManualClock::new(t0());
    let meter = SpyMeter::default();
    let ramper = SpyRamper::at(ramper_amps);
    let estimator = FixedEstimator::new(remaining);
    let publisher = RecordingPublisher::new();
    let scheduler = TargetChargeScheduler::builder()
        .with_meter(meter.clone())
        .with_ramper(ramper.clone())
        .with_estimator(estimator.clone())
        .with_publisher(publisher.clone())
        .with_loadpoint(loadpoint)
        .with_tuning(tuning)
        .with_clock(clock.clone())
        .build()
        .expect("build scheduler");
    Rig {
        scheduler,
        clock,
        meter,
        ramper,
        estimator,
        publisher,
    }
}

pub fn mins(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}
