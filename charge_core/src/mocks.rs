//! Test and helper mocks for charge_core

use std::sync::Arc;
use std::time::Duration;

use charge_traits::{BoxError, Publisher, Signal, SocEstimator};
use parking_lot::Mutex;

/// A publisher that drops everything; the default when none is configured.
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&mut self, _signal: Signal, _value: bool) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Records every emitted signal in order. Clones share the log.
#[derive(Debug, Default, Clone)]
pub struct RecordingPublisher {
    log: Arc<Mutex<Vec<(Signal, bool)>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Signal, bool)> {
        self.log.lock().clone()
    }

    /// Emissions of one signal, in order.
    pub fn values(&self, signal: Signal) -> Vec<bool> {
        self.log
            .lock()
            .iter()
            .filter(|(s, _)| *s == signal)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, signal: Signal, value: bool) -> Result<(), BoxError> {
        self.log.lock().push((signal, value));
        Ok(())
    }
}

/// Estimator returning a settable duration and recording the power it was asked about.
#[derive(Debug, Clone)]
pub struct FixedEstimator {
    remaining: Arc<Mutex<Duration>>,
    last_power_w: Arc<Mutex<Option<f64>>>,
}

impl FixedEstimator {
    pub fn new(remaining: Duration) -> Self {
        Self {
            remaining: Arc::new(Mutex::new(remaining)),
            last_power_w: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_remaining(&self, remaining: Duration) {
        *self.remaining.lock() = remaining;
    }

    /// Power passed to the most recent estimate.
    pub fn last_power_w(&self) -> Option<f64> {
        *self.last_power_w.lock()
    }
}

impl SocEstimator for FixedEstimator {
    fn remaining_charge_duration(&self, power_w: f64, _target_soc: u8) -> Duration {
        *self.last_power_w.lock() = Some(power_w);
        *self.remaining.lock()
    }
}
