//! Simulated vehicle and charger for exercising the scheduler without hardware.
//!
//! One `Sim` owns the shared state; `SimVehicle` and `SimCharger` are cheap
//! handles onto it that implement the collaborator traits.
pub mod error;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use charge_traits::{BoxError, CurrentMeter, Ramper, SocEstimator};

use crate::error::{Result, SimError};

/// Physical parameters of the simulated vehicle and charger.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub capacity_wh: f64,
    /// Initial SoC (%)
    pub soc: f64,
    /// Grid-to-battery efficiency
    pub efficiency: f64,
    pub phases: u32,
    pub voltage: f64,
    /// Amps the delivered current moves towards its target per `advance`
    pub ramp_step_a: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            capacity_wh: 50_000.0,
            soc: 20.0,
            efficiency: 0.9,
            phases: 3,
            voltage: 230.0,
            ramp_step_a: 2,
        }
    }
}

#[derive(Debug)]
struct State {
    params: SimParams,
    soc: f64,
    commanded: u32,
    delivered: u32,
    enabled: bool,
    fault: Option<String>,
}

/// What the simulation observed over one `advance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimSample {
    pub soc: f64,
    pub current: u32,
    pub power_w: f64,
    pub energy_wh: f64,
}

/// Owner of the simulated world.
#[derive(Debug, Clone)]
pub struct Sim {
    state: Rc<RefCell<State>>,
}

impl Sim {
    pub fn new(params: SimParams) -> Result<Self> {
        if !(params.capacity_wh.is_finite() && params.capacity_wh > 0.0) {
            return Err(SimError::InvalidParam("capacity must be > 0"));
        }
        if !(0.0..=100.0).contains(&params.soc) {
            return Err(SimError::InvalidParam("soc must be in [0, 100]"));
        }
        if !(params.efficiency > 0.0 && params.efficiency <= 1.0) {
            return Err(SimError::InvalidParam("efficiency must be in (0.0, 1.0]"));
        }
        if params.phases == 0 {
            return Err(SimError::InvalidParam("phases must be >= 1"));
        }
        if !(params.voltage.is_finite() && params.voltage > 0.0) {
            return Err(SimError::InvalidParam("voltage must be > 0"));
        }
        if params.ramp_step_a == 0 {
            return Err(SimError::InvalidParam("ramp step must be >= 1"));
        }
        let soc = params.soc;
        Ok(Self {
            state: Rc::new(RefCell::new(State {
                params,
                soc,
                commanded: 0,
                delivered: 0,
                enabled: false,
                fault: None,
            })),
        })
    }

    pub fn vehicle(&self) -> SimVehicle {
        SimVehicle {
            state: Rc::clone(&self.state),
        }
    }

    pub fn charger(&self) -> SimCharger {
        SimCharger {
            state: Rc::clone(&self.state),
        }
    }

    pub fn soc(&self) -> f64 {
        self.state.borrow().soc
    }

    /// Make every following `ramp` fail with `msg`.
    pub fn inject_fault(&self, msg: impl Into<String>) {
        self.state.borrow_mut().fault = Some(msg.into());
    }

    pub fn clear_fault(&self) {
        self.state.borrow_mut().fault = None;
    }

    /// Let `dt` pass: step the delivered current towards its target, then
    /// charge the battery at the resulting power.
    pub fn advance(&self, dt: Duration) -> SimSample {
        let mut s = self.state.borrow_mut();
        let step = s.params.ramp_step_a;
        let goal = if s.enabled && s.soc < 100.0 { s.commanded } else { 0 };
        s.delivered = if s.delivered < goal {
            s.delivered.saturating_add(step).min(goal)
        } else {
            s.delivered.saturating_sub(step).max(goal)
        };

        let power_w = f64::from(s.delivered) * f64::from(s.params.phases) * s.params.voltage;
        let energy_wh = power_w * s.params.efficiency * dt.as_secs_f64() / 3600.0;
        s.soc = (s.soc + energy_wh / s.params.capacity_wh * 100.0).min(100.0);
        if s.soc >= 100.0 && s.delivered > 0 {
            tracing::info!("simulated battery full");
            s.delivered = 0;
        }

        SimSample {
            soc: s.soc,
            current: s.delivered,
            power_w,
            energy_wh,
        }
    }
}

/// Battery model answering remaining-time questions from the shared state.
///
/// Linear: the energy still missing to `target_soc`, divided by the
/// effective power. Non-positive power never finishes.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    state: Rc<RefCell<State>>,
}

impl SocEstimator for SimVehicle {
    fn remaining_charge_duration(&self, power_w: f64, target_soc: u8) -> Duration {
        let s = self.state.borrow();
        let missing_pct = f64::from(target_soc) - s.soc;
        if missing_pct <= 0.0 {
            return Duration::ZERO;
        }
        let effective_w = power_w * s.params.efficiency;
        if !(effective_w.is_finite() && effective_w > 0.0) {
            return Duration::MAX;
        }
        let hours = missing_pct * s.params.capacity_wh / (100.0 * effective_w);
        Duration::try_from_secs_f64(hours * 3600.0).unwrap_or(Duration::MAX)
    }
}

/// Charger handle: reports delivered current and accepts ramp commands.
#[derive(Debug, Clone)]
pub struct SimCharger {
    state: Rc<RefCell<State>>,
}

impl SimCharger {
    /// Stop delivering; the last commanded current is kept for the next `ramp`.
    pub fn stop(&mut self) {
        let mut s = self.state.borrow_mut();
        if s.enabled {
            tracing::debug!("simulated charger stopped");
        }
        s.enabled = false;
        s.delivered = 0;
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }
}

impl CurrentMeter for SimCharger {
    fn effective_current(&self) -> u32 {
        self.state.borrow().delivered
    }
}

impl Ramper for SimCharger {
    fn target_current(&self) -> u32 {
        self.state.borrow().commanded
    }

    fn ramp(&mut self, amps: u32) -> std::result::Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        if let Some(msg) = &s.fault {
            return Err(Box::new(SimError::Fault(msg.clone())));
        }
        s.commanded = amps;
        s.enabled = true;
        Ok(())
    }
}
