pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

/// Error type used at every collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Estimates how long charging to a target SoC takes at a given power.
pub trait SocEstimator {
    fn remaining_charge_duration(&self, power_w: f64, target_soc: u8) -> std::time::Duration;
}

/// Reads the current actually delivered to the vehicle, 0 when not charging.
pub trait CurrentMeter {
    fn effective_current(&self) -> u32;
}

/// Drives delivered current towards a requested value, gradually.
pub trait Ramper {
    /// Current the ramp is heading for (amps).
    fn target_current(&self) -> u32;
    fn ramp(&mut self, amps: u32) -> Result<(), BoxError>;
}

/// Boolean signals emitted by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// A target-time request is set and not expired.
    TimerSet,
    /// The timer currently mandates charging.
    TimerActive,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::TimerSet => "socTimerSet",
            Signal::TimerActive => "socTimerActive",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget telemetry sink.
pub trait Publisher {
    fn publish(&mut self, signal: Signal, value: bool) -> Result<(), BoxError>;
}

impl<T: SocEstimator + ?Sized> SocEstimator for Box<T> {
    fn remaining_charge_duration(&self, power_w: f64, target_soc: u8) -> std::time::Duration {
        (**self).remaining_charge_duration(power_w, target_soc)
    }
}

impl<T: CurrentMeter + ?Sized> CurrentMeter for Box<T> {
    fn effective_current(&self) -> u32 {
        (**self).effective_current()
    }
}

impl<T: Ramper + ?Sized> Ramper for Box<T> {
    fn target_current(&self) -> u32 {
        (**self).target_current()
    }
    fn ramp(&mut self, amps: u32) -> Result<(), BoxError> {
        (**self).ramp(amps)
    }
}

impl<T: Publisher + ?Sized> Publisher for Box<T> {
    fn publish(&mut self, signal: Signal, value: bool) -> Result<(), BoxError> {
        (**self).publish(signal, value)
    }
}
