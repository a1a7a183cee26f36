//! The target-time scheduler (`SchedulerCore`).
//!
//! Three stages run in order on every tick: activation check, requirement
//! evaluation (estimate finish time at the current or assumed rate), and rate
//! adjustment (nudge current one amp at a time towards the deadline).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use charge_traits::{Clock, CurrentMeter, Publisher, Ramper, Signal, SocEstimator};

use crate::config::{LoadpointCfg, SchedulerCfg};
use crate::error::{ChargeError, Result};
use crate::request::TargetChargeRequest;
use crate::status::{Adjustment, RampDecision, TickOutcome};
use crate::util::{clamp_current, finish_at, power_w, start_current};

/// Unified core for both dynamic (boxed) and generic (static dispatch) variants.
pub struct SchedulerCore<M: CurrentMeter, R: Ramper> {
    pub(crate) meter: M,
    pub(crate) ramper: R,
    pub(crate) estimator: Option<Box<dyn SocEstimator>>,
    pub(crate) publisher: Box<dyn Publisher>,
    pub(crate) loadpoint: LoadpointCfg,
    pub(crate) tuning: SchedulerCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
}

impl<M: CurrentMeter, R: Ramper> core::fmt::Debug for SchedulerCore<M, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SchedulerCore")
            .field("supported", &self.supported())
            .field("loadpoint", &self.loadpoint)
            .field("tuning", &self.tuning)
            .finish()
    }
}

impl<M: CurrentMeter, R: Ramper> SchedulerCore<M, R> {
    /// True iff a SoC estimator is configured. Check before accepting requests.
    pub fn supported(&self) -> bool {
        self.estimator.is_some()
    }

    pub fn loadpoint(&self) -> &LoadpointCfg {
        &self.loadpoint
    }

    pub fn tuning(&self) -> &SchedulerCfg {
        &self.tuning
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn meter(&self) -> &M {
        &self.meter
    }

    pub fn ramper(&self) -> &R {
        &self.ramper
    }

    /// Accept a new request from the request owner.
    ///
    /// Rejects requests when unsupported and deadlines that are not in the
    /// future.
    pub fn set_target(
        &mut self,
        req: &mut TargetChargeRequest,
        soc: u8,
        time: DateTime<Utc>,
    ) -> Result<()> {
        if !self.supported() {
            return Err(eyre::Report::new(ChargeError::Unsupported));
        }
        if time <= self.clock.now() {
            return Err(eyre::Report::new(ChargeError::InvalidRequest(
                "target time must be in the future",
            )));
        }
        req.set(soc, time).map_err(eyre::Report::new)?;
        tracing::info!(target_soc = soc, target_time = %time, "target charging request set");
        Ok(())
    }

    /// Clear the request's target pair.
    pub fn reset(&self, req: &mut TargetChargeRequest) {
        req.reset();
    }

    /// Whether the request is pending and not expired.
    ///
    /// Publishes `socTimerSet` every call. On an inactive request that still
    /// mandates charging, clears the mandate and publishes `socTimerActive=false`
    /// once; later inactive calls find the flag already false.
    pub fn active(&mut self, req: &mut TargetChargeRequest) -> bool {
        let now = self.clock.now();
        let inactive = req.target_time.is_none_or(|t| t < now);
        self.publish(Signal::TimerSet, !inactive);

        if inactive && req.charge_required {
            req.charge_required = false;
            self.publish(Signal::TimerActive, false);
        }

        !inactive
    }

    /// Estimate the finish time and decide whether charging must run now.
    ///
    /// Updates `estimated_finish` and `charge_required` and publishes
    /// `socTimerActive`. Fails only with `ChargeError::Unsupported`.
    pub fn start_required(&mut self, req: &mut TargetChargeRequest) -> Result<bool> {
        let Some(estimator) = self.estimator.as_deref() else {
            return Err(eyre::Report::new(ChargeError::Unsupported));
        };

        let lp = &self.loadpoint;
        let mut current = self.meter.effective_current();
        // not charging: estimate at the assumed start current
        if current == 0 {
            current = start_current(lp.min_current, lp.max_current, self.tuning.utilization);
        }
        let power = power_w(current, lp.phases, lp.voltage);

        let remaining = estimator.remaining_charge_duration(power, req.target_soc);
        let finish = finish_at(self.clock.now(), remaining);
        req.estimated_finish = Some(finish);

        tracing::debug!(
            remaining_min = remaining.as_secs() / 60,
            finish = %finish,
            current,
            power_w = power,
            utilization = self.tuning.utilization,
            "target charging remaining time"
        );

        req.charge_required = req.target_time.is_some_and(|t| finish > t);
        self.publish(Signal::TimerActive, req.charge_required);

        Ok(req.charge_required)
    }

    /// Adjust current one step towards finishing at the deadline.
    ///
    /// Ramp failures come back as `ChargeError::Actuation` with the ramper's
    /// error as source; the request is not modified.
    pub fn handle(&mut self, req: &TargetChargeRequest) -> Result<RampDecision> {
        let current = self.ramper.target_current();
        let adjustment =
            Adjustment::select(req.estimated_finish, req.target_time, self.tuning.deviation);
        if adjustment != Adjustment::Hold {
            tracing::debug!(from = current, "target charging: {}", adjustment.as_str());
        }

        let lp = &self.loadpoint;
        let next = clamp_current(adjustment.apply(current), lp.min_current, lp.max_current);

        self.ramper
            .ramp(next)
            .map_err(|source| eyre::Report::new(ChargeError::Actuation { amps: next, source }))?;

        Ok(RampDecision {
            adjustment,
            current: next,
        })
    }

    /// One control tick: activation, then requirement, then adjustment.
    pub fn tick(&mut self, req: &mut TargetChargeRequest) -> Result<TickOutcome> {
        if !self.active(req) {
            return Ok(TickOutcome::Idle);
        }
        let required = self.start_required(req)?;
        let finish = req.estimated_finish.unwrap_or(DateTime::<Utc>::MAX_UTC);
        if !required {
            return Ok(TickOutcome::Waiting { finish });
        }
        let decision = self.handle(req)?;
        Ok(TickOutcome::Charging { finish, decision })
    }

    fn publish(&mut self, signal: Signal, value: bool) {
        if let Err(e) = self.publisher.publish(signal, value) {
            tracing::warn!(signal = %signal, value, error = %e, "publish failed");
        }
    }
}
