//! Type-state builder for `TargetChargeScheduler` and generic `build_scheduler` constructor.
//!
//! The builder enforces at compile time that a current meter and a ramper are
//! provided before `build()` is available. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use charge_traits::{Clock, CurrentMeter, Publisher, Ramper, SocEstimator, SystemClock};

use crate::config::{LoadpointCfg, SchedulerCfg};
use crate::core::SchedulerCore;
use crate::error::{BuildError, Result};
use crate::mocks::NoopPublisher;
use crate::request::{SharedRequest, TargetChargeRequest};
use crate::status::{RampDecision, TickOutcome};

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Public dynamic (boxed) scheduler that preserves a non-generic API via composition.
pub struct TargetChargeScheduler {
    pub(crate) inner: SchedulerCore<Box<dyn CurrentMeter>, Box<dyn Ramper>>,
}

impl core::fmt::Debug for TargetChargeScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TargetChargeScheduler")
            .field("supported", &self.inner.supported())
            .field("min_current", &self.inner.loadpoint.min_current)
            .field("max_current", &self.inner.loadpoint.max_current)
            .finish()
    }
}

impl TargetChargeScheduler {
    /// Start building a scheduler.
    pub fn builder() -> SchedulerBuilder<Missing, Missing> {
        SchedulerBuilder::default()
    }

    /// True iff a SoC estimator is configured.
    pub fn supported(&self) -> bool {
        self.inner.supported()
    }

    pub fn loadpoint(&self) -> &LoadpointCfg {
        self.inner.loadpoint()
    }

    pub fn tuning(&self) -> &SchedulerCfg {
        self.inner.tuning()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.now()
    }

    /// Accept a new request; see `SchedulerCore::set_target`.
    pub fn set_target(
        &mut self,
        req: &mut TargetChargeRequest,
        soc: u8,
        time: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.set_target(req, soc, time)
    }

    /// Clear the request's target pair.
    pub fn reset(&self, req: &mut TargetChargeRequest) {
        self.inner.reset(req);
    }

    /// Activation check.
    pub fn active(&mut self, req: &mut TargetChargeRequest) -> bool {
        self.inner.active(req)
    }

    /// Requirement evaluation.
    pub fn start_required(&mut self, req: &mut TargetChargeRequest) -> Result<bool> {
        self.inner.start_required(req)
    }

    /// Rate adjustment.
    pub fn handle(&mut self, req: &TargetChargeRequest) -> Result<RampDecision> {
        self.inner.handle(req)
    }

    /// One control tick.
    pub fn tick(&mut self, req: &mut TargetChargeRequest) -> Result<TickOutcome> {
        self.inner.tick(req)
    }

    /// One control tick holding the shared request's lock throughout.
    pub fn tick_shared(&mut self, req: &SharedRequest) -> Result<TickOutcome> {
        req.with_lock(|r| self.inner.tick(r))
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `TargetChargeScheduler`. All fields are validated on `build()`.
pub struct SchedulerBuilder<M, R> {
    meter: Option<Box<dyn CurrentMeter>>,
    ramper: Option<Box<dyn Ramper>>,
    estimator: Option<Box<dyn SocEstimator>>,
    publisher: Option<Box<dyn Publisher>>,
    loadpoint: Option<LoadpointCfg>,
    tuning: Option<SchedulerCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _m: PhantomData<M>,
    _r: PhantomData<R>,
}

impl Default for SchedulerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            meter: None,
            ramper: None,
            estimator: None,
            publisher: None,
            loadpoint: None,
            tuning: None,
            clock: None,
            _m: PhantomData,
            _r: PhantomData,
        }
    }
}

/// Validate configuration and construct a `SchedulerCore`.
///
/// This is the single source of truth for validation and construction,
/// used by both `SchedulerBuilder::try_build()` and `build_scheduler()`.
fn validate_and_build<M: CurrentMeter, R: Ramper>(
    meter: M,
    ramper: R,
    estimator: Option<Box<dyn SocEstimator>>,
    publisher: Option<Box<dyn Publisher>>,
    loadpoint: LoadpointCfg,
    tuning: SchedulerCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<SchedulerCore<M, R>> {
    if loadpoint.max_current == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "max_current must be > 0",
        )));
    }
    if loadpoint.min_current > loadpoint.max_current {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "min_current must be <= max_current",
        )));
    }
    if loadpoint.phases == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "phases must be >= 1",
        )));
    }
    if !(loadpoint.voltage.is_finite() && loadpoint.voltage > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "voltage must be > 0",
        )));
    }
    if !(tuning.utilization > 0.0 && tuning.utilization <= 1.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "utilization must be in (0.0, 1.0]",
        )));
    }
    if tuning.deviation < TimeDelta::zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "deviation must be >= 0",
        )));
    }

    if estimator.is_none() {
        tracing::warn!("no soc estimator configured; target charging unsupported");
    }

    Ok(SchedulerCore {
        meter,
        ramper,
        estimator,
        publisher: publisher.unwrap_or_else(|| Box::new(NoopPublisher)),
        loadpoint,
        tuning,
        clock: clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
    })
}

impl<M, R> SchedulerBuilder<M, R> {
    /// Fallible build available in any type-state; returns detailed BuildError for missing pieces.
    pub fn try_build(self) -> Result<TargetChargeScheduler> {
        let meter = self
            .meter
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMeter))?;
        let ramper = self
            .ramper
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRamper))?;
        let inner = validate_and_build(
            meter,
            ramper,
            self.estimator,
            self.publisher,
            self.loadpoint.unwrap_or_default(),
            self.tuning.unwrap_or_default(),
            self.clock,
        )?;
        Ok(TargetChargeScheduler { inner })
    }
}

/// Chainable setters that do not affect type-state
impl<M, R> SchedulerBuilder<M, R> {
    pub fn with_estimator(mut self, estimator: impl SocEstimator + 'static) -> Self {
        self.estimator = Some(Box::new(estimator));
        self
    }

    pub fn with_publisher(mut self, publisher: impl Publisher + 'static) -> Self {
        self.publisher = Some(Box::new(publisher));
        self
    }

    pub fn with_loadpoint(mut self, loadpoint: LoadpointCfg) -> Self {
        self.loadpoint = Some(loadpoint);
        self
    }

    pub fn with_tuning(mut self, tuning: SchedulerCfg) -> Self {
        self.tuning = Some(tuning);
        self
    }

    /// Provide a custom clock implementation; defaults to SystemClock when not provided.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }
}

impl<R> SchedulerBuilder<Missing, R> {
    pub fn with_meter(self, meter: impl CurrentMeter + 'static) -> SchedulerBuilder<Set, R> {
        SchedulerBuilder {
            meter: Some(Box::new(meter)),
            ramper: self.ramper,
            estimator: self.estimator,
            publisher: self.publisher,
            loadpoint: self.loadpoint,
            tuning: self.tuning,
            clock: self.clock,
            _m: PhantomData,
            _r: PhantomData,
        }
    }
}

impl<M> SchedulerBuilder<M, Missing> {
    pub fn with_ramper(self, ramper: impl Ramper + 'static) -> SchedulerBuilder<M, Set> {
        SchedulerBuilder {
            meter: self.meter,
            ramper: Some(Box::new(ramper)),
            estimator: self.estimator,
            publisher: self.publisher,
            loadpoint: self.loadpoint,
            tuning: self.tuning,
            clock: self.clock,
            _m: PhantomData,
            _r: PhantomData,
        }
    }
}

impl SchedulerBuilder<Set, Set> {
    /// Validate and build. Only available when meter and ramper are set.
    pub fn build(self) -> Result<TargetChargeScheduler> {
        self.try_build()
    }
}

/// Generic, statically-dispatched alias using the unified core.
pub type SchedulerG<M, R> = SchedulerCore<M, R>;

/// Build a generic, statically-dispatched scheduler from concrete meter and ramper.
pub fn build_scheduler<M, R>(
    meter: M,
    ramper: R,
    estimator: Option<Box<dyn SocEstimator>>,
    publisher: Option<Box<dyn Publisher>>,
    loadpoint: LoadpointCfg,
    tuning: SchedulerCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<SchedulerG<M, R>>
where
    M: CurrentMeter,
    R: Ramper,
{
    validate_and_build(meter, ramper, estimator, publisher, loadpoint, tuning, clock)
}
