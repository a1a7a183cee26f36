use std::ops::ControlFlow;
use std::time::Duration;

use crate::builder::TargetChargeScheduler;
use crate::error::{ChargeError, Result as CoreResult};
use crate::request::SharedRequest;
use crate::status::TickOutcome;

/// Loop pacing and failure tolerance.
#[derive(Debug, Clone)]
pub struct RunParams {
    /// Time between ticks.
    pub tick: Duration,
    /// Stop after this many ticks (0 = until the host breaks).
    pub max_ticks: u64,
    /// Consecutive failed ticks tolerated before giving up.
    pub max_consecutive_errors: u32,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(60),
            max_ticks: 0,
            max_consecutive_errors: 3,
        }
    }
}

/// The enclosing system the loop reports to.
pub trait TickHost {
    /// Called after every successful tick; `Break` ends the run.
    fn on_tick(&mut self, outcome: &TickOutcome) -> ControlFlow<()>;

    /// Called when a tick failed. The request is left as it was; `Break`
    /// ends the run after a retryable failure.
    fn on_error(&mut self, _err: &crate::error::Report) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Let `tick` elapse (sleep, or advance a simulated clock).
    fn wait(&mut self, tick: Duration);
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub charging_ticks: u64,
    pub failed_ticks: u64,
    pub last_outcome: Option<TickOutcome>,
}

/// Drive `scheduler` until the host breaks or `max_ticks` is reached.
///
/// Actuation failures only fail their own tick; repeated failures beyond
/// `max_consecutive_errors` end the run with the last error. Any other error
/// ends it immediately.
pub fn run<H: TickHost>(
    scheduler: &mut TargetChargeScheduler,
    request: &SharedRequest,
    host: &mut H,
    params: &RunParams,
) -> CoreResult<RunSummary> {
    let mut summary = RunSummary::default();
    let mut consecutive_errors = 0_u32;

    tracing::info!(
        tick_s = params.tick.as_secs(),
        max_ticks = params.max_ticks,
        "target charging loop start"
    );

    loop {
        summary.ticks += 1;
        match scheduler.tick_shared(request) {
            Ok(outcome) => {
                consecutive_errors = 0;
                if outcome.charge_required() {
                    summary.charging_ticks += 1;
                }
                summary.last_outcome = Some(outcome);
                if host.on_tick(&outcome).is_break() {
                    break;
                }
            }
            Err(e) => {
                summary.failed_ticks += 1;
                let retryable = matches!(
                    e.downcast_ref::<ChargeError>(),
                    Some(ChargeError::Actuation { .. })
                );
                let flow = host.on_error(&e);
                consecutive_errors = consecutive_errors.saturating_add(1);
                if !retryable || consecutive_errors > params.max_consecutive_errors {
                    tracing::error!(error = %e, consecutive_errors, "target charging loop aborted");
                    return Err(e);
                }
                if flow.is_break() {
                    tracing::warn!(error = %e, "tick failed; host stopped the loop");
                    break;
                }
                tracing::warn!(error = %e, consecutive_errors, "tick failed; retrying next tick");
            }
        }

        if params.max_ticks != 0 && summary.ticks >= params.max_ticks {
            break;
        }
        host.wait(params.tick);
    }

    tracing::info!(
        ticks = summary.ticks,
        charging_ticks = summary.charging_ticks,
        failed_ticks = summary.failed_ticks,
        "target charging loop done"
    );
    Ok(summary)
}
