#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Target-time charge scheduling (hardware-agnostic).
//!
//! Given a target SoC and a deadline, decides on each tick whether charging
//! must run now and nudges the current so the target is reached at the
//! deadline. All collaborators go through `charge_traits`.
//!
//! ## Architecture
//!
//! - **Request**: target pair plus scheduler-owned flags (`request` module)
//! - **Configuration**: loadpoint limits and tuning (`config` module)
//! - **Scheduler**: activation, requirement, adjustment (`SchedulerCore`)
//! - **Status**: per-stage decisions (`status` module)
//! - **Runner**: tick loop with failure tolerance (`runner` module)

pub mod builder;
pub mod config;
pub mod conversions;
pub mod core;
pub mod error;
pub mod mocks;
pub mod request;
pub mod runner;
pub mod status;
pub mod util;

pub use builder::{Missing, SchedulerBuilder, SchedulerG, Set, TargetChargeScheduler, build_scheduler};
pub use config::{LoadpointCfg, SchedulerCfg};
pub use crate::core::SchedulerCore;
pub use error::{BuildError, ChargeError, Report, Result};
pub use request::{SharedRequest, TargetChargeRequest};
pub use status::{Adjustment, RampDecision, TickOutcome};
