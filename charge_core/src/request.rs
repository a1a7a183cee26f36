//! Target-time request state carried across ticks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::ChargeError;

/// Persistent state of a target-time charge request.
///
/// `target_soc` and `target_time` are written together by the request owner.
/// `estimated_finish` and `charge_required` are owned by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetChargeRequest {
    pub(crate) target_soc: u8,
    pub(crate) target_time: Option<DateTime<Utc>>,
    pub(crate) estimated_finish: Option<DateTime<Utc>>,
    pub(crate) charge_required: bool,
}

impl TargetChargeRequest {
    /// A request for `soc` percent by `time`.
    pub fn new(soc: u8, time: DateTime<Utc>) -> Result<Self, ChargeError> {
        let mut req = Self::default();
        req.set(soc, time)?;
        Ok(req)
    }

    /// Replace the target pair. Leaves scheduler-owned fields alone.
    pub fn set(&mut self, soc: u8, time: DateTime<Utc>) -> Result<(), ChargeError> {
        if soc > 100 {
            return Err(ChargeError::InvalidRequest("target soc must be <= 100"));
        }
        self.target_soc = soc;
        self.target_time = Some(time);
        Ok(())
    }

    /// Clear the target pair. `charge_required` and `estimated_finish` are
    /// cleared by the next activation check instead.
    pub fn reset(&mut self) {
        self.target_soc = 0;
        self.target_time = None;
    }

    pub fn target_soc(&self) -> u8 {
        self.target_soc
    }

    pub fn target_time(&self) -> Option<DateTime<Utc>> {
        self.target_time
    }

    /// Last projected completion time; only meaningful while active.
    pub fn estimated_finish(&self) -> Option<DateTime<Utc>> {
        self.estimated_finish
    }

    pub fn charge_required(&self) -> bool {
        self.charge_required
    }
}

/// Request shared between a tick loop and a request-setting API.
///
/// Every accessor takes the same exclusive lock, so a reader never sees a
/// half-written `(target_soc, target_time)` pair.
#[derive(Debug, Clone, Default)]
pub struct SharedRequest {
    inner: Arc<Mutex<TargetChargeRequest>>,
}

impl SharedRequest {
    pub fn new(req: TargetChargeRequest) -> Self {
        Self {
            inner: Arc::new(Mutex::new(req)),
        }
    }

    pub fn set(&self, soc: u8, time: DateTime<Utc>) -> Result<(), ChargeError> {
        self.inner.lock().set(soc, time)
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> TargetChargeRequest {
        self.inner.lock().clone()
    }

    /// Run `f` with exclusive access, e.g. a whole tick.
    pub fn with_lock<T>(&self, f: impl FnOnce(&mut TargetChargeRequest) -> T) -> T {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_760_400_000, 0).unwrap()
    }

    #[test]
    fn reset_clears_target_pair_only() {
        let mut req = TargetChargeRequest::new(80, t0()).unwrap();
        req.charge_required = true;
        req.estimated_finish = Some(t0());
        req.reset();
        assert_eq!(req.target_soc(), 0);
        assert_eq!(req.target_time(), None);
        assert!(req.charge_required());
        assert_eq!(req.estimated_finish(), Some(t0()));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut once = TargetChargeRequest::new(55, t0()).unwrap();
        once.reset();
        let mut twice = once.clone();
        twice.reset();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_soc_above_100() {
        let err = TargetChargeRequest::new(101, t0()).unwrap_err();
        assert!(matches!(err, ChargeError::InvalidRequest(_)));
    }

    #[test]
    fn shared_set_and_reset_are_visible_in_snapshot() {
        let shared = SharedRequest::default();
        shared.set(70, t0() + TimeDelta::hours(3)).unwrap();
        let snap = shared.snapshot();
        assert_eq!(snap.target_soc(), 70);
        assert_eq!(snap.target_time(), Some(t0() + TimeDelta::hours(3)));
        shared.reset();
        let snap = shared.snapshot();
        assert_eq!((snap.target_soc(), snap.target_time()), (0, None));
    }
}
