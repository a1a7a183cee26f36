//! Decisions returned from each scheduler stage.

use chrono::{DateTime, TimeDelta, Utc};

/// Rate adjustment chosen for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Finishing more than the deviation ahead of the deadline; drop one amp.
    SlowDown,
    /// Finishing after the deadline; add one amp.
    SpeedUp,
    /// Inside `[target - deviation, target]`.
    Hold,
}

impl Adjustment {
    /// Select the adjustment from the projected finish and the deadline.
    ///
    /// Without both timestamps there is nothing to converge on, so the current
    /// is held.
    pub fn select(
        finish: Option<DateTime<Utc>>,
        target: Option<DateTime<Utc>>,
        deviation: TimeDelta,
    ) -> Self {
        let (Some(finish), Some(target)) = (finish, target) else {
            return Adjustment::Hold;
        };
        let lower = target
            .checked_sub_signed(deviation)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        if finish < lower {
            Adjustment::SlowDown
        } else if finish > target {
            Adjustment::SpeedUp
        } else {
            Adjustment::Hold
        }
    }

    /// Apply to `current`, one amp per step, without wrapping.
    pub fn apply(self, current: u32) -> u32 {
        match self {
            Adjustment::SlowDown => current.saturating_sub(1),
            Adjustment::SpeedUp => current.saturating_add(1),
            Adjustment::Hold => current,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Adjustment::SlowDown => "slowdown",
            Adjustment::SpeedUp => "speedup",
            Adjustment::Hold => "hold",
        }
    }
}

/// Outcome of `handle`: what was decided and the current sent to the ramper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampDecision {
    pub adjustment: Adjustment,
    pub current: u32,
}

/// Public status of a single scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No pending request, or its deadline has passed.
    Idle,
    /// Request pending; starting later still meets the deadline.
    Waiting { finish: DateTime<Utc> },
    /// Charging is mandated and the current was adjusted.
    Charging {
        finish: DateTime<Utc>,
        decision: RampDecision,
    },
}

impl TickOutcome {
    pub fn charge_required(&self) -> bool {
        matches!(self, TickOutcome::Charging { .. })
    }
}
