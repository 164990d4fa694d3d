use chrono::{DateTime, Duration, Utc};

/// Fixed rejection cooldown applied to all three service tracks.
pub const REJECTION_COOLDOWN_HOURS: i64 = 24;

pub fn rejection_cooldown() -> Duration {
    Duration::hours(REJECTION_COOLDOWN_HOURS)
}

/// Result of evaluating a rejection timestamp against the cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownStatus {
    pub eligible: bool,
    pub remaining: Duration,
}

impl CooldownStatus {
    pub fn elapsed() -> Self {
        Self {
            eligible: true,
            remaining: Duration::zero(),
        }
    }

    /// Whole hours left, floored.
    pub fn remaining_hours(&self) -> i64 {
        self.remaining.num_hours()
    }

    /// Whole minutes left past the hour, floored.
    pub fn remaining_minutes(&self) -> i64 {
        self.remaining.num_minutes() - self.remaining_hours() * 60
    }
}

/// Pure eligibility check. A missing rejection timestamp means there is
/// nothing to wait for. Callers must re-evaluate on every read; eligibility
/// moves with the wall clock.
pub fn evaluate(
    rejected_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> CooldownStatus {
    let Some(rejected_at) = rejected_at else {
        return CooldownStatus::elapsed();
    };

    let elapsed = now - rejected_at;
    if elapsed >= window {
        CooldownStatus::elapsed()
    } else {
        CooldownStatus {
            eligible: false,
            remaining: window - elapsed,
        }
    }
}
