//! Fixed duration ranges mapping a measured gap to an action.

use super::event::Action;
use std::ops::{Bound, RangeBounds};
use std::time::Duration;

/// One row of a threshold table: `[lower, upper)` or `[lower, upper]` maps to `action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    pub lower: Duration,
    pub upper: Bound<Duration>,
    pub action: Action,
}

impl Threshold {
    pub const fn new(lower: Duration, upper: Bound<Duration>, action: Action) -> Self {
        Self {
            lower,
            upper,
            action,
        }
    }

    pub fn contains(&self, elapsed: Duration) -> bool {
        (Bound::Included(self.lower), self.upper).contains(&elapsed)
    }
}

/// Single-switch variant, checked in order.
pub const SWITCH_THRESHOLDS: [Threshold; 2] = [
    Threshold::new(
        Duration::from_secs(10),
        Bound::Excluded(Duration::from_secs(60)),
        Action::Shutdown,
    ),
    Threshold::new(
        Duration::from_millis(500),
        Bound::Included(Duration::from_secs(5)),
        Action::Reboot,
    ),
];

/// Momentary-button variant, checked in order.
pub const MOMENTARY_THRESHOLDS: [Threshold; 2] = [
    Threshold::new(
        Duration::from_secs(10),
        Bound::Included(Duration::from_secs(20)),
        Action::Shutdown,
    ),
    Threshold::new(
        Duration::from_millis(500),
        Bound::Included(Duration::from_secs(3)),
        Action::Reboot,
    ),
];

/// Gaps longer than this make a momentary press the new anchor.
pub const MOMENTARY_ANCHOR_RESET: Duration = Duration::from_secs(20);

/// First matching row wins; no match means `Ignore`.
pub fn lookup(table: &[Threshold], elapsed: Duration) -> Action {
    table
        .iter()
        .find(|threshold| threshold.contains(elapsed))
        .map(|threshold| threshold.action)
        .unwrap_or(Action::Ignore)
}
