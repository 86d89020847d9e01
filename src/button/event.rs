//! Data types passed between the edge source, the classifiers and the dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Which logical signal produced a falling edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// The switch moved to the "in" position, or the momentary button was pushed
    Pressed,
    /// The switch moved back to the "out" position
    Released,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Pressed => write!(f, "pressed"),
            Signal::Released => write!(f, "released"),
        }
    }
}

/// A single falling edge, stamped with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub signal: Signal,
    pub at: Instant,
}

impl EdgeEvent {
    pub fn new(signal: Signal, at: Instant) -> Self {
        Self { signal, at }
    }

    pub fn pressed(at: Instant) -> Self {
        Self::new(Signal::Pressed, at)
    }

    pub fn released(at: Instant) -> Self {
        Self::new(Signal::Released, at)
    }
}

/// The user intent derived from an edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Ignore,
    Reboot,
    Shutdown,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Ignore => write!(f, "ignore"),
            Action::Reboot => write!(f, "reboot"),
            Action::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Last known physical position of the single-switch variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwitchPosition {
    In,
    Out,
}

/// What a classifier did with one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The first release after power-on was swallowed
    FirstEdgeSuppressed,
    /// The edge only started a timing window
    WindowStarted,
    /// The gap was too long to mean anything; the edge became the new anchor
    AnchorReset { elapsed: Duration },
    /// The gap was measured and mapped to an action (possibly `Ignore`)
    Classified { elapsed: Duration, action: Action },
}

impl Decision {
    /// The action to hand to the power controller.
    pub fn action(&self) -> Action {
        match self {
            Decision::Classified { action, .. } => *action,
            _ => Action::Ignore,
        }
    }

    /// The measured gap, if this edge was measured at all.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Decision::AnchorReset { elapsed } | Decision::Classified { elapsed, .. } => {
                Some(*elapsed)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::FirstEdgeSuppressed => write!(f, "ignore first push out"),
            Decision::WindowStarted => write!(f, "falling edge detected, timing started"),
            Decision::AnchorReset { elapsed } => write!(
                f,
                "button time = {:.3}s, too long, resetting start time",
                elapsed.as_secs_f64()
            ),
            Decision::Classified { elapsed, action } => write!(
                f,
                "button time = {:.3}s -> {}",
                elapsed.as_secs_f64(),
                action
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_action() {
        let elapsed = Duration::from_secs(2);
        assert_eq!(Decision::FirstEdgeSuppressed.action(), Action::Ignore);
        assert_eq!(Decision::WindowStarted.action(), Action::Ignore);
        assert_eq!(Decision::AnchorReset { elapsed }.action(), Action::Ignore);
        assert_eq!(
            Decision::Classified {
                elapsed,
                action: Action::Reboot
            }
            .action(),
            Action::Reboot
        );
    }

    #[test]
    fn test_decision_display() {
        let decision = Decision::Classified {
            elapsed: Duration::from_millis(1500),
            action: Action::Reboot,
        };
        assert_eq!(decision.to_string(), "button time = 1.500s -> reboot");
        assert_eq!(Decision::WindowStarted.elapsed(), None);
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&Action::Shutdown).unwrap();
        assert_eq!(json, "\"shutdown\"");
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Action::Shutdown);
    }
}
