//! Button-press interpretation for both hardware variants.
//!
//! A classifier owns the timing state for one button and turns each
//! debounced falling edge into a [`Decision`]. Classifiers never read the
//! clock or touch hardware: the edge carries its own arrival time, so the
//! same sequence of events always produces the same decisions.

use super::event::{Decision, EdgeEvent, Signal, SwitchPosition};
use super::threshold::{lookup, MOMENTARY_ANCHOR_RESET, MOMENTARY_THRESHOLDS, SWITCH_THRESHOLDS};
use crate::config::Variant;
use std::time::{Duration, Instant};

/// Timing state shared by both variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingState {
    /// Arrival time of the previous qualifying edge
    pub last_edge: Option<Instant>,
    /// Set until the first edge of the expected polarity has been seen
    pub awaiting_first_edge: bool,
}

impl Default for TimingState {
    fn default() -> Self {
        Self {
            last_edge: None,
            awaiting_first_edge: true,
        }
    }
}

/// Maps edges to decisions, updating its own state as it goes.
pub trait Classifier: Send {
    /// Which hardware variant this classifier interprets.
    fn variant(&self) -> Variant;

    /// Consume one edge.
    fn classify(&mut self, event: EdgeEvent) -> Decision;

    /// Current timing state, for logging and inspection.
    fn timing(&self) -> TimingState;
}

/// Bistable switch with normally-open (`Pressed`) and normally-closed
/// (`Released`) contacts on separate pins.
///
/// The switch may already be pushed in at boot, in which case the first
/// release is an artifact of power-on and carries no timing information.
#[derive(Debug, Clone)]
pub struct SwitchClassifier {
    timing: TimingState,
    position: SwitchPosition,
}

impl SwitchClassifier {
    pub fn new() -> Self {
        Self {
            timing: TimingState::default(),
            position: SwitchPosition::Out,
        }
    }

    pub fn position(&self) -> SwitchPosition {
        self.position
    }

    fn on_pressed(&mut self, at: Instant) -> Decision {
        // A press proves the switch was out, so the next release is genuine.
        self.timing.awaiting_first_edge = false;
        self.timing.last_edge = Some(at);
        self.position = SwitchPosition::In;
        Decision::WindowStarted
    }

    fn on_released(&mut self, at: Instant) -> Decision {
        self.position = SwitchPosition::Out;

        if self.timing.awaiting_first_edge {
            self.timing.awaiting_first_edge = false;
            return Decision::FirstEdgeSuppressed;
        }

        let elapsed = self
            .timing
            .last_edge
            .map(|start| at.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO);

        // Anchor moves before classifying, even when the result is Ignore.
        self.timing.last_edge = Some(at);

        Decision::Classified {
            elapsed,
            action: lookup(&SWITCH_THRESHOLDS, elapsed),
        }
    }
}

impl Default for SwitchClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for SwitchClassifier {
    fn variant(&self) -> Variant {
        Variant::Switch
    }

    fn classify(&mut self, event: EdgeEvent) -> Decision {
        match event.signal {
            Signal::Pressed => self.on_pressed(event.at),
            Signal::Released => self.on_released(event.at),
        }
    }

    fn timing(&self) -> TimingState {
        self.timing
    }
}

/// Momentary button on a single normally-open pin; intent comes from the
/// gap between successive presses.
#[derive(Debug, Clone, Default)]
pub struct MomentaryClassifier {
    timing: TimingState,
}

impl MomentaryClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for MomentaryClassifier {
    fn variant(&self) -> Variant {
        Variant::Momentary
    }

    /// Every edge counts as a press; the signal identity is not consulted.
    fn classify(&mut self, event: EdgeEvent) -> Decision {
        let Some(anchor) = self.timing.last_edge else {
            self.timing.last_edge = Some(event.at);
            self.timing.awaiting_first_edge = false;
            return Decision::WindowStarted;
        };

        let elapsed = event.at.saturating_duration_since(anchor);
        if elapsed > MOMENTARY_ANCHOR_RESET {
            self.timing.last_edge = Some(event.at);
            return Decision::AnchorReset { elapsed };
        }

        // The anchor is kept for reboot, shutdown and out-of-range gaps alike.
        Decision::Classified {
            elapsed,
            action: lookup(&MOMENTARY_THRESHOLDS, elapsed),
        }
    }

    fn timing(&self) -> TimingState {
        self.timing
    }
}
