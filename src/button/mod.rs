//! Button-event interpretation: edges in, reboot/shutdown intent out.
//!
//! This module holds the only timing-sensitive logic in the crate. Hardware
//! access lives in [`crate::gpio`] and side effects in [`crate::power`].

pub mod classifier;
pub mod event;
pub mod threshold;

// Re-export commonly used items
pub use classifier::{Classifier, MomentaryClassifier, SwitchClassifier, TimingState};
pub use event::{Action, Decision, EdgeEvent, Signal, SwitchPosition};
pub use threshold::Threshold;
