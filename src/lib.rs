//! # Power Button - GPIO reboot/shutdown switch for Raspberry Pi
//!
//! Watches a rugged LED push-button wired to the GPIO header and turns
//! press patterns into a reboot or a clean shutdown. Two kinds of button
//! are supported:
//!
//! - **Single switch** (on/off latching switch): both contacts are wired.
//!   Pushing in and popping out again within 0.5-5 s reboots; holding it in
//!   for 10-60 s shuts down.
//! - **Momentary button**: only the normally-open contact is wired. A second
//!   press 0.5-3 s after the first reboots; 10-20 s after the first shuts down.
//!
//! The interpretation logic in [`button`] is pure and hardware-free; GPIO,
//! power commands and the event log sit behind the seams in [`gpio`],
//! [`power`] and [`journal`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use power_button::{
//!     run_until, wait_for_signal, DefaultEdgeSource, DefaultLed, EventLog, ServiceConfig,
//!     SwitchClassifier, SystemPowerController, Variant,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::for_variant(Variant::Switch);
//!     let log = Arc::new(EventLog::open(&config.log_path)?);
//!
//!     run_until(
//!         &config,
//!         SwitchClassifier::new(),
//!         DefaultEdgeSource::new()?,
//!         DefaultLed::new(config.pins.led)?,
//!         Arc::new(SystemPowerController::default()),
//!         log,
//!         wait_for_signal(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod button;
pub mod config;
pub mod error;
pub mod gpio;
pub mod journal;
pub mod power;
pub mod service;

// Re-export public API
pub use button::{
    Action, Classifier, Decision, EdgeEvent, MomentaryClassifier, Signal, SwitchClassifier,
    TimingState,
};
pub use config::{PinAssignment, ServiceConfig, Variant};
pub use error::{PowerButtonError, Result};
pub use gpio::{DefaultEdgeSource, DefaultLed, EdgeSource, Indicator, MockGpio, MockLed};
pub use journal::EventLog;
pub use power::{DryRunPowerController, PowerController, SystemPowerController};
pub use service::{run_until, wait_for_signal, ButtonService, StopReason};

/// BCM pin of the normally-open contact
pub const DEFAULT_PRESSED_PIN: u8 = 23;

/// BCM pin of the LED ring
pub const DEFAULT_LED_PIN: u8 = 24;

/// BCM pin of the normally-closed contact
pub const DEFAULT_RELEASED_PIN: u8 = 25;

/// The default debounce window in milliseconds
pub const DEFAULT_BOUNCE_MS: u64 = 200;
