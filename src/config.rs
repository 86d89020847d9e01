//! Service configuration.

use crate::button::Signal;
use crate::error::{PowerButtonError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Highest BCM pin number exposed on the 40-pin header.
pub const MAX_BCM_PIN: u8 = 27;

/// Which button hardware is wired up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Bistable on/off switch with both contacts wired
    Switch,
    /// Momentary push-button with the normally-open contact wired
    Momentary,
}

impl Variant {
    /// Name used in log lines and the default log file name.
    pub fn service_name(&self) -> &'static str {
        match self {
            Variant::Switch => "onOff",
            Variant::Momentary => "pushButton",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Switch => write!(f, "switch"),
            Variant::Momentary => write!(f, "momentary"),
        }
    }
}

/// BCM pin numbers for the button contacts and the LED ring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinAssignment {
    /// Normally-open contact (falls when pushed in)
    pub pressed: u8,
    /// Normally-closed contact (falls when popped out); unused by the momentary variant
    pub released: Option<u8>,
    /// LED ring power
    pub led: u8,
}

impl PinAssignment {
    /// Input pins and the signal each one carries.
    pub fn routes(&self) -> Vec<(u8, Signal)> {
        let mut routes = vec![(self.pressed, Signal::Pressed)];
        if let Some(released) = self.released {
            routes.push((released, Signal::Released));
        }
        routes
    }

    fn all(&self) -> Vec<u8> {
        let mut pins = vec![self.pressed, self.led];
        pins.extend(self.released);
        pins
    }
}

/// Configuration for the button service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Hardware variant
    pub variant: Variant,
    /// Pin wiring
    pub pins: PinAssignment,
    /// Minimum separation between accepted edges on one pin
    pub bounce_ms: u64,
    /// Event log file
    pub log_path: PathBuf,
    /// Whether the LED ring is lit while the service runs
    pub led_on: bool,
    /// Log decisions without rebooting or shutting down
    pub dry_run: bool,
    /// Prefix power commands with `sudo`
    pub use_sudo: bool,
}

impl ServiceConfig {
    /// Defaults for the given variant, matching the reference wiring.
    pub fn for_variant(variant: Variant) -> Self {
        let pins = match variant {
            Variant::Switch => PinAssignment {
                pressed: crate::DEFAULT_PRESSED_PIN,
                released: Some(crate::DEFAULT_RELEASED_PIN),
                led: crate::DEFAULT_LED_PIN,
            },
            Variant::Momentary => PinAssignment {
                pressed: crate::DEFAULT_PRESSED_PIN,
                released: None,
                led: crate::DEFAULT_LED_PIN,
            },
        };

        Self {
            variant,
            pins,
            bounce_ms: crate::DEFAULT_BOUNCE_MS,
            log_path: default_log_path(variant),
            led_on: true,
            dry_run: false,
            use_sudo: true,
        }
    }

    /// Set the pin of the normally-open contact.
    pub fn with_pressed_pin(mut self, pin: u8) -> Self {
        self.pins.pressed = pin;
        self
    }

    /// Set the pin of the normally-closed contact.
    ///
    /// Only the single-switch variant has one; [`validate`](Self::validate)
    /// rejects it for the momentary variant.
    pub fn with_released_pin(mut self, pin: u8) -> Self {
        self.pins.released = Some(pin);
        self
    }

    /// Set the LED pin.
    pub fn with_led_pin(mut self, pin: u8) -> Self {
        self.pins.led = pin;
        self
    }

    /// Set the debounce window in milliseconds.
    pub fn with_bounce_ms(mut self, bounce_ms: u64) -> Self {
        self.bounce_ms = bounce_ms;
        self
    }

    /// Set the event log path.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Light or darken the LED ring while running.
    pub fn with_led(mut self, led_on: bool) -> Self {
        self.led_on = led_on;
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable the `sudo` prefix.
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Debounce window as a duration.
    pub fn bounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.bounce_ms)
    }

    /// Check pin numbers and timing before touching hardware.
    pub fn validate(&self) -> Result<()> {
        let pins = self.pins.all();

        if let Some(pin) = pins.iter().find(|&&pin| pin > MAX_BCM_PIN) {
            return Err(PowerButtonError::config_error(format!(
                "Pin {} is outside BCM 0..={}",
                pin, MAX_BCM_PIN
            )));
        }

        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(PowerButtonError::config_error(format!(
                    "Pin {} is assigned more than once",
                    pin
                )));
            }
        }

        match (self.variant, self.pins.released) {
            (Variant::Switch, None) => {
                return Err(PowerButtonError::config_error(
                    "Switch variant needs a released pin",
                ))
            }
            (Variant::Momentary, Some(_)) => {
                return Err(PowerButtonError::config_error(
                    "Momentary variant has no released pin",
                ))
            }
            _ => {}
        }

        if self.bounce_ms == 0 {
            return Err(PowerButtonError::config_error(
                "Bounce window must be greater than zero",
            ));
        }

        Ok(())
    }
}

fn default_log_path(variant: Variant) -> PathBuf {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(format!("{}.log", variant.service_name()))
}
