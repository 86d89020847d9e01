//! GPIO access for the button inputs and the LED ring.
//!
//! Inputs are configured with a pull-down and deliver falling edges through
//! [`EdgeSource::on_edge`]. Each registration carries its own bounce window;
//! edges closer together than that window are dropped here, before any
//! classifier sees them.
//!
//! Real hardware is behind the `gpio` feature so the crate still builds on
//! machines without a Raspberry Pi. The in-process mock is always compiled
//! and is what the tests drive.

use crate::error::{PowerButtonError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Callback invoked with the arrival time of each accepted falling edge.
pub type EdgeCallback = Box<dyn FnMut(Instant) + Send + 'static>;

/// Something that can deliver falling-edge notifications for input pins.
pub trait EdgeSource {
    /// Configure `pin` as a pulled-down input and call `callback` on every
    /// falling edge that survives the `bounce` window.
    fn on_edge(&mut self, pin: u8, bounce: Duration, callback: EdgeCallback) -> Result<()>;

    /// Drop every registration and hand the pins back to the system.
    fn release(&mut self);
}

/// A digital output driving the LED ring.
pub trait Indicator {
    /// Drive the LED high (`true`) or low.
    fn set(&mut self, on: bool) -> Result<()>;
}

/// Per-pin filter for mechanical contact bounce.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Accept the edge unless it lands inside the window of the last accepted one.
    pub fn accept(&mut self, at: Instant) -> bool {
        match self.last_accepted {
            Some(last) if at.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last_accepted = Some(at);
                true
            }
        }
    }
}

#[cfg(feature = "gpio")]
mod raspberry_pi {
    use super::*;
    use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};

    /// Raspberry Pi edge source using rppal interrupts.
    pub struct RaspberryPiGpio {
        gpio: Gpio,
        // Keeping the pins alive keeps their interrupt threads alive
        inputs: Vec<InputPin>,
    }

    impl RaspberryPiGpio {
        /// Open the GPIO peripheral.
        pub fn new() -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                PowerButtonError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;

            Ok(Self {
                gpio,
                inputs: Vec::new(),
            })
        }
    }

    impl EdgeSource for RaspberryPiGpio {
        fn on_edge(&mut self, pin: u8, bounce: Duration, mut callback: EdgeCallback) -> Result<()> {
            let mut input = self
                .gpio
                .get(pin)
                .map_err(|e| {
                    PowerButtonError::gpio_error(format!("Failed to access pin {}: {}", pin, e))
                })?
                .into_input_pulldown();

            let mut debouncer = Debouncer::new(bounce);
            input
                .set_async_interrupt(Trigger::FallingEdge, move |_level| {
                    let now = Instant::now();
                    if debouncer.accept(now) {
                        callback(now);
                    }
                })
                .map_err(|e| {
                    PowerButtonError::gpio_error(format!(
                        "Failed to register interrupt on pin {}: {}",
                        pin, e
                    ))
                })?;

            tracing::debug!(pin, bounce_ms = bounce.as_millis() as u64, "Registered falling edge");
            self.inputs.push(input);
            Ok(())
        }

        fn release(&mut self) {
            for input in &mut self.inputs {
                if let Err(e) = input.clear_async_interrupt() {
                    tracing::warn!("Failed to clear interrupt on pin {}: {}", input.pin(), e);
                }
            }
            self.inputs.clear();
        }
    }

    /// LED ring on a Raspberry Pi output pin.
    pub struct RaspberryPiLed {
        pin: OutputPin,
    }

    impl RaspberryPiLed {
        /// Claim `pin` as an output. The pin is reset when the LED is dropped.
        pub fn new(pin: u8) -> Result<Self> {
            let pin = Gpio::new()
                .and_then(|gpio| gpio.get(pin))
                .map_err(|e| {
                    PowerButtonError::gpio_error(format!("Failed to access LED pin {}: {}", pin, e))
                })?
                .into_output();

            Ok(Self { pin })
        }

        /// Leave the pin at its last level when dropped.
        pub fn keep_level_on_exit(mut self) -> Self {
            self.pin.set_reset_on_drop(false);
            self
        }
    }

    impl Indicator for RaspberryPiLed {
        fn set(&mut self, on: bool) -> Result<()> {
            if on {
                self.pin.set_high();
            } else {
                self.pin.set_low();
            }
            Ok(())
        }
    }
}

mod mock {
    use super::*;

    struct Registration {
        debouncer: Debouncer,
        callback: EdgeCallback,
    }

    /// In-process edge source. Clones share the same registrations, so a
    /// test can keep one handle and fire edges after giving the other away.
    #[derive(Clone, Default)]
    pub struct MockGpio {
        handlers: Arc<Mutex<HashMap<u8, Arc<Mutex<Registration>>>>>,
    }

    impl MockGpio {
        pub fn new() -> Result<Self> {
            Ok(Self::default())
        }

        /// Deliver a falling edge on `pin` arriving at `at`.
        ///
        /// Returns `false` if nothing is registered on the pin or the edge
        /// fell inside the bounce window. Edges on different pins may be
        /// fired concurrently; edges on the same pin are serialized.
        pub fn fire(&self, pin: u8, at: Instant) -> bool {
            let registration = match self.handlers.lock() {
                Ok(handlers) => handlers.get(&pin).cloned(),
                Err(poisoned) => poisoned.into_inner().get(&pin).cloned(),
            };
            let Some(registration) = registration else {
                return false;
            };

            let mut registration = match registration.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !registration.debouncer.accept(at) {
                return false;
            }
            (registration.callback)(at);
            true
        }

        /// Whether `pin` currently has a callback attached.
        pub fn is_registered(&self, pin: u8) -> bool {
            self.handlers
                .lock()
                .map(|handlers| handlers.contains_key(&pin))
                .unwrap_or(false)
        }
    }

    impl EdgeSource for MockGpio {
        fn on_edge(&mut self, pin: u8, bounce: Duration, callback: EdgeCallback) -> Result<()> {
            let mut handlers = self
                .handlers
                .lock()
                .map_err(|_| PowerButtonError::gpio_error("Mock GPIO state poisoned"))?;

            if handlers.contains_key(&pin) {
                return Err(PowerButtonError::gpio_error(format!(
                    "Pin {} is already in use",
                    pin
                )));
            }

            handlers.insert(
                pin,
                Arc::new(Mutex::new(Registration {
                    debouncer: Debouncer::new(bounce),
                    callback,
                })),
            );
            Ok(())
        }

        fn release(&mut self) {
            if let Ok(mut handlers) = self.handlers.lock() {
                handlers.clear();
            }
        }
    }

    /// LED that only remembers its level.
    #[derive(Clone, Default)]
    pub struct MockLed {
        level: Arc<AtomicBool>,
    }

    impl MockLed {
        pub fn new(_pin: u8) -> Result<Self> {
            Ok(Self::default())
        }

        pub fn keep_level_on_exit(self) -> Self {
            self
        }

        pub fn is_on(&self) -> bool {
            self.level.load(Ordering::SeqCst)
        }
    }

    impl Indicator for MockLed {
        fn set(&mut self, on: bool) -> Result<()> {
            self.level.store(on, Ordering::SeqCst);
            Ok(())
        }
    }
}

pub use mock::{MockGpio, MockLed};

#[cfg(feature = "gpio")]
pub use raspberry_pi::{RaspberryPiGpio, RaspberryPiLed};

// Re-export the appropriate GPIO provider
#[cfg(feature = "gpio")]
pub use raspberry_pi::{RaspberryPiGpio as DefaultEdgeSource, RaspberryPiLed as DefaultLed};

#[cfg(not(feature = "gpio"))]
pub use mock::{MockGpio as DefaultEdgeSource, MockLed as DefaultLed};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debouncer_drops_edges_inside_window() {
        let base = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));

        assert!(debouncer.accept(base));
        assert!(!debouncer.accept(base + Duration::from_millis(50)));
        assert!(!debouncer.accept(base + Duration::from_millis(199)));
        assert!(debouncer.accept(base + Duration::from_millis(200)));
        // Window restarts from the last accepted edge
        assert!(!debouncer.accept(base + Duration::from_millis(350)));
    }

    #[test]
    fn test_mock_gpio_delivers_registered_edges() {
        let mut gpio = MockGpio::new().unwrap();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);

        gpio.on_edge(
            23,
            Duration::from_millis(200),
            Box::new(move |at| sink.lock().unwrap().push(at)),
        )
        .unwrap();

        let base = Instant::now();
        assert!(gpio.fire(23, base));
        assert!(!gpio.fire(23, base + Duration::from_millis(100)));
        assert!(!gpio.fire(24, base));
        assert_eq!(hits.lock().unwrap().as_slice(), &[base]);
    }

    #[test]
    fn test_mock_gpio_rejects_pin_in_use() {
        let mut gpio = MockGpio::new().unwrap();
        gpio.on_edge(23, Duration::from_millis(200), Box::new(|_| {}))
            .unwrap();
        let err = gpio
            .on_edge(23, Duration::from_millis(200), Box::new(|_| {}))
            .unwrap_err();
        assert!(err.is_setup_failure());
    }

    #[test]
    fn test_mock_gpio_release_clears_registrations() {
        let mut gpio = MockGpio::new().unwrap();
        let observer = gpio.clone();
        gpio.on_edge(25, Duration::from_millis(200), Box::new(|_| {}))
            .unwrap();
        assert!(observer.is_registered(25));

        gpio.release();
        assert!(!observer.is_registered(25));
        assert!(!observer.fire(25, Instant::now()));
    }

    #[test]
    fn test_mock_led() {
        let mut led = MockLed::new(24).unwrap();
        let observer = led.clone();
        led.set(true).unwrap();
        assert!(observer.is_on());
        led.set(false).unwrap();
        assert!(!observer.is_on());
    }
}
