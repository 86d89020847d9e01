//! The button service: routes edges into a classifier and acts on the result.
//!
//! Edge callbacks may arrive on several threads at once (one per input pin
//! on real hardware). The classifier sits behind a mutex that is held only
//! while an edge is classified, so read-then-update of the timing state is
//! never interleaved. Power actions and log writes run after the lock is
//! released.

use crate::button::{Action, Classifier, Decision, EdgeEvent, Signal, TimingState};
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::gpio::{EdgeSource, Indicator};
use crate::journal::EventLog;
use crate::power::PowerController;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Classifier plus the collaborators a decision is handed to.
pub struct ButtonService<C> {
    classifier: Mutex<C>,
    power: Arc<dyn PowerController>,
    log: Arc<EventLog>,
}

impl<C: Classifier + 'static> ButtonService<C> {
    pub fn new(classifier: C, power: Arc<dyn PowerController>, log: Arc<EventLog>) -> Self {
        Self {
            classifier: Mutex::new(classifier),
            power,
            log,
        }
    }

    fn lock(&self) -> MutexGuard<'_, C> {
        // A panic mid-classification must not take the service down with it.
        self.classifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the classifier's timing state.
    pub fn timing(&self) -> TimingState {
        self.lock().timing()
    }

    /// Classify one edge and carry out the resulting action.
    pub fn handle_edge(&self, event: EdgeEvent) -> Result<Decision> {
        let decision = self.lock().classify(event);

        self.log.note(format!("   {}", decision));
        match decision.action() {
            Action::Shutdown => self.log.note("Shutting down"),
            Action::Reboot => self.log.note("Rebooting"),
            Action::Ignore => {
                if let Decision::Classified { .. } = decision {
                    self.log.note("ignoring edge");
                }
            }
        }

        self.power.perform(decision.action())?;
        Ok(decision)
    }

    /// Entry point for edge callbacks. Errors and panics are logged and
    /// swallowed so one bad edge never stops the service.
    pub fn on_edge(&self, pin: u8, event: EdgeEvent) -> Option<Decision> {
        self.log
            .note(format!("{} edge on pin {}", event.signal, pin));

        match panic::catch_unwind(AssertUnwindSafe(|| self.handle_edge(event))) {
            Ok(Ok(decision)) => Some(decision),
            Ok(Err(e)) => {
                self.log.note(format!("ERROR: {}", e));
                None
            }
            Err(payload) => {
                self.log.note(format!(
                    "ERROR: edge handler panicked: {}",
                    panic_message(payload.as_ref())
                ));
                None
            }
        }
    }

    /// Register one callback per input pin on `source`.
    pub fn attach<S: EdgeSource>(
        self: &Arc<Self>,
        source: &mut S,
        routes: &[(u8, Signal)],
        bounce: Duration,
    ) -> Result<()> {
        for &(pin, signal) in routes {
            let service = Arc::clone(self);
            source.on_edge(
                pin,
                bounce,
                Box::new(move |at| {
                    service.on_edge(pin, EdgeEvent::new(signal, at));
                }),
            )?;
            debug!(pin, %signal, "Edge route attached");
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Why the service stopped listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl-C
    Interrupted,
    /// SIGTERM from the service supervisor
    Terminated,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Interrupted => write!(f, "keyboard exception occurred"),
            StopReason::Terminated => write!(f, "termination signal received"),
        }
    }
}

/// Wait for Ctrl-C or, on Unix, SIGTERM.
pub async fn wait_for_signal() -> Result<StopReason> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok(StopReason::Interrupted)
            }
            _ = terminate.recv() => Ok(StopReason::Terminated),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(StopReason::Interrupted)
    }
}

/// Hardware held for the lifetime of one run. Dropping it releases the
/// input pins and writes the termination line, on every exit path.
struct Session<S: EdgeSource, L> {
    source: S,
    led: L,
    log: Arc<EventLog>,
    name: &'static str,
}

impl<S: EdgeSource, L> Drop for Session<S, L> {
    fn drop(&mut self) {
        self.source.release();
        self.log.note(format!("{} terminated", self.name));
    }
}

/// Run the service until `shutdown` resolves.
///
/// Setup failures (pins busy, LED unavailable) are returned before the
/// service starts listening.
pub async fn run_until<C, S, L, F>(
    config: &ServiceConfig,
    classifier: C,
    source: S,
    led: L,
    power: Arc<dyn PowerController>,
    log: Arc<EventLog>,
    shutdown: F,
) -> Result<()>
where
    C: Classifier + 'static,
    S: EdgeSource,
    L: Indicator,
    F: Future<Output = Result<StopReason>>,
{
    let name = config.variant.service_name();
    log.note(format!("{} started", name));

    let mut session = Session {
        source,
        led,
        log: Arc::clone(&log),
        name,
    };

    let service = Arc::new(ButtonService::new(classifier, power, Arc::clone(&log)));
    service.attach(&mut session.source, &config.pins.routes(), config.bounce())?;
    session.led.set(config.led_on)?;

    match shutdown.await {
        Ok(reason) => {
            log.note(reason.to_string());
            Ok(())
        }
        Err(e) => {
            log.note(format!("ERROR: an unhandled error occurred: {}", e));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::{MomentaryClassifier, SwitchClassifier};
    use crate::config::Variant;
    use crate::error::PowerButtonError;
    use crate::gpio::{MockGpio, MockLed};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    #[derive(Default)]
    struct Recorder {
        actions: Mutex<Vec<Action>>,
        fail: bool,
    }

    impl Recorder {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn actions(&self) -> Vec<Action> {
            self.actions.lock().unwrap().clone()
        }

        fn push(&self, action: Action) -> Result<()> {
            self.actions.lock().unwrap().push(action);
            if self.fail {
                Err(PowerButtonError::power_action_error("command not found"))
            } else {
                Ok(())
            }
        }
    }

    impl PowerController for Recorder {
        fn reboot(&self) -> Result<()> {
            self.push(Action::Reboot)
        }

        fn shutdown_now(&self) -> Result<()> {
            self.push(Action::Shutdown)
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn quiet_log() -> Arc<EventLog> {
        Arc::new(EventLog::from_writer(std::io::sink()))
    }

    fn at(base: Instant, secs: f64) -> Instant {
        base + Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_handle_edge_dispatches_reboot() {
        let recorder = Arc::new(Recorder::default());
        let service = ButtonService::new(MomentaryClassifier::new(), recorder.clone(), quiet_log());
        let base = Instant::now();

        service.handle_edge(EdgeEvent::pressed(base)).unwrap();
        let decision = service.handle_edge(EdgeEvent::pressed(at(base, 1.0))).unwrap();

        assert_eq!(decision.action(), Action::Reboot);
        assert_eq!(recorder.actions(), vec![Action::Reboot]);
    }

    #[test]
    fn test_power_failure_does_not_stop_service() {
        let recorder = Arc::new(Recorder::failing());
        let service = ButtonService::new(SwitchClassifier::new(), recorder.clone(), quiet_log());
        let base = Instant::now();

        service.on_edge(23, EdgeEvent::pressed(base));
        assert_eq!(service.on_edge(25, EdgeEvent::released(at(base, 2.0))), None);

        // Next cycle is still classified and dispatched
        service.on_edge(23, EdgeEvent::pressed(at(base, 10.0)));
        service.on_edge(25, EdgeEvent::released(at(base, 22.0)));
        assert_eq!(recorder.actions(), vec![Action::Reboot, Action::Shutdown]);
    }

    /// Panics on its first reboot, then records like `Recorder`
    #[derive(Default)]
    struct PanicsOnce {
        panicked: AtomicBool,
        inner: Recorder,
    }

    impl PowerController for PanicsOnce {
        fn reboot(&self) -> Result<()> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("reboot helper crashed");
            }
            self.inner.reboot()
        }

        fn shutdown_now(&self) -> Result<()> {
            self.inner.shutdown_now()
        }
    }

    #[test]
    fn test_panic_in_dispatch_is_contained() {
        let power = Arc::new(PanicsOnce::default());
        let buffer = SharedBuffer::default();
        let log = Arc::new(EventLog::from_writer(buffer.clone()));
        let service = ButtonService::new(MomentaryClassifier::new(), power.clone(), log);
        let base = Instant::now();

        service.on_edge(23, EdgeEvent::pressed(base));
        assert_eq!(service.on_edge(23, EdgeEvent::pressed(at(base, 1.0))), None);
        assert!(buffer
            .contents()
            .contains("ERROR: edge handler panicked: reboot helper crashed"));

        // The anchor survived and the next press is still dispatched
        let decision = service.on_edge(23, EdgeEvent::pressed(at(base, 2.0)));
        assert_eq!(decision.map(|d| d.action()), Some(Action::Reboot));
        assert_eq!(power.inner.actions(), vec![Action::Reboot]);
        assert_eq!(service.timing().last_edge, Some(base));
    }

    #[tokio::test]
    async fn test_run_until_releases_pins() {
        let config = ServiceConfig::for_variant(Variant::Switch);
        let gpio = MockGpio::new().unwrap();
        let led = MockLed::new(24).unwrap();
        let recorder = Arc::new(Recorder::default());

        let probe_gpio = gpio.clone();
        let probe_led = led.clone();
        let shutdown = async move {
            assert!(probe_gpio.is_registered(23));
            assert!(probe_gpio.is_registered(25));
            assert!(probe_led.is_on());

            let base = Instant::now();
            probe_gpio.fire(23, base);
            probe_gpio.fire(25, at(base, 12.0));
            Ok::<_, PowerButtonError>(StopReason::Interrupted)
        };

        run_until(
            &config,
            SwitchClassifier::new(),
            gpio.clone(),
            led,
            recorder.clone(),
            quiet_log(),
            shutdown,
        )
        .await
        .unwrap();

        assert_eq!(recorder.actions(), vec![Action::Shutdown]);
        assert!(!gpio.is_registered(23));
        assert!(!gpio.is_registered(25));
    }

    #[tokio::test]
    async fn test_run_until_fails_on_busy_pin() {
        let config = ServiceConfig::for_variant(Variant::Momentary);
        let mut gpio = MockGpio::new().unwrap();
        gpio.on_edge(23, Duration::from_millis(200), Box::new(|_| {}))
            .unwrap();

        let result = run_until(
            &config,
            MomentaryClassifier::new(),
            gpio.clone(),
            MockLed::new(24).unwrap(),
            Arc::new(Recorder::default()),
            quiet_log(),
            async { Ok::<_, PowerButtonError>(StopReason::Terminated) },
        )
        .await;

        assert!(matches!(result, Err(ref e) if e.is_setup_failure()));
        // Cleanup ran on the error path too
        assert!(!gpio.is_registered(23));
    }
}
