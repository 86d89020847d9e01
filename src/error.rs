//! Error handling for the power button service.

/// A specialized `Result` type for power button operations.
pub type Result<T> = std::result::Result<T, PowerButtonError>;

/// The main error type for the power button service.
#[derive(Debug, thiserror::Error)]
pub enum PowerButtonError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GPIO setup or access failed
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reboot or shutdown command could not be run
    #[error("Power action failed: {0}")]
    PowerAction(String),

    /// Serializing the configuration failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PowerButtonError {
    /// Create a new GPIO error
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new power action error
    pub fn power_action_error(msg: impl Into<String>) -> Self {
        Self::PowerAction(msg.into())
    }

    /// Whether this error happened while bringing up hardware.
    ///
    /// Setup failures stop the service before it starts listening.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::Gpio(_) | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PowerButtonError::gpio_error("pin 23 busy");
        assert_eq!(err.to_string(), "GPIO error: pin 23 busy");

        let err = PowerButtonError::power_action_error("exit status 1");
        assert_eq!(err.to_string(), "Power action failed: exit status 1");
    }

    #[test]
    fn test_setup_failure_classification() {
        assert!(PowerButtonError::gpio_error("x").is_setup_failure());
        assert!(PowerButtonError::config_error("x").is_setup_failure());
        assert!(!PowerButtonError::power_action_error("x").is_setup_failure());
    }
}
