//! Host power actions.

use crate::button::Action;
use crate::error::{PowerButtonError, Result};
use std::process::Command;
use tracing::{info, warn};

/// Reboots or halts the host.
///
/// Both operations are fire-and-forget: a successful call normally means the
/// process is about to be killed by the system going down.
pub trait PowerController: Send + Sync {
    fn reboot(&self) -> Result<()>;

    fn shutdown_now(&self) -> Result<()>;

    /// Run the operation matching `action`. `Ignore` does nothing.
    fn perform(&self, action: Action) -> Result<()> {
        match action {
            Action::Reboot => self.reboot(),
            Action::Shutdown => self.shutdown_now(),
            Action::Ignore => Ok(()),
        }
    }
}

/// Runs `reboot` / `shutdown -h 0` on the host.
#[derive(Debug, Clone)]
pub struct SystemPowerController {
    use_sudo: bool,
}

impl SystemPowerController {
    pub fn new(use_sudo: bool) -> Self {
        Self { use_sudo }
    }

    /// Program and arguments for a power command.
    pub fn command_line(&self, args: &[&'static str]) -> Vec<&'static str> {
        let mut line = Vec::with_capacity(args.len() + 1);
        if self.use_sudo {
            line.push("sudo");
        }
        line.extend_from_slice(args);
        line
    }

    fn run(&self, args: &[&'static str]) -> Result<()> {
        let line = self.command_line(args);
        let (program, rest) = line
            .split_first()
            .ok_or_else(|| PowerButtonError::power_action_error("Empty command"))?;

        info!("Running `{}`", line.join(" "));
        let status = Command::new(program).args(rest).status().map_err(|e| {
            PowerButtonError::power_action_error(format!("Failed to run `{}`: {}", line.join(" "), e))
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(PowerButtonError::power_action_error(format!(
                "`{}` exited with {}",
                line.join(" "),
                status
            )))
        }
    }
}

impl Default for SystemPowerController {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PowerController for SystemPowerController {
    fn reboot(&self) -> Result<()> {
        self.run(&["reboot"])
    }

    fn shutdown_now(&self) -> Result<()> {
        self.run(&["shutdown", "-h", "0"])
    }
}

/// Logs the action instead of taking it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunPowerController;

impl PowerController for DryRunPowerController {
    fn reboot(&self) -> Result<()> {
        warn!("Dry run: skipping reboot");
        Ok(())
    }

    fn shutdown_now(&self) -> Result<()> {
        warn!("Dry run: skipping shutdown");
        Ok(())
    }
}
