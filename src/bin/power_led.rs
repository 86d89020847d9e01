//! Turn the button's LED ring on or off and exit.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use power_button::{DefaultLed, Indicator, DEFAULT_LED_PIN};

#[derive(Parser)]
#[command(name = "power_led")]
#[command(about = "Switch the power button LED ring on or off")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(group(ArgGroup::new("state").args(["light", "off"])))]
struct Cli {
    /// Turn the LED on
    #[arg(short, long)]
    light: bool,

    /// Turn the LED off
    #[arg(short, long)]
    off: bool,

    /// BCM pin driving the LED ring
    #[arg(long, default_value_t = DEFAULT_LED_PIN)]
    pin: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.light {
        true
    } else if cli.off {
        false
    } else {
        // Neither flag given: leave the pin untouched
        return Ok(());
    };

    let mut led = DefaultLed::new(cli.pin)
        .with_context(|| format!("failed to claim LED pin {}", cli.pin))?
        .keep_level_on_exit();
    led.set(level)
        .with_context(|| format!("failed to drive LED pin {}", cli.pin))?;

    Ok(())
}
