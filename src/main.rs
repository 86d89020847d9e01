//! Power Button - reboot/shutdown daemon
//!
//! Runs under a service supervisor, keeps the LED ring lit and waits for
//! button edges until it is interrupted or the host goes down.

use clap::{Args, Parser, Subcommand};
use power_button::{
    run_until, wait_for_signal, DefaultEdgeSource, DefaultLed, DryRunPowerController, EventLog,
    MomentaryClassifier, PowerController, ServiceConfig, SwitchClassifier, SystemPowerController,
    Variant,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "power_button")]
#[command(about = "Reboot or shut down a Raspberry Pi from a GPIO push-button")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Latching on/off switch with both contacts wired
    Switch(RunArgs),

    /// Momentary push-button with the normally-open contact wired
    Momentary(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// BCM pin of the normally-open contact
    #[arg(long)]
    pressed_pin: Option<u8>,

    /// BCM pin of the normally-closed contact (switch only)
    #[arg(long)]
    released_pin: Option<u8>,

    /// BCM pin driving the LED ring
    #[arg(long)]
    led_pin: Option<u8>,

    /// Debounce window in milliseconds
    #[arg(long, default_value_t = power_button::DEFAULT_BOUNCE_MS)]
    bounce_ms: u64,

    /// Event log file (defaults to $HOME/<name>.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Keep the LED ring dark while running
    #[arg(long)]
    no_led: bool,

    /// Log decisions without rebooting or shutting down
    #[arg(long)]
    dry_run: bool,

    /// Run power commands directly instead of through sudo
    #[arg(long)]
    no_sudo: bool,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    let (variant, args) = match &cli.command {
        Commands::Switch(args) => (Variant::Switch, args),
        Commands::Momentary(args) => (Variant::Momentary, args),
    };

    let config = build_config(variant, args);
    config.validate()?;

    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    serve(config).await
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn build_config(variant: Variant, args: &RunArgs) -> ServiceConfig {
    let mut config = ServiceConfig::for_variant(variant)
        .with_bounce_ms(args.bounce_ms)
        .with_led(!args.no_led)
        .with_dry_run(args.dry_run)
        .with_sudo(!args.no_sudo);

    if let Some(pin) = args.pressed_pin {
        config = config.with_pressed_pin(pin);
    }
    if let Some(pin) = args.released_pin {
        config = config.with_released_pin(pin);
    }
    if let Some(pin) = args.led_pin {
        config = config.with_led_pin(pin);
    }
    if let Some(path) = &args.log_file {
        config = config.with_log_path(path.clone());
    }

    config
}

async fn serve(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting {} service...", config.variant);
    info!("  - Pins: {:?}", config.pins);
    info!("  - Bounce window: {}ms", config.bounce_ms);
    info!("  - Event log: {}", config.log_path.display());

    let log = Arc::new(EventLog::open(&config.log_path)?);

    let power: Arc<dyn PowerController> = if config.dry_run {
        info!("Dry run enabled, power actions will only be logged");
        Arc::new(DryRunPowerController)
    } else {
        Arc::new(SystemPowerController::new(config.use_sudo))
    };

    #[cfg(not(feature = "gpio"))]
    tracing::warn!("GPIO support not compiled in, no button edges will be delivered");

    let hardware = DefaultEdgeSource::new()
        .and_then(|source| Ok((source, DefaultLed::new(config.pins.led)?)));
    let (source, led) = match hardware {
        Ok(hardware) => hardware,
        Err(e) => {
            log.note(format!("ERROR: {}", e));
            return Err(e.into());
        }
    };

    let result = match config.variant {
        Variant::Switch => {
            run_until(
                &config,
                SwitchClassifier::new(),
                source,
                led,
                power,
                Arc::clone(&log),
                wait_for_signal(),
            )
            .await
        }
        Variant::Momentary => {
            run_until(
                &config,
                MomentaryClassifier::new(),
                source,
                led,
                power,
                Arc::clone(&log),
                wait_for_signal(),
            )
            .await
        }
    };

    if let Ok(log) = Arc::try_unwrap(log) {
        log.close()?;
    }

    result?;
    Ok(())
}
