//! Asetek Cooler Control CLI
//!
//! Command-line interface for monitoring and controlling Asetek 5th gen
//! coolers (NZXT Kraken X31/X41/X61).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use asetek_rust_devices::config::{DriverOptions, SpeedProfile};
use asetek_rust_devices::device::{AsetekCooler, UsbTransport};
use asetek_rust_devices::protocol::AnimationSpeed;
use asetek_rust_devices::storage::{self, AppConfig, FileLightingStore};
use asetek_rust_devices::utils::parsing::{
    parse_channel, parse_hex_color, parse_lighting_mode, parse_speed_profile,
};

type Cooler = AsetekCooler<UsbTransport, FileLightingStore>;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Asetek Cooler Control Tool
#[derive(Parser, Debug)]
#[command(name = "asetek-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Validate and log commands without sending them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Show debug output, including every frame sent and received
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List connected coolers
    List,

    /// Open the USBXpress bridge and release buffers
    Initialize,

    /// Show current device status
    Status,

    /// Continuously monitor device status
    Monitor {
        /// Update interval in seconds
        #[arg(short, long, default_value = "1")]
        interval: u64,
    },

    /// Set fixed fan speed
    SetFan {
        /// Duty cycle percentage (clamped to 30-100)
        duty: i32,
    },

    /// Set fixed pump speed
    SetPump {
        /// Duty cycle percentage (clamped to 50-100)
        duty: i32,
    },

    /// Apply a fan speed profile
    Profile {
        /// Stored profile name, silent, performance, fixed:XX, or temp:duty,...
        name: String,

        /// Channel to apply the profile to
        #[arg(short, long, default_value = "fan")]
        channel: String,

        /// Save the points under this name in the config file
        #[arg(long)]
        save: Option<String>,
    },

    /// Set lighting mode and colors
    Color {
        /// Channel: sync or logo
        channel: String,

        /// Mode: fixed, alternating, blinking or off
        mode: String,

        /// Colors as hex (#RRGGBB); at most two are used
        colors: Vec<String>,

        /// Animation speed: fastest, faster, normal, slower, slowest or 1-255
        #[arg(short, long, default_value = "normal")]
        speed: String,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = storage::load_config().context("Failed to load config")?;
    let options = DriverOptions {
        dry_run: args.dry_run || config.dry_run,
        ..DriverOptions::default()
    };

    match args.command {
        Command::List => cmd_list(),
        Command::Initialize => cmd_initialize(options),
        Command::Status => cmd_status(options),
        Command::Monitor { interval } => cmd_monitor(options, interval),
        Command::SetFan { duty } => cmd_set_fixed(options, "fan", duty),
        Command::SetPump { duty } => cmd_set_fixed(options, "pump", duty),
        Command::Profile {
            name,
            channel,
            save,
        } => cmd_profile(options, config, &name, &channel, save.as_deref()),
        Command::Color {
            channel,
            mode,
            colors,
            speed,
        } => cmd_color(options, &channel, &mode, &colors, &speed),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Open the first cooler, run `f` on it and always disconnect afterwards.
fn with_cooler<R>(options: DriverOptions, f: impl FnOnce(&mut Cooler) -> Result<R>) -> Result<R> {
    let transport = UsbTransport::find_first().context("Failed to find an Asetek cooler")?;
    let store = FileLightingStore::in_data_dir().context("Failed to locate lighting state")?;
    let mut cooler =
        AsetekCooler::new(transport, store, options).context("Failed to load lighting state")?;

    cooler.connect().context("Failed to connect to cooler")?;
    let result = f(&mut cooler);
    cooler.disconnect();
    result
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_list() -> Result<()> {
    let devices = UsbTransport::list_devices().context("Failed to enumerate devices")?;

    if devices.is_empty() {
        println!("❌ No Asetek coolers found.");
        return Ok(());
    }

    println!("🔍 Found {} device(s):\n", devices.len());
    for (i, device) in devices.iter().enumerate() {
        println!("  {}. {}", i + 1, device);
    }

    Ok(())
}

fn cmd_initialize(options: DriverOptions) -> Result<()> {
    with_cooler(options, |cooler| {
        cooler.initialize().context("Failed to initialize device")?;
        println!("✅ Cooler initialized");
        Ok(())
    })
}

fn cmd_status(options: DriverOptions) -> Result<()> {
    with_cooler(options, |cooler| {
        let status = cooler.get_status().context("Failed to read status")?;
        print!("{}", status);
        Ok(())
    })
}

fn cmd_monitor(options: DriverOptions, interval_secs: u64) -> Result<()> {
    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    with_cooler(options, |cooler| {
        println!("🌡️  Monitoring cooler (Ctrl+C to stop)...\n");

        while running.load(Ordering::SeqCst) {
            match cooler.get_status() {
                Ok(status) => {
                    // Clear screen and move cursor to top
                    print!("\x1B[2J\x1B[1;1H");
                    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
                    print!("{}", status);
                }
                Err(e) => {
                    eprintln!("⚠️  Read error: {}", e);
                }
            }

            std::thread::sleep(Duration::from_secs(interval_secs));
        }

        println!("\n👋 Monitoring stopped.");
        Ok(())
    })
}

fn cmd_set_fixed(options: DriverOptions, channel_str: &str, duty: i32) -> Result<()> {
    let channel = parse_channel(channel_str)?;

    with_cooler(options, |cooler| {
        cooler
            .set_fixed_speed(channel, duty)
            .with_context(|| format!("Failed to set {} speed", channel))?;
        println!("✅ {} speed set to {}%", channel, channel.clamp_duty(duty));
        Ok(())
    })
}

fn cmd_profile(
    options: DriverOptions,
    mut config: AppConfig,
    name: &str,
    channel_str: &str,
    save_as: Option<&str>,
) -> Result<()> {
    let channel = parse_channel(channel_str)?;
    let profile = match config.profile(name) {
        Ok(stored) => SpeedProfile::Custom(stored.points.clone()),
        Err(_) => parse_speed_profile(name)?,
    };
    let points = profile.to_points();

    with_cooler(options, |cooler| {
        cooler
            .set_speed_profile(channel, &points)
            .context("Failed to apply profile")?;
        Ok(())
    })?;
    println!("✅ Applied {} profile to {}", profile, channel);

    if let Some(save_name) = save_as {
        config.set_profile(save_name, points);
        storage::save_config(&config).context("Failed to save config")?;
        println!("💾 Saved profile as '{}'", save_name.to_lowercase());
    }

    Ok(())
}

fn cmd_color(
    options: DriverOptions,
    channel_str: &str,
    mode_str: &str,
    colors: &[String],
    speed_str: &str,
) -> Result<()> {
    let channel = parse_channel(channel_str)?;
    let mode = parse_lighting_mode(mode_str)?;
    let colors = colors
        .iter()
        .map(|c| parse_hex_color(c))
        .collect::<asetek_rust_devices::Result<Vec<_>>>()?;
    let speed = AnimationSpeed::parse(speed_str);

    with_cooler(options, |cooler| {
        cooler
            .set_color(channel, mode, &colors, &speed)
            .context("Failed to set lighting")?;
        println!("✅ {} lighting set to {}", channel, mode);
        Ok(())
    })
}
