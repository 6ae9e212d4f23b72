/*!
# Scope Capture Application

Headless client for a single-channel serial oscilloscope: configures the
device, runs single-shot or continuous acquisition, and prints each
captured frame as a text summary or a JSON line.

## Usage

### Single capture
```bash
scopecap capture --port /dev/ttyUSB0 --timebase "1 ms"
```

### Continuous capture with JSON output
```bash
scopecap capture --port /dev/ttyUSB0 --continuous --json
```

### From a configuration file
```bash
scopecap --config scopecap.toml
```
*/

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::{error, info};

mod acquisition;
mod config;
mod controller;
mod device;
mod transport;

use config::{AppConfig, CaptureSettings, DeviceSettings};
use controller::{AcquisitionController, ScopeEvent};
use device::Device;
use shared::codec::{Timebase, TriggerEdge};
use shared::Frame;

/// How often the smoothed frame rate is reported in continuous mode
const RATE_PRINT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "scopecap")]
#[command(about = "Single-channel serial oscilloscope capture")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "scopecap.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    Ports,

    /// Capture frames from the device
    Capture {
        /// Serial port identifier
        #[arg(short, long)]
        port: String,

        /// Timebase per division, e.g. "20 us" or "1 ms"
        #[arg(short, long, default_value = "20 ms")]
        timebase: Timebase,

        /// Arm the trigger circuit
        #[arg(long)]
        trigger: bool,

        /// Trigger edge: Rising, Falling or Any
        #[arg(long, default_value = "Rising")]
        edge: TriggerEdge,

        /// Capture continuously until interrupted
        #[arg(long)]
        continuous: bool,

        /// Stop after this many frames (0 = unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        frames: u64,

        /// Emit frames as JSON lines on stdout
        #[arg(long)]
        json: bool,
    },

    /// Generate configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "scopecap.toml")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log to stderr so stdout stays clean for JSON frame output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Ports) => list_ports(),

        Some(Commands::Capture {
            port,
            timebase,
            trigger,
            edge,
            continuous,
            frames,
            json,
        }) => {
            let config = AppConfig {
                device: DeviceSettings {
                    port,
                    timebase,
                    trigger_enabled: trigger,
                    trigger_edge: edge,
                },
                capture: CaptureSettings {
                    continuous,
                    frame_limit: frames,
                    json_output: json,
                    ..CaptureSettings::default()
                },
            };
            run_capture(config)
        }

        Some(Commands::Config { output }) => generate_config_file(output),

        None => {
            let config = AppConfig::load_from_file(&cli.config)?;
            info!("running capture from config: {}", cli.config.display());
            run_capture(config)
        }
    }
}

/// Print the available serial port identifiers, one per line
fn list_ports() -> anyhow::Result<()> {
    let ports = transport::list_ports()?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

/// Connect, apply settings, and run the acquisition loop
fn run_capture(config: AppConfig) -> anyhow::Result<()> {
    if config.device.port.is_empty() {
        let available = transport::list_ports().unwrap_or_default();
        anyhow::bail!("no serial port selected; available ports: {available:?}");
    }

    let device = Device::new(transport::serial_opener())
        .with_capture_timeout(Duration::from_millis(config.capture.capture_timeout_ms));
    let mut controller = AcquisitionController::spawn(device)?;

    controller.set_timebase(config.device.timebase)?;
    controller.set_trigger_enabled(config.device.trigger_enabled)?;
    controller.set_trigger_edge(config.device.trigger_edge)?;

    info!(
        "🔌 connecting to '{}' (waiting for device boot)",
        config.device.port
    );
    controller.connect(&config.device.port)?;
    info!("✅ connected, timebase {}", config.device.timebase);

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_handler.store(false, Ordering::SeqCst);
    })?;

    let outcome = capture_loop(&mut controller, &config, &running);

    controller.stop();
    controller.disconnect()?;

    let frames_seen = outcome?;
    info!("captured {} frame(s)", frames_seen);
    Ok(())
}

/// Run the acquisition loop until the frame limit is reached, the run
/// flag drops, or a capture fails. A capture failure is an error result
/// so the process exits non-zero.
fn capture_loop(
    controller: &mut AcquisitionController,
    config: &AppConfig,
    running: &AtomicBool,
) -> anyhow::Result<u64> {
    if config.capture.continuous {
        controller.continuous_run()?;
    } else {
        controller.single_run()?;
    }

    let sample_period = config.device.timebase.seconds_per_sample();
    let mut frames_seen = 0u64;
    let mut last_rate_print = Instant::now();

    while running.load(Ordering::SeqCst) {
        match controller.poll_event(Duration::from_millis(100)) {
            Some(ScopeEvent::FrameReady { frame, .. }) => {
                frames_seen += 1;
                print_frame(&frame, frames_seen, sample_period, config.capture.json_output)?;

                if !config.capture.continuous {
                    break;
                }
                if config.capture.frame_limit > 0 && frames_seen >= config.capture.frame_limit {
                    break;
                }
                if last_rate_print.elapsed() >= RATE_PRINT_INTERVAL {
                    info!(
                        "📊 {:.2} fps ({:.3} s/frame)",
                        controller.frames_per_second(),
                        controller.seconds_per_frame()
                    );
                    last_rate_print = Instant::now();
                }
            }
            Some(ScopeEvent::CaptureFailed(e)) => {
                error!("capture failed: {e}");
                return Err(e.into());
            }
            None => continue,
        }
    }

    Ok(frames_seen)
}

/// Print one frame as a JSON line or a text summary
fn print_frame(frame: &Frame, number: u64, sample_period: f64, json: bool) -> anyhow::Result<()> {
    if json {
        let captured_at: chrono::DateTime<chrono::Local> = frame.captured_at().into();
        let json_output = serde_json::json!({
            "frame": number,
            "captured_at": captured_at.to_rfc3339(),
            "sample_period_s": sample_period,
            "volts": frame.samples(),
        });
        println!("{json_output}");
        std::io::stdout().flush()?;
    } else {
        println!(
            "frame {number}: {} samples, min {:.3} V, max {:.3} V, mean {:.3} V",
            frame.len(),
            frame.min_volts(),
            frame.max_volts(),
            frame.mean_volts()
        );
    }
    Ok(())
}

/// Generate a default configuration file
fn generate_config_file(output_path: PathBuf) -> anyhow::Result<()> {
    let config = AppConfig::new();
    config.save_to_file(&output_path)?;

    println!("✅ Generated configuration file: {}", output_path.display());
    println!("📝 Edit the file to customize settings, then run:");
    println!("   scopecap --config {}", output_path.display());

    Ok(())
}
