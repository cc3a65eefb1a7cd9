mod config;
mod dashboard;
mod door;
mod gpio;
mod messages;
mod schedule;
mod status;

use std::time::Instant;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

use config::ConfigManager;
use dashboard::DashboardClient;
use door::{DoorController, DoorState};
use gpio::{DoorIo, RppalDoorIo};
use messages::{Command, ControllerMessage, DashboardMessage};
use schedule::TimeOfDay;
use status::StatusReporter;

/// Polling interval of the main loop. Four ticks per second is ample for
/// minute-granularity triggers and keeps sensor stop latency low.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Everything runs on one thread: the tick handler, the command handlers
/// and the outbound drain are dispatched from a single select loop, so no
/// state is ever touched concurrently.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roost=info".into()),
        )
        .init();

    tracing::info!(
        "Starting roost coop door controller v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let mut config = ConfigManager::new().await?;
    let dashboard_config = config.dashboard_config();

    // Parse command-line arguments (can override config values)
    let args: Vec<String> = std::env::args().collect();
    let host = args
        .iter()
        .position(|arg| arg == "--host")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.to_string())
        .unwrap_or(dashboard_config.host);

    let port = args
        .iter()
        .position(|arg| arg == "--port")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(dashboard_config.port);

    let token = args
        .iter()
        .position(|arg| arg == "--token")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.to_string())
        .unwrap_or(dashboard_config.token);

    if token.is_empty() {
        bail!("No dashboard auth token; pass --token or set it in the config file");
    }

    let io = RppalDoorIo::new().context("Failed to set up door GPIO")?;

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let mut door = DoorController::new(io, config.schedule(), outbound_tx.clone());
    let mut reporter = StatusReporter::new(outbound_tx.clone());
    tracing::info!("Door controller initialized, schedule {}", door.schedule());

    let mut dashboard = DashboardClient::connect(&host, port, &token).await?;

    let mut ticker = interval(TICK_INTERVAL);
    let run_result = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = door.tick(TimeOfDay::now_local(), Instant::now()) {
                    tracing::error!("Door tick failed: {:#}", e);
                }
                reporter.tick(door.door_label(), door.schedule());
            }
            frame = dashboard.next_message() => {
                match frame {
                    Some(Ok(frame)) => {
                        handle_frame(frame, &mut door, &mut config, &outbound_tx).await;
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Dropping bad dashboard frame: {:#}", e);
                    }
                    None => break Err(anyhow::anyhow!("Dashboard connection closed")),
                }
            }
            Some(message) = outbound_rx.recv() => {
                if let Err(e) = dashboard.send(&message).await {
                    break Err(e);
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break Ok(());
            }
        }
    };

    // Never leave a relay energized behind us, whatever ended the loop.
    tracing::info!("Shutting down...");
    if door.state() != DoorState::Idle {
        tracing::warn!("Shutdown interrupts door travel; releasing relays");
    }
    if let Err(e) = door.halt() {
        tracing::error!("Failed to release relays on shutdown: {:#}", e);
    }

    tracing::info!("Shutdown complete");
    run_result
}

/// Decode one inbound dashboard frame and dispatch it; decode failures are
/// logged and dropped so one bad remote write never stalls the loop.
async fn handle_frame<I: DoorIo>(
    frame: DashboardMessage,
    door: &mut DoorController<I>,
    config: &mut ConfigManager,
    outbound: &mpsc::UnboundedSender<ControllerMessage>,
) {
    let DashboardMessage::PinWrite { pin, value } = frame else {
        return;
    };

    let command = match Command::from_pin_write(pin, value) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!("Rejected dashboard command: {}", e);
            return;
        }
    };

    if let Err(e) = apply_command(command, door, config, outbound).await {
        tracing::error!("Command {:?} failed: {:#}", command, e);
    }
}

async fn apply_command<I: DoorIo>(
    command: Command,
    door: &mut DoorController<I>,
    config: &mut ConfigManager,
    outbound: &mpsc::UnboundedSender<ControllerMessage>,
) -> Result<()> {
    match command {
        Command::ManualOpen => {
            door.start_retract(Instant::now())?;
            show_manual_label(outbound, "Manual OPEN");
        }
        Command::ManualClose => {
            door.start_extend(Instant::now())?;
            show_manual_label(outbound, "Manual Close");
        }
        Command::Reset => {
            tracing::info!("Remote reset, forcing both relays off");
            door.halt()?;
        }
        Command::SetOpenTime(time) => {
            config.set_open_time(time).await?;
            door.set_schedule(config.schedule());
            tracing::info!("Open time set to {}", time);
        }
        Command::SetCloseTime(time) => {
            config.set_close_time(time).await?;
            door.set_schedule(config.schedule());
            tracing::info!("Close time set to {}", time);
        }
        Command::Ignored => {}
    }
    Ok(())
}

fn show_manual_label(outbound: &mpsc::UnboundedSender<ControllerMessage>, text: &str) {
    let _ = outbound.send(ControllerMessage::LcdClear);
    let _ = outbound.send(ControllerMessage::LcdPrint {
        column: 2,
        row: 0,
        text: text.to_string(),
    });
}
