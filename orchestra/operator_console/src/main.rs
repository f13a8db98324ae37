mod dashboard;
mod keyboard;
mod virtual_gamepad;

use clap::Parser;
use dashboard::{render_diagnostics, render_line};
use keyboard::{ConsoleInput, KeyboardDispatcher, HELP};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tank_teleop_lib::{
    init_tracing, ConsoleConfig, GamepadSource, HttpRobotEndpoint, LoopbackRobot, NetworkSync,
    OperatorEvent, RobotEndpoint, TeleopLoop,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use virtual_gamepad::VirtualGamepad;

const DEFAULT_CONFIG_PATH: &str = "config/console.toml";
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "operator_console")]
#[command(about = "Operator console for the tracked robot and its manipulator")]
struct Cli {
    /// Console configuration file
    #[arg(short, long, env = "CONSOLE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Base URL of the robot's web API
    #[arg(long, env = "ROBOT_URL")]
    robot_url: Option<String>,

    /// Start in Live mode instead of Simulating
    #[arg(long)]
    live: bool,

    /// Talk to the in-process loopback robot instead of HTTP
    #[arg(long)]
    loopback: bool,
}

// The tracing guard is thread-local, so everything runs on one thread
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let _guard = init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    config.validate()?;

    info!("Starting operator console");
    info!(
        "Control tick {:.0} Hz, status every {} ms, joints every {} ms",
        config.control.tick_hz, config.network.status_period_ms, config.network.joint_period_ms
    );

    let endpoint: Arc<dyn RobotEndpoint> = if config.network.loopback {
        info!("Using in-process loopback robot");
        Arc::new(LoopbackRobot::new())
    } else {
        info!("Robot endpoint: {}", config.network.robot_url);
        Arc::new(HttpRobotEndpoint::new(config.network.robot_url.clone()))
    };

    let teleop = TeleopLoop::new(&config);
    let mut sync = NetworkSync::new(endpoint);
    sync.spawn_pollers(
        teleop.router().subscribe(),
        config.network.status_period(),
        config.network.joint_period(),
    );
    let mut teleop = teleop.with_sync(sync);
    let mut state = TeleopLoop::initial_state(&config);

    info!("Mode: {:?}", teleop.router().mode());
    println!("{}", HELP);

    let mut lines = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut dispatcher = KeyboardDispatcher::new();
    let mut gamepad = VirtualGamepad::new();
    let mut pending: Vec<OperatorEvent> = Vec::new();

    let mut ticker = tokio::time::interval(config.control.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut dashboard =
        tokio::time::interval(Duration::from_millis(config.control.dashboard_period_ms));
    dashboard.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;

                let snapshot = gamepad.poll();
                teleop.tick(&mut state, pending.drain(..), snapshot.as_ref(), dt);
            }

            _ = dashboard.tick() => {
                info!("{}", render_line(&state, teleop.router().mode(), teleop.manipulator()));
                if let Some(diagnostics) = teleop.sync().and_then(|s| s.diagnostics()) {
                    info!("{}", render_diagnostics(diagnostics));
                }
            }

            line = lines.recv(), if stdin_open => {
                let Some(line) = line else {
                    info!("stdin closed, keyboard input disabled");
                    stdin_open = false;
                    continue;
                };

                match dispatcher.process_input(&line) {
                    Some(ConsoleInput::Operator(event)) => pending.push(event),
                    Some(ConsoleInput::Pad(command)) => {
                        let was_connected = gamepad.is_connected();
                        gamepad.apply(command);
                        if gamepad.is_connected() != was_connected {
                            info!(
                                "Virtual gamepad {}",
                                if was_connected { "unplugged" } else { "plugged in" }
                            );
                        }
                    }
                    Some(ConsoleInput::Help) => println!("{}", HELP),
                    Some(ConsoleInput::Quit) => break,
                    None => {}
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    if let Some(sync) = teleop.sync_mut() {
        if tokio::time::timeout(SHUTDOWN_FLUSH_TIMEOUT, sync.flush())
            .await
            .is_err()
        {
            warn!("Robot did not take the last commands before shutdown");
        }
    }

    info!(
        "Operator console stopped ({} unrecognized inputs)",
        dispatcher.unknown_count()
    );
    Ok(())
}

fn load_config(cli: &Cli) -> eyre::Result<ConsoleConfig> {
    let mut config = if Path::new(&cli.config).exists() {
        info!("Loading configuration from {}", cli.config);
        ConsoleConfig::load_from_file(&cli.config)?
    } else if cli.config == DEFAULT_CONFIG_PATH {
        warn!("{} not found, using built-in defaults", cli.config);
        ConsoleConfig::default()
    } else {
        eyre::bail!("Configuration file {} does not exist", cli.config);
    };

    if let Some(url) = &cli.robot_url {
        config.network.robot_url = url.clone();
    }
    if cli.live {
        config.control.start_in_simulation = false;
    }
    if cli.loopback {
        config.network.loopback = true;
    }

    Ok(config)
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    rx
}
