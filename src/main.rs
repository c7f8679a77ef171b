use clap::{Args, Parser, Subcommand};
use gps_port_bridge::config::{Config, ConfigLoader};
use gps_port_bridge::discovery::{DiscoveryOptions, GpsReader, PreambleMatcher};
use gps_port_bridge::port::{PortInfo, SerialBackend, SystemBackend};
use gps_port_bridge::{logging, AppError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Find a GPS receiver on any serial port and stream its NMEA output.",
    long_about = "Probes every serial port at the common NMEA baud rates, binds to the first one that \
                  talks NMEA, and copies its raw bytes to stdout. Logs go to stderr."
)]
struct Cli {
    /// Configuration file (default: GPS_BRIDGE_CONFIG, ./gps-bridge.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level or tracing filter directive, overriding the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Locate the GPS and stream its output to stdout (default)
    Detect(DetectArgs),
    /// List the serial ports that would be probed
    Ports {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
struct DetectArgs {
    /// Accept any NMEA talker ($GN, $GL, ...) instead of only $GP
    #[arg(long)]
    any_talker: bool,

    /// Never probe this port (repeatable)
    #[arg(long = "exclude", value_name = "PORT")]
    exclude: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loader = match load_config(cli.config.as_ref()) {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("gps-bridge: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&loader.config.logging, cli.log_level.as_deref());
    match &loader.config_path {
        Some(path) => debug!("Loaded configuration from {}", path.display()),
        None => debug!("No configuration file, using defaults"),
    }
    let config = loader.into_config();

    let command = cli
        .command
        .unwrap_or_else(|| Command::Detect(DetectArgs::default()));

    let result = match command {
        Command::Detect(args) => detect(&config, args).await,
        Command::Ports { json } => list_ports(&config, json).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ConfigLoader, AppError> {
    let loader = match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader)
}

fn discovery_options(config: &Config, args: DetectArgs) -> DiscoveryOptions {
    let mut options = DiscoveryOptions::from(&config.discovery);
    if args.any_talker {
        options = options.with_preamble(PreambleMatcher::AnyTalker);
    }
    for port in args.exclude {
        options = options.exclude(port);
    }
    options
}

// --- Detect: probe, then pump the winning port to stdout ---
async fn detect(config: &Config, args: DetectArgs) -> Result<(), AppError> {
    let options = discovery_options(config, args);
    info!(
        "Searching for a GPS (preamble: {}, excluded: {:?})",
        options.preamble.as_str(),
        options.exclude_ports
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let reader = GpsReader::discover_with(Arc::new(SystemBackend), Arc::new(tx), options)?;

    let pumped = {
        let mut stdout = tokio::io::stdout();
        let shutdown = shutdown_signal();
        let settled = reader.wait_until_settled();
        tokio::pin!(shutdown, settled);
        let mut settled_done = false;

        loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                bound = &mut settled, if !settled_done => {
                    settled_done = true;
                    match bound {
                        Some(port) => info!(
                            "Streaming NMEA from {} at {} baud",
                            port.port_name, port.baud_rate
                        ),
                        None => {
                            warn!("No GPS found on any serial port");
                            break Ok(());
                        }
                    }
                }
                chunk = rx.recv() => match chunk {
                    Some(chunk) => {
                        if let Err(e) = write_chunk(&mut stdout, &chunk).await {
                            break Err(AppError::from(e));
                        }
                    }
                    // Every probe has finished, the bridge included.
                    None => break Ok(()),
                },
            }
        }
    };

    for report in reader.shutdown().await {
        debug!(
            "{}: {:?} after trying {:?}",
            report.port_name, report.outcome, report.attempted
        );
    }
    pumped
}

async fn write_chunk(stdout: &mut tokio::io::Stdout, chunk: &[u8]) -> std::io::Result<()> {
    stdout.write_all(chunk).await?;
    stdout.flush().await
}

// --- Ports: what discovery would look at ---
async fn list_ports(config: &Config, json: bool) -> Result<(), AppError> {
    let options = DiscoveryOptions::from(&config.discovery);
    let ports: Vec<PortInfo> = SystemBackend
        .available_ports()?
        .into_iter()
        .filter(|p| !options.is_excluded(&p.port_name))
        .collect();

    let mut out = String::new();
    if json {
        out.push_str(&serde_json::to_string_pretty(&ports)?);
        out.push('\n');
    } else if ports.is_empty() {
        out.push_str("No serial ports found\n");
    } else {
        for port in &ports {
            out.push_str(&format!("{}\t{}\n", port.port_name, port.kind));
        }
    }

    let mut stdout = tokio::io::stdout();
    write_chunk(&mut stdout, out.as_bytes()).await?;
    Ok(())
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, closing the GPS port");
}
