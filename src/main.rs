//! DXCC Watcher CLI - Alert on new DXCC entities decoded by WSJT-X.

use anyhow::{Context, Result, bail};
use clap::Parser;
use dxcc_watcher::{
    band,
    config::Config,
    cty::CountryResolver,
    engine::{AlertEngine, EngineEvent},
    listener::{Listener, WatchEvent},
    metrics::start_metrics_server,
    stats::WatchStats,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// DXCC Watcher - Alert on new DXCC entities decoded by WSJT-X
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to receive WSJT-X UDP messages on
    #[arg(long, env = "DXCC_HOST")]
    host: Option<String>,

    /// UDP port to receive WSJT-X messages on
    #[arg(short, long, env = "DXCC_PORT")]
    port: Option<u16>,

    /// Path to the cty.dat prefix table
    #[arg(long)]
    cty_file: Option<PathBuf>,

    /// Confirmed country list for bands without their own list
    #[arg(long)]
    confirmed_default: Option<PathBuf>,

    /// Print statistics every N seconds (0 disables)
    #[arg(short, long)]
    stats_interval: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Serve Prometheus metrics
    #[arg(long)]
    metrics: bool,

    /// Port for the Prometheus metrics endpoint
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Maximum runtime in seconds (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_runtime: u64,
}

impl Args {
    /// Apply command-line overrides on top of the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ref path) = self.cty_file {
            config.cty_file = path.clone();
        }
        if let Some(ref path) = self.confirmed_default {
            config.confirmed_default = path.clone();
        }
        if let Some(interval) = self.stats_interval {
            config.stats_interval = interval;
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        config.json |= self.json;
        config.metrics_enabled |= self.metrics;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = match args.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    args.apply(&mut config);
    config.validate()?;

    info!("DXCC Watcher starting...");

    let resolver = CountryResolver::from_file(&config.cty_file)
        .with_context(|| format!("Failed to load prefix table {}", config.cty_file.display()))?;
    info!(
        "Loaded {} prefixes from {}",
        resolver.len(),
        config.cty_file.display()
    );

    let engine = AlertEngine::new(Arc::new(resolver), config.confirmed_source()?);

    // Create shared statistics
    let stats = Arc::new(WatchStats::new());

    if config.metrics_enabled {
        let stats_clone = Arc::clone(&stats);
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(port, stats_clone).await {
                error!("Metrics server failed: {}", e);
            }
        });
    }

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx_clone.send(true);
    });

    // Optional max runtime
    if args.max_runtime > 0 {
        let shutdown_tx_clone = shutdown_tx.clone();
        let max_runtime = args.max_runtime;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(max_runtime)).await;
            info!("Max runtime reached");
            let _ = shutdown_tx_clone.send(true);
        });
    }

    // Start stats printer
    if config.stats_interval > 0 {
        let stats_clone = Arc::clone(&stats);
        let stats_interval = config.stats_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(stats_interval));
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                println!("\n{}", stats_clone.summary());
            }
        });
    }

    let listener = Listener::new(config.listener_config());
    let mut events = listener.start(engine, Arc::clone(&stats), shutdown_rx).await?;

    // Main event loop
    let mut failure = None;
    while let Some(event) = events.recv().await {
        match event {
            WatchEvent::Listening(addr) => {
                info!("Listening for WSJT-X on {}", addr);
            }
            WatchEvent::Engine(event) => {
                if let Some(line) = format_event(&event, config.json) {
                    println!("{}", line);
                }
            }
            WatchEvent::Error(e) => {
                error!("Listener error: {}", e);
                failure = Some(e);
            }
            WatchEvent::Stopped => {
                break;
            }
        }
    }

    // Print final statistics
    println!("\n\nFINAL STATISTICS");
    println!("{}", stats.summary());

    if let Some(e) = failure {
        bail!("UDP listener failed: {}", e);
    }
    Ok(())
}

/// Render an engine event for stdout.
///
/// JSON mode prints every event; text mode prints band changes and alerts.
fn format_event(event: &EngineEvent, json: bool) -> Option<String> {
    if json {
        return match serde_json::to_string(event) {
            Ok(line) => Some(line),
            Err(e) => {
                warn!("Failed to serialize event: {}", e);
                None
            }
        };
    }

    match event {
        EngineEvent::BandChanged {
            band,
            frequency_hz,
            mode,
            confirmed_count,
        } => Some(format!(
            "Band: {}  Freq: {:.3} MHz  Mode: {}  ({} confirmed)",
            band::label(*band),
            frequency_hz.unwrap_or(0) as f64 / 1e6,
            mode.as_deref().unwrap_or("-"),
            confirmed_count
        )),
        EngineEvent::FrequencyUpdated { .. } => None,
        EngineEvent::NewDxcc(alert) => Some(alert.to_string()),
    }
}
