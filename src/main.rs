//! PICKWIRE — prediction-feed trade executor
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the signed exchange client from env credentials, and runs
//! the watch loop (or a single cycle with --once) with graceful
//! shutdown.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use pickwire::config::AppConfig;
use pickwire::engine::TradeMode;
use pickwire::exchange::{ExchangeClient, RequestSigner};
use pickwire::ledger::{FileLedger, Ledger};
use pickwire::runner::Runner;

const BANNER: &str = r#"
 ____  ___ ____ _  ____        _____ ____  _____
|  _ \|_ _/ ___| |/ /\ \      / /_ _|  _ \| ____|
| |_) || | |   | ' /  \ \ /\ / / | || |_) |  _|
|  __/ | | |___| . \   \ V  V /  | ||  _ <| |___
|_|   |___\____|_|\_\   \_/\_/  |___|_| \_\_____|

  prediction feed -> exchange orders
"#;

#[derive(Parser, Debug)]
#[command(name = "pickwire", about = "Executes feed picks on a prediction exchange")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Run one cycle and exit instead of watching.
    #[arg(long)]
    once: bool,

    /// Simulate everything regardless of config and credentials.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;

    init_logging();

    println!("{BANNER}");

    let key_id = cfg.exchange.api_key_id();
    let private_key = cfg.exchange.private_key();
    let signer = RequestSigner::configure(key_id.as_deref(), private_key.as_ref());
    let configured = signer.is_some();
    let client = ExchangeClient::new(&cfg.exchange.base_url, signer)?;

    // Live requires all three: config opt-in, working credentials, and
    // no --dry-run override.
    let mode = if cfg.trading.live && configured && !cli.dry_run {
        TradeMode::Live
    } else {
        TradeMode::DryRun
    };
    info!(
        mode = ?mode,
        configured,
        stake_cents = cfg.trading.stake_cents,
        min_confidence = cfg.trading.min_confidence,
        "pickwire starting up"
    );
    if mode == TradeMode::DryRun && cfg.trading.live {
        warn!("live trading requested but running dry: check credentials / --dry-run");
    }

    let runner = Runner::new(&cfg, mode);
    let mut ledger = FileLedger::load(&cfg.state.ledger_file);
    info!(executed = ledger.len(), "ledger restored");

    if cli.once {
        let summary = runner.cycle(&client, &mut ledger).await?;
        info!(%summary, "single cycle finished");
        return Ok(());
    }

    // -- Watch loop ------------------------------------------------------

    let mut interval =
        tokio::time::interval(Duration::from_secs(cfg.runtime.watch_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.runtime.watch_interval_secs,
        "entering watch loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match runner.cycle(&client, &mut ledger).await {
                    Ok(summary) => info!(%summary, "cycle finished"),
                    Err(e) => error!(error = %e, "cycle failed — waiting for next tick"),
                }
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    if mode == TradeMode::Live {
        if let Err(e) = ledger.flush() {
            warn!(error = %e, "final ledger flush failed");
        }
    }
    info!("pickwire shut down cleanly");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pickwire=info"));

    let json_logging = std::env::var("PICKWIRE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
