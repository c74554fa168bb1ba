use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{Error, Result};
use log::info;
use tokio::sync::watch;

use galaswap_arb::bot::Bot;
use galaswap_arb::config::Config;
use galaswap_arb::dex::{DexClient, SnapshotDexClient};
use galaswap_arb::notify::{LogReporter, Reporter, Reporters, SlackNotifier};
use galaswap_arb::sync::PoolCache;
use galaswap_arb::utils::logger::setup_logger;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pool snapshot served by the paper-trading DEX client. Trades, even with
    /// dry run off, settle against this local copy and never reach the chain.
    #[arg(long, default_value = "pools.json")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every interval until Ctrl-C (default)
    Run,
    /// Run a single scan and print its summary
    Once,
    /// Refresh the pool cache and list the active pools
    Pools,
}

fn reporter() -> Arc<dyn Reporter> {
    let reporters = Reporters::new().with(Arc::new(LogReporter));
    match SlackNotifier::new() {
        Ok(slack) => Arc::new(reporters.with(Arc::new(slack))),
        Err(e) => {
            info!("Slack notifications disabled: {e}");
            Arc::new(reporters)
        }
    }
}

async fn run(bot: Bot) -> Result<(), Error> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {e}");
            return;
        }
        info!("Received shutdown signal, finishing the current scan...");
        shutdown_tx.send(true).ok();
    });
    bot.run(shutdown_rx).await
}

async fn once(bot: Bot) -> Result<(), Error> {
    let summary = bot.scan_once().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn pools(config: &Config, client: Arc<dyn DexClient>) -> Result<(), Error> {
    let cache = PoolCache::new(client, config.pools.iter().cloned(), config.pool_cache_settings());
    cache.refresh(true).await?;
    let active = cache.get_active_pools().await;
    println!("{} of {} pools active", active.len(), cache.pairs().len());
    for pool in active {
        println!("{pool}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    setup_logger()?;

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client: Arc<dyn DexClient> = Arc::new(SnapshotDexClient::from_path(&cli.snapshot)?);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(Bot::new(&config, client, reporter())).await?,
        Commands::Once => once(Bot::new(&config, client, reporter())).await?,
        Commands::Pools => pools(&config, client).await?,
    }

    Ok(())
}
