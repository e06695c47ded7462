//! Bridge and swap runner
//!
//! One run, start to finish:
//! 1. Load configuration (fails before any network call if `PRIVATE_KEY` or `RPC_URL` is unset)
//! 2. Check the WETH balance on Arbitrum
//! 3. Quote the Base swap and the Across bridge
//! 4. Approve, deposit and wait for the fill, reporting each step

use std::sync::Arc;

use bridge_swap::bridge::{AcrossClient, PROGRESS_CHANNEL_CAPACITY};
use bridge_swap::evm::{Erc20Reader, EvmWallet};
use bridge_swap::reporter::Reporter;
use bridge_swap::swap::BebopClient;
use bridge_swap::{BridgeSwapFlow, Config};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    if let Err(e) = run().await {
        error!(error = %e, "Bridge and swap failed");
        return Err(e);
    }

    Ok(())
}

async fn run() -> eyre::Result<()> {
    let config = Config::load()?;

    info!(
        origin = %config.origin.name,
        destination = %config.destination.name,
        amount = %config.input_amount_display(),
        handler = %config.multicall_handler,
        "Starting bridge and swap"
    );

    let wallet = EvmWallet::from_config(&config)?;
    let balances = Arc::new(Erc20Reader::new(&config.origin_rpc_url)?);
    let quoter = Arc::new(BebopClient::new(&config.bebop_api_url)?);
    let bridge = Arc::new(AcrossClient::from_config(&config)?);

    let flow = BridgeSwapFlow::new(&config, balances, quoter, bridge);

    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let reporter = tokio::spawn(Reporter::new(config.origin, config.destination).run(progress_rx));

    let result = flow.run(&wallet, progress_tx).await;

    // The sender was moved into the flow, so this drains and ends
    if let Err(e) = reporter.await {
        warn!(error = %e, "Progress reporter task failed");
    }

    let outcome = result?;
    info!(
        output_amount = %outcome.quote.deposit.output_amount,
        "Bridge and swap finished"
    );

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_swap=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}
