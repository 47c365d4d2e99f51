use anyhow::Result;
use clap::Parser;
use rsi_trading_bot::{
    config::{AppConfig, BotConfig, CliArgs},
    decision::DecisionLoop,
    errors,
    gateway::SaturnGateway,
    utils,
    venue::{EvmVenue, TradingVenue, evm::load_wallet},
};
use std::sync::Arc;

/// Everything that must succeed before the polling loop starts.
fn startup(args: CliArgs) -> errors::Result<(BotConfig, EvmVenue, SaturnGateway)> {
    let config = AppConfig::load(args)?;
    let wallet = load_wallet(&config.credential)?;
    let venue = EvmVenue::new(wallet, config.bot.chains())?;
    let gateway = SaturnGateway::new(&config.bot.api_url)?;
    Ok((config.bot, venue, gateway))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let (bot, venue, gateway) = match startup(CliArgs::parse()) {
        Ok(parts) => parts,
        Err(e) if e.is_startup() => {
            tracing::error!(error = %e, "[INIT] invalid configuration");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    let venue = Arc::new(venue);
    let gateway = Arc::new(gateway);

    tracing::info!(
        address = %utils::hex_address(&venue.wallet_address()),
        tokens = bot.tokens.len(),
        delay_secs = bot.delay.as_secs(),
        policy = ?bot.execution_policy,
        "[INIT] rsi-trading-bot starting"
    );
    for w in &bot.tokens {
        tracing::info!(
            chain = %w.chain,
            token = %utils::hex_address(&w.token),
            buy_below = w.buy_threshold,
            sell_above = w.sell_threshold,
            "[INIT] strategy"
        );
        if w.buy_threshold >= w.sell_threshold {
            tracing::warn!(
                token = %utils::hex_address(&w.token),
                "[INIT] buy threshold is not below sell threshold, both may fire in one cycle"
            );
        }
    }

    DecisionLoop::new(bot, gateway, venue).run_forever().await;
    Ok(())
}
