//! Polling decision loop.
//!
//! One cycle: fetch token descriptors, compute RSI for every token, queue
//! buys and sells whose thresholds are crossed, then run the queue. The
//! loop sleeps between cycles and never exits on a runtime error.

use chrono::Local;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::BotConfig;
use crate::errors::{AppError, Result};
use crate::executor::{Executor, ScheduleReport};
use crate::gateway::MarketDataGateway;
use crate::indicator::compute_rsi;
use crate::models::{ExecutionTask, TokenInfo, TokenWatch, TradeAction};
use crate::report::{cycle_timestamp, render_watch_table};
use crate::venue::TradingVenue;

/// RSI reading for one watched token. `rsi` is `None` when not actionable.
#[derive(Debug, Clone)]
pub struct TokenReading {
    pub watch: TokenWatch,
    pub info: TokenInfo,
    pub rsi: Option<f64>,
}

/// Queue trades for every crossed threshold, in token order.
///
/// Buy and sell are checked independently, so a token whose thresholds
/// overlap can queue both.
pub fn build_schedule(readings: &[TokenReading]) -> Vec<ExecutionTask> {
    let mut schedule = Vec::new();
    for reading in readings {
        let Some(rsi) = reading.rsi else { continue };
        if rsi <= reading.watch.buy_threshold {
            schedule.push(ExecutionTask {
                watch: reading.watch.clone(),
                action: TradeAction::Buy,
            });
        }
        if rsi >= reading.watch.sell_threshold {
            schedule.push(ExecutionTask {
                watch: reading.watch.clone(),
                action: TradeAction::Sell,
            });
        }
    }
    schedule
}

#[derive(Debug)]
pub struct CycleReport {
    pub readings: Vec<TokenReading>,
    pub schedule: ScheduleReport,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub trades: u64,
}

pub struct DecisionLoop<G, V> {
    config: BotConfig,
    gateway: Arc<G>,
    executor: Executor<G, V>,
}

impl<G: MarketDataGateway, V: TradingVenue> DecisionLoop<G, V> {
    pub fn new(config: BotConfig, gateway: Arc<G>, venue: Arc<V>) -> Self {
        let executor = Executor::new(
            gateway.clone(),
            venue,
            config.min_ether_reserve.clone(),
            config.dust_threshold.clone(),
        );
        Self {
            config,
            gateway,
            executor,
        }
    }

    async fn fetch_metadata(&self) -> Result<Vec<TokenInfo>> {
        try_join_all(
            self.config
                .tokens
                .iter()
                .map(|w| self.gateway.token_info(w.chain, w.token)),
        )
        .await
    }

    async fn compute_indicators(&self) -> Result<Vec<Option<f64>>> {
        let period = self.config.rsi_period;
        try_join_all(self.config.tokens.iter().map(|w| async move {
            let candles = self.gateway.candles(w.chain, w.token, period).await?;
            Ok::<_, AppError>(compute_rsi(&candles, period))
        }))
        .await
    }

    /// Run one full cycle. A failed batch fetch aborts the cycle before any trade.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let infos = self.fetch_metadata().await?;

        info!("[CYCLE] {}", cycle_timestamp(Local::now()));
        let entries: Vec<(&TokenWatch, &TokenInfo)> =
            self.config.tokens.iter().zip(infos.iter()).collect();
        info!("\n{}", render_watch_table(&entries));

        let rsis = self.compute_indicators().await?;
        let readings: Vec<TokenReading> = self
            .config
            .tokens
            .iter()
            .cloned()
            .zip(infos)
            .zip(rsis)
            .map(|((watch, info), rsi)| TokenReading { watch, info, rsi })
            .collect();

        for r in &readings {
            match r.rsi {
                Some(rsi) => info!(
                    rsi,
                    "[RSI] RSI for token {} ({}::{}) is {rsi}",
                    r.info.name,
                    r.watch.chain,
                    r.info.symbol
                ),
                None => warn!(
                    "[RSI] no actionable RSI for token {} ({}::{})",
                    r.info.name,
                    r.watch.chain,
                    r.info.symbol
                ),
            }
        }

        let tasks = build_schedule(&readings);
        for task in &tasks {
            let symbol = readings
                .iter()
                .find(|r| r.watch == task.watch)
                .map(|r| r.info.symbol.as_str())
                .unwrap_or("?");
            match task.action {
                TradeAction::Buy => info!(
                    threshold = task.watch.buy_threshold,
                    "[BUY] RSI is at or below the buy threshold, time to buy {symbol}"
                ),
                TradeAction::Sell => info!(
                    threshold = task.watch.sell_threshold,
                    "[SELL] RSI is at or above the sell threshold, time to sell {symbol}"
                ),
            }
        }

        let schedule = self
            .executor
            .run_schedule(tasks, self.config.execution_policy)
            .await;
        Ok(CycleReport { readings, schedule })
    }

    /// Run cycles separated by the configured delay; `None` runs forever.
    pub async fn run_cycles(&self, limit: Option<u64>) -> LoopStats {
        let mut stats = LoopStats::default();
        loop {
            match self.run_cycle().await {
                Ok(report) => stats.trades += report.schedule.executed() as u64,
                Err(e) => {
                    stats.failed_cycles += 1;
                    error!(error = %e, "[ERR] an error occurred");
                    info!("Retrying...");
                }
            }
            stats.cycles += 1;
            if limit.is_some_and(|n| stats.cycles >= n) {
                return stats;
            }
            tokio::time::sleep(self.config.delay).await;
        }
    }

    pub async fn run_forever(&self) {
        self.run_cycles(None).await;
    }
}
