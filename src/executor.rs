//! Trade execution: resolve fresh state, size, submit, wait.
//!
//! Tasks of one cycle run strictly one after another so that every trade
//! sizes itself against the balances left by the previous one.

use bigdecimal::BigDecimal;
use ethers::types::H256;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::errors::{AppError, Result};
use crate::gateway::MarketDataGateway;
use crate::models::{ExecutionTask, TradeAction, WalletState};
use crate::sizing::{Refusal, size_buy, size_sell};
use crate::venue::{Confirmation, OrderRequest, TradingVenue};

/// What to do with the rest of a cycle's queue after a task fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ExecutionPolicy {
    #[default]
    #[serde(rename = "abort")]
    AbortOnError,
    #[serde(rename = "continue")]
    ContinueOnError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Executed { tx: H256, amount: BigDecimal },
    Skipped(Refusal),
}

/// Await `tasks` one at a time, in order.
///
/// Returns the result of every task that ran and the number of tasks left
/// unstarted because an earlier one failed under [`ExecutionPolicy::AbortOnError`].
pub async fn run_sequential<T, F, Fut>(
    tasks: Vec<F>,
    policy: ExecutionPolicy,
) -> (Vec<Result<T>>, usize)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = tasks.len();
    let mut results = Vec::with_capacity(total);
    for task in tasks {
        let result = task().await;
        let failed = result.is_err();
        results.push(result);
        if failed && policy == ExecutionPolicy::AbortOnError {
            break;
        }
    }
    let not_attempted = total - results.len();
    (results, not_attempted)
}

#[derive(Debug)]
pub struct TaskResult {
    pub task: ExecutionTask,
    pub outcome: Result<TradeOutcome>,
}

/// Outcome of the execution phase of one cycle.
#[derive(Debug, Default)]
pub struct ScheduleReport {
    pub results: Vec<TaskResult>,
    pub not_attempted: usize,
}

impl ScheduleReport {
    pub fn executed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Ok(TradeOutcome::Executed { .. })))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Ok(TradeOutcome::Skipped(_))))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_err()).count()
    }
}

pub struct Executor<G, V> {
    gateway: Arc<G>,
    venue: Arc<V>,
    min_ether_reserve: BigDecimal,
    dust_threshold: BigDecimal,
}

impl<G: MarketDataGateway, V: TradingVenue> Executor<G, V> {
    pub fn new(
        gateway: Arc<G>,
        venue: Arc<V>,
        min_ether_reserve: BigDecimal,
        dust_threshold: BigDecimal,
    ) -> Self {
        Self {
            gateway,
            venue,
            min_ether_reserve,
            dust_threshold,
        }
    }

    /// Execute one task against freshly fetched order and balance data.
    pub async fn execute(&self, task: &ExecutionTask) -> Result<TradeOutcome> {
        let watch = &task.watch;
        let chain = watch.chain;
        let info = self.gateway.token_info(chain, watch.token).await?;

        let Some(order_ref) = info.counter_order(task.action) else {
            warn!(
                chain = %chain,
                symbol = %info.symbol,
                action = %task.action,
                "[SKIP] no counter-order"
            );
            return Ok(TradeOutcome::Skipped(Refusal::NoCounterOrder));
        };
        let order = self.gateway.order_quote(chain, order_ref).await?;

        let me = self.venue.wallet_address();
        let (ether_balance, token_balance) = futures::try_join!(
            self.gateway.ether_balance(chain, me),
            self.gateway.wallet_balance(chain, me, info.address),
        )?;
        let wallet = WalletState {
            ether_balance,
            token_balance,
        };

        let sized = match task.action {
            TradeAction::Buy => size_buy(&order, &wallet, &self.min_ether_reserve, info.decimals),
            TradeAction::Sell => size_sell(&order, &wallet, &self.dust_threshold, info.decimals),
        };
        let amount = match sized {
            Ok(amount) => amount,
            Err(refusal) => {
                warn!(
                    chain = %chain,
                    symbol = %info.symbol,
                    action = %task.action,
                    wallet = ?me,
                    "[SKIP] unable to {} {}::{}: {refusal}",
                    task.action,
                    chain,
                    info.symbol
                );
                return Ok(TradeOutcome::Skipped(refusal));
            }
        };

        let request = OrderRequest {
            chain,
            action: task.action,
            token: info.address,
            decimals: info.decimals,
            amount: amount.clone(),
            counter_order: order,
        };
        let tx = self.venue.submit_order(&request).await?;
        info!(
            chain = %chain,
            symbol = %info.symbol,
            %amount,
            ?tx,
            "[TX] attempting to {} {amount} tokens",
            task.action
        );

        match self.venue.await_confirmation(chain, tx).await? {
            Confirmation::Success => {
                info!(?tx, symbol = %info.symbol, "[TX] confirmed");
                Ok(TradeOutcome::Executed { tx, amount })
            }
            Confirmation::Reverted => Err(AppError::Reverted(tx)),
        }
    }

    /// Run a cycle's queue sequentially under `policy`.
    pub async fn run_schedule(
        &self,
        tasks: Vec<ExecutionTask>,
        policy: ExecutionPolicy,
    ) -> ScheduleReport {
        let jobs: Vec<_> = tasks
            .iter()
            .cloned()
            .map(|task| move || async move { self.execute(&task).await })
            .collect();
        let (outcomes, not_attempted) = run_sequential(jobs, policy).await;

        let results: Vec<TaskResult> = tasks
            .into_iter()
            .zip(outcomes)
            .map(|(task, outcome)| {
                if let Err(e) = &outcome {
                    error!(
                        chain = %task.watch.chain,
                        token = ?task.watch.token,
                        action = %task.action,
                        error = %e,
                        "[ERR] trade failed"
                    );
                }
                TaskResult { task, outcome }
            })
            .collect();

        if not_attempted > 0 {
            warn!(not_attempted, "[ERR] remaining trades for this cycle abandoned");
        }
        ScheduleReport {
            results,
            not_attempted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGateway, FakeVenue, dec, watch};
    use std::sync::Mutex;

    #[tokio::test]
    async fn sequential_runner_preserves_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let jobs: Vec<_> = (0..4)
            .map(|i| {
                let log = log.clone();
                move || async move {
                    tokio::task::yield_now().await;
                    log.lock().unwrap().push(i);
                    Ok::<_, AppError>(i)
                }
            })
            .collect();
        let (results, not_attempted) = run_sequential(jobs, ExecutionPolicy::AbortOnError).await;
        assert_eq!(not_attempted, 0);
        assert_eq!(results.len(), 4);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn sequential_runner_abort_and_continue_policies() {
        fn jobs() -> Vec<impl FnOnce() -> std::future::Ready<Result<u32>>> {
            (0..3u32)
                .map(|i| {
                    move || {
                        std::future::ready(if i == 1 {
                            Err(AppError::Execution("rejected".into()))
                        } else {
                            Ok(i)
                        })
                    }
                })
                .collect()
        }

        let (results, not_attempted) = run_sequential(jobs(), ExecutionPolicy::AbortOnError).await;
        assert_eq!(results.len(), 2);
        assert_eq!(not_attempted, 1);

        let (results, not_attempted) =
            run_sequential(jobs(), ExecutionPolicy::ContinueOnError).await;
        assert_eq!(results.len(), 3);
        assert_eq!(not_attempted, 0);
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn buy_spends_down_to_reserve_only() {
        let gw = Arc::new(FakeGateway::new());
        let token = gw.add_token("AAA", 18, "0.5", "100");
        gw.ledger().set_ether(dec("3"));
        let venue = Arc::new(FakeVenue::new(gw.clone()));
        let exec = Executor::new(gw.clone(), venue.clone(), dec("1"), dec("0.00005"));

        let task = ExecutionTask {
            watch: watch(token, 30.0, 70.0),
            action: TradeAction::Buy,
        };
        let outcome = exec.execute(&task).await.unwrap();
        assert!(matches!(
            outcome,
            TradeOutcome::Executed { ref amount, .. } if *amount == dec("4")
        ));
        assert_eq!(gw.ledger().ether(), dec("1"));

        // Wallet now sits on the reserve: the same buy is refused.
        let outcome = exec.execute(&task).await.unwrap();
        assert!(matches!(outcome, TradeOutcome::Skipped(Refusal::ReserveFloor { .. })));
        assert_eq!(venue.submissions(), 1);
    }

    #[tokio::test]
    async fn two_sells_do_not_double_spend_holdings() {
        let gw = Arc::new(FakeGateway::new());
        // Buy order wants 5 tokens; wallet holds exactly 5.
        let token = gw.add_token("BBB", 18, "0.1", "5");
        gw.ledger().set_tokens(token, dec("5"));
        let venue = Arc::new(FakeVenue::new(gw.clone()));
        let exec = Executor::new(gw.clone(), venue.clone(), dec("0"), dec("0.00005"));

        let sell = ExecutionTask {
            watch: watch(token, 30.0, 70.0),
            action: TradeAction::Sell,
        };
        let report = exec
            .run_schedule(vec![sell.clone(), sell], ExecutionPolicy::AbortOnError)
            .await;

        assert_eq!(report.executed(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            report.results[1].outcome,
            Ok(TradeOutcome::Skipped(Refusal::NoHoldings { .. }))
        ));
        assert_eq!(venue.submissions(), 1);
        assert_eq!(gw.ledger().tokens(token), dec("0"));
    }

    #[tokio::test]
    async fn submission_failure_aborts_rest_of_queue() {
        let gw = Arc::new(FakeGateway::new());
        let a = gw.add_token("AAA", 18, "0.5", "100");
        let b = gw.add_token("BBB", 18, "0.5", "100");
        gw.ledger().set_ether(dec("10"));
        let venue = Arc::new(FakeVenue::new(gw.clone()));
        venue.fail_submissions_for(a);
        let exec = Executor::new(gw.clone(), venue.clone(), dec("1"), dec("0.00005"));

        let tasks = vec![
            ExecutionTask {
                watch: watch(a, 30.0, 70.0),
                action: TradeAction::Buy,
            },
            ExecutionTask {
                watch: watch(b, 30.0, 70.0),
                action: TradeAction::Buy,
            },
        ];
        let report = exec
            .run_schedule(tasks.clone(), ExecutionPolicy::AbortOnError)
            .await;
        assert_eq!(report.failed(), 1);
        assert_eq!(report.not_attempted, 1);
        assert_eq!(venue.submissions(), 0);

        let report = exec
            .run_schedule(tasks, ExecutionPolicy::ContinueOnError)
            .await;
        assert_eq!(report.failed(), 1);
        assert_eq!(report.executed(), 1);
        assert_eq!(venue.submissions(), 1);
    }

    #[tokio::test]
    async fn reverted_trade_is_an_execution_error() {
        let gw = Arc::new(FakeGateway::new());
        let token = gw.add_token("AAA", 18, "0.5", "100");
        gw.ledger().set_ether(dec("10"));
        let venue = Arc::new(FakeVenue::new(gw.clone()));
        venue.revert_all();
        let exec = Executor::new(gw.clone(), venue.clone(), dec("1"), dec("0.00005"));

        let task = ExecutionTask {
            watch: watch(token, 30.0, 70.0),
            action: TradeAction::Buy,
        };
        let err = exec.execute(&task).await.unwrap_err();
        assert!(matches!(err, AppError::Reverted(_)));
        assert_eq!(gw.ledger().ether(), dec("10"));
    }

    #[tokio::test]
    async fn missing_counter_order_is_a_skip() {
        let gw = Arc::new(FakeGateway::new());
        let token = gw.add_token("AAA", 18, "0.5", "100");
        gw.clear_orders(token);
        gw.ledger().set_ether(dec("10"));
        let venue = Arc::new(FakeVenue::new(gw.clone()));
        let exec = Executor::new(gw.clone(), venue.clone(), dec("1"), dec("0.00005"));

        let task = ExecutionTask {
            watch: watch(token, 30.0, 70.0),
            action: TradeAction::Buy,
        };
        assert_eq!(
            exec.execute(&task).await.unwrap(),
            TradeOutcome::Skipped(Refusal::NoCounterOrder)
        );
    }
}
