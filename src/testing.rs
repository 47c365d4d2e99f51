//! In-memory gateway and venue sharing one wallet ledger.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use ethers::types::{Address, H256};
use num_traits::Zero;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::errors::{AppError, Result};
use crate::gateway::MarketDataGateway;
use crate::models::{Candle, Chain, OrderQuote, OrderRef, TokenInfo, TokenWatch, TradeAction};
use crate::venue::{Confirmation, OrderRequest, TradingVenue};

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn watch(token: Address, buy: f64, sell: f64) -> TokenWatch {
    TokenWatch {
        chain: Chain::Etc,
        token,
        buy_threshold: buy,
        sell_threshold: sell,
    }
}

/// Candles whose mean close/open ratio gives exactly `rsi`.
pub fn candles_for_rsi(rsi: f64) -> Vec<Candle> {
    // RSI = 100 - 100/(1+RS)  =>  RS = RSI / (100 - RSI)
    let rs = rsi / (100.0 - rsi);
    let close = BigDecimal::from_str(&format!("{rs:.12}")).unwrap();
    vec![
        Candle {
            open: BigDecimal::from(1),
            close,
        };
        14
    ]
}

#[derive(Default)]
struct LedgerState {
    ether: BigDecimal,
    tokens: HashMap<Address, BigDecimal>,
}

/// Balances of the single test wallet.
#[derive(Default)]
pub struct Ledger {
    state: Mutex<LedgerState>,
}

impl Ledger {
    pub fn set_ether(&self, amount: BigDecimal) {
        self.state.lock().unwrap().ether = amount;
    }

    pub fn ether(&self) -> BigDecimal {
        self.state.lock().unwrap().ether.clone()
    }

    pub fn set_tokens(&self, token: Address, amount: BigDecimal) {
        self.state.lock().unwrap().tokens.insert(token, amount);
    }

    pub fn tokens(&self, token: Address) -> BigDecimal {
        self.state
            .lock()
            .unwrap()
            .tokens
            .get(&token)
            .cloned()
            .unwrap_or_else(BigDecimal::zero)
    }

    fn apply(&self, request: &OrderRequest) {
        let mut state = self.state.lock().unwrap();
        let ether_delta = &request.amount * &request.counter_order.price;
        let held = state
            .tokens
            .get(&request.token)
            .cloned()
            .unwrap_or_else(BigDecimal::zero);
        match request.action {
            TradeAction::Buy => {
                state.ether = &state.ether - ether_delta;
                state.tokens.insert(request.token, held + &request.amount);
            }
            TradeAction::Sell => {
                state.ether = &state.ether + ether_delta;
                state.tokens.insert(request.token, held - &request.amount);
            }
        }
    }
}

struct FakeToken {
    info: TokenInfo,
    price: BigDecimal,
    order_balance: BigDecimal,
}

#[derive(Default)]
struct GatewayState {
    tokens: HashMap<Address, FakeToken>,
    candles: HashMap<Address, Vec<Candle>>,
    info_failures: HashMap<Address, usize>,
    candle_failures: HashMap<Address, usize>,
}

#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
    ledger: Ledger,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Register a token with resting orders on both sides at `price`, each
    /// offering `order_balance` tokens.
    pub fn add_token(
        &self,
        symbol: &str,
        decimals: u32,
        price: &str,
        order_balance: &str,
    ) -> Address {
        let mut state = self.state.lock().unwrap();
        let address = Address::from_low_u64_be(state.tokens.len() as u64 + 1);
        let info = TokenInfo {
            name: format!("{symbol} token"),
            symbol: symbol.to_string(),
            decimals,
            address,
            best_buy_order: Some(OrderRef(format!("buy-{symbol}"))),
            best_sell_order: Some(OrderRef(format!("sell-{symbol}"))),
        };
        state.tokens.insert(
            address,
            FakeToken {
                info,
                price: dec(price),
                order_balance: dec(order_balance),
            },
        );
        address
    }

    pub fn clear_orders(&self, token: Address) {
        if let Some(t) = self.state.lock().unwrap().tokens.get_mut(&token) {
            t.info.best_buy_order = None;
            t.info.best_sell_order = None;
        }
    }

    pub fn set_candles(&self, token: Address, candles: Vec<Candle>) {
        self.state.lock().unwrap().candles.insert(token, candles);
    }

    /// Make the next `times` token-info fetches for `token` fail.
    pub fn fail_token_info(&self, token: Address, times: usize) {
        self.state.lock().unwrap().info_failures.insert(token, times);
    }

    /// Make the next `times` candle fetches for `token` fail.
    pub fn fail_candles(&self, token: Address, times: usize) {
        self.state.lock().unwrap().candle_failures.insert(token, times);
    }
}

#[async_trait]
impl MarketDataGateway for FakeGateway {
    async fn token_info(&self, _chain: Chain, token: Address) -> Result<TokenInfo> {
        let mut state = self.state.lock().unwrap();
        if let Some(left) = state.info_failures.get_mut(&token) {
            if *left > 0 {
                *left -= 1;
                return Err(AppError::Gateway(format!("token {token:?} unavailable")));
            }
        }
        state
            .tokens
            .get(&token)
            .map(|t| t.info.clone())
            .ok_or_else(|| AppError::Status {
                status: 404,
                url: format!("{token:?}"),
            })
    }

    async fn candles(&self, _chain: Chain, token: Address, window: usize) -> Result<Vec<Candle>> {
        let mut state = self.state.lock().unwrap();
        if let Some(left) = state.candle_failures.get_mut(&token) {
            if *left > 0 {
                *left -= 1;
                return Err(AppError::Gateway(format!("candles for {token:?} unavailable")));
            }
        }
        let candles = state
            .candles
            .get(&token)
            .cloned()
            .unwrap_or_else(|| candles_for_rsi(50.0));
        let skip = candles.len().saturating_sub(window);
        Ok(candles.into_iter().skip(skip).collect())
    }

    async fn order_quote(&self, _chain: Chain, order: &OrderRef) -> Result<OrderQuote> {
        let state = self.state.lock().unwrap();
        state
            .tokens
            .values()
            .find(|t| {
                t.info.best_buy_order.as_ref() == Some(order)
                    || t.info.best_sell_order.as_ref() == Some(order)
            })
            .map(|t| OrderQuote::new(order.clone(), t.price.clone(), t.order_balance.clone()))
            .ok_or_else(|| AppError::Gateway(format!("unknown order {order}")))
    }

    async fn wallet_balance(
        &self,
        _chain: Chain,
        _wallet: Address,
        token: Address,
    ) -> Result<BigDecimal> {
        if token.is_zero() {
            Ok(self.ledger.ether())
        } else {
            Ok(self.ledger.tokens(token))
        }
    }
}

#[derive(Default)]
struct VenueState {
    next_tx: u64,
    pending: HashMap<H256, OrderRequest>,
    submissions: usize,
    failing_tokens: HashSet<Address>,
    revert: bool,
}

/// Venue that settles confirmed trades into the gateway's ledger.
pub struct FakeVenue {
    gateway: Arc<FakeGateway>,
    state: Mutex<VenueState>,
}

impl FakeVenue {
    pub fn new(gateway: Arc<FakeGateway>) -> Self {
        Self {
            gateway,
            state: Mutex::new(VenueState::default()),
        }
    }

    pub fn fail_submissions_for(&self, token: Address) {
        self.state.lock().unwrap().failing_tokens.insert(token);
    }

    pub fn revert_all(&self) {
        self.state.lock().unwrap().revert = true;
    }

    /// Number of accepted submissions.
    pub fn submissions(&self) -> usize {
        self.state.lock().unwrap().submissions
    }
}

#[async_trait]
impl TradingVenue for FakeVenue {
    fn wallet_address(&self) -> Address {
        Address::repeat_byte(0xaa)
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<H256> {
        let mut state = self.state.lock().unwrap();
        if state.failing_tokens.contains(&request.token) {
            return Err(AppError::Execution("transaction rejected".into()));
        }
        state.next_tx += 1;
        state.submissions += 1;
        let tx = H256::from_low_u64_be(state.next_tx);
        state.pending.insert(tx, request.clone());
        Ok(tx)
    }

    async fn await_confirmation(&self, _chain: Chain, tx: H256) -> Result<Confirmation> {
        let (request, revert) = {
            let mut state = self.state.lock().unwrap();
            let request = state
                .pending
                .remove(&tx)
                .ok_or_else(|| AppError::Execution(format!("unknown tx {tx:?}")))?;
            (request, state.revert)
        };
        if revert {
            return Ok(Confirmation::Reverted);
        }
        self.gateway.ledger().apply(&request);
        Ok(Confirmation::Success)
    }
}
