//! Shared data structures used throughout the application.

use bigdecimal::BigDecimal;
use ethers::types::Address;
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Blockchains the bot knows how to trade on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Etc,
    Eth,
}

/// Static per-chain parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChainParams {
    pub name: &'static str,
    pub chain_id: u64,
    pub rpc_url: &'static str,
}

static ETC: ChainParams = ChainParams {
    name: "ETC",
    chain_id: 61,
    rpc_url: "https://ethereumclassic.network/",
};

static ETH: ChainParams = ChainParams {
    name: "ETH",
    chain_id: 1,
    rpc_url: "https://mainnet.infura.io/mew",
};

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Etc, Chain::Eth];

    pub fn params(self) -> &'static ChainParams {
        match self {
            Chain::Etc => &ETC,
            Chain::Eth => &ETH,
        }
    }

    pub fn chain_id(self) -> u64 {
        self.params().chain_id
    }

    pub fn rpc_url(self) -> &'static str {
        self.params().rpc_url
    }

    /// Upper-case name used in API paths and console output.
    pub fn as_str(self) -> &'static str {
        self.params().name
    }
}

impl FromStr for Chain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Chain::ALL
            .into_iter()
            .find(|chain| chain.as_str() == wanted)
            .ok_or_else(|| AppError::Config(format!("unknown blockchain '{s}'")))
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured token and its RSI thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWatch {
    pub chain: Chain,
    pub token: Address,
    /// Buy when RSI is at or below this value.
    pub buy_threshold: f64,
    /// Sell when RSI is at or above this value.
    pub sell_threshold: f64,
}

/// Reference to a resting order on the venue (the hash of the tx that created it).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderRef(pub String);

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token descriptor as reported by the market data gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub address: Address,
    /// Best resting buy order; a sell fills against it.
    pub best_buy_order: Option<OrderRef>,
    /// Best resting sell order; a buy fills against it.
    pub best_sell_order: Option<OrderRef>,
}

impl TokenInfo {
    /// Counter-order a trade in the given direction would match against.
    pub fn counter_order(&self, action: TradeAction) -> Option<&OrderRef> {
        match action {
            TradeAction::Buy => self.best_sell_order.as_ref(),
            TradeAction::Sell => self.best_buy_order.as_ref(),
        }
    }
}

/// Price candle; only open and close are used.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open: BigDecimal,
    pub close: BigDecimal,
}

/// Snapshot of a counter-order, valid only at fetch time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderQuote {
    pub order_ref: OrderRef,
    /// Ether per token.
    pub price: BigDecimal,
    pub token_balance_available: BigDecimal,
    pub ether_equivalent: BigDecimal,
    /// On-chain order id, when the venue reports it.
    pub order_id: Option<u64>,
    /// Exchange contract holding the order, when the venue reports it.
    pub exchange: Option<Address>,
}

impl OrderQuote {
    pub fn new(
        order_ref: OrderRef,
        price: BigDecimal,
        token_balance_available: BigDecimal,
    ) -> Self {
        let ether_equivalent = &price * &token_balance_available;
        Self {
            order_ref,
            price,
            token_balance_available,
            ether_equivalent,
            order_id: None,
            exchange: None,
        }
    }
}

/// Wallet balances relevant to one trade decision. Always fetched fresh.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletState {
    pub ether_balance: BigDecimal,
    pub token_balance: BigDecimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => f.write_str("buy"),
            TradeAction::Sell => f.write_str("sell"),
        }
    }
}

/// A trade queued for the execution phase of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionTask {
    pub watch: TokenWatch,
    pub action: TradeAction,
}
