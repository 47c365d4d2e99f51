//! Trading venue client: submits fills against resting orders and waits for them.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use ethers::types::{Address, H256};

use crate::errors::Result;
use crate::models::{Chain, OrderQuote, TradeAction};

pub mod evm;

pub use evm::EvmVenue;

/// Everything the venue needs to fill one counter-order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub chain: Chain,
    pub action: TradeAction,
    pub token: Address,
    pub decimals: u32,
    /// Token amount, already sized and rounded.
    pub amount: BigDecimal,
    pub counter_order: OrderQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Success,
    Reverted,
}

#[async_trait]
pub trait TradingVenue: Send + Sync {
    /// Address whose balances fund the trades.
    fn wallet_address(&self) -> Address;

    async fn submit_order(&self, request: &OrderRequest) -> Result<H256>;

    /// Block until the transaction is mined.
    async fn await_confirmation(&self, chain: Chain, tx: H256) -> Result<Confirmation>;
}
