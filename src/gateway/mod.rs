//! Market data gateway.
//!
//! Responsibilities:
//! • Token descriptors, including the best resting orders on each side.
//! • Candle history for the RSI window.
//! • Counter-order quotes and wallet balances, always fetched fresh.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use ethers::types::Address;

use crate::errors::Result;
use crate::models::{Candle, Chain, OrderQuote, OrderRef, TokenInfo};

pub mod saturn;

pub use saturn::SaturnGateway;

/// Read-only access to market and wallet data. Every call is a remote fetch.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    async fn token_info(&self, chain: Chain, token: Address) -> Result<TokenInfo>;

    /// Candles ordered oldest first; at most `window` of the most recent.
    async fn candles(&self, chain: Chain, token: Address, window: usize) -> Result<Vec<Candle>>;

    async fn order_quote(&self, chain: Chain, order: &OrderRef) -> Result<OrderQuote>;

    /// Token balance of `wallet`; `Address::zero()` as token means the native ether balance.
    async fn wallet_balance(
        &self,
        chain: Chain,
        wallet: Address,
        token: Address,
    ) -> Result<BigDecimal>;

    async fn ether_balance(&self, chain: Chain, wallet: Address) -> Result<BigDecimal> {
        self.wallet_balance(chain, wallet, Address::zero()).await
    }
}
