use async_trait::async_trait;
use bigdecimal::BigDecimal;
use ethers::types::Address;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::MarketDataGateway;
use crate::errors::{AppError, Result};
use crate::models::{Candle, Chain, OrderQuote, OrderRef, TokenInfo};
use crate::utils::{hex_address, lenient_decimal, lenient_u32, lenient_u64_opt};

pub const SATURN_API_URL: &str = "https://ticker.saturn.network/api/v2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenShowMsg {
    name: String,
    symbol: String,
    #[serde(deserialize_with = "lenient_u32")]
    decimals: u32,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    best_buy_order_tx: Option<String>,
    #[serde(default)]
    best_sell_order_tx: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandleMsg {
    #[serde(deserialize_with = "lenient_decimal")]
    open: BigDecimal,
    #[serde(deserialize_with = "lenient_decimal")]
    close: BigDecimal,
}

#[derive(Debug, Deserialize)]
struct OrderMsg {
    #[serde(deserialize_with = "lenient_decimal")]
    price: BigDecimal,
    #[serde(deserialize_with = "lenient_decimal")]
    balance: BigDecimal,
    #[serde(default, deserialize_with = "lenient_u64_opt")]
    order_id: Option<u64>,
    #[serde(default)]
    contract: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct BalanceMsg {
    balances: WalletBalanceMsg,
}

#[derive(Debug, Deserialize)]
struct WalletBalanceMsg {
    #[serde(deserialize_with = "lenient_decimal")]
    walletbalance: BigDecimal,
}

fn order_ref(tx: Option<String>) -> Option<OrderRef> {
    tx.filter(|t| !t.is_empty()).map(OrderRef)
}

/// REST client for the Saturn Network ticker API.
#[derive(Clone)]
pub struct SaturnGateway {
    client: Client,
    base_url: String,
}

impl SaturnGateway {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("rsibot"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "[GW] fetching");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MarketDataGateway for SaturnGateway {
    async fn token_info(&self, chain: Chain, token: Address) -> Result<TokenInfo> {
        let path = format!("tokens/show/{}/{}.json", chain, hex_address(&token));
        let msg: TokenShowMsg = self.get_json(&path).await?;
        Ok(TokenInfo {
            name: msg.name,
            symbol: msg.symbol,
            decimals: msg.decimals,
            address: msg.address.unwrap_or(token),
            best_buy_order: order_ref(msg.best_buy_order_tx),
            best_sell_order: order_ref(msg.best_sell_order_tx),
        })
    }

    async fn candles(&self, chain: Chain, token: Address, window: usize) -> Result<Vec<Candle>> {
        let path = format!("tokens/ohlcv/{}/{}.json", chain, hex_address(&token));
        let msgs: Vec<CandleMsg> = self.get_json(&path).await?;
        let skip = msgs.len().saturating_sub(window);
        Ok(msgs
            .into_iter()
            .skip(skip)
            .map(|m| Candle {
                open: m.open,
                close: m.close,
            })
            .collect())
    }

    async fn order_quote(&self, chain: Chain, order: &OrderRef) -> Result<OrderQuote> {
        let path = format!("orders/by_tx/{}/{}.json", chain, order);
        let msg: OrderMsg = self.get_json(&path).await?;
        let mut quote = OrderQuote::new(order.clone(), msg.price, msg.balance);
        quote.order_id = msg.order_id;
        quote.exchange = msg.contract;
        Ok(quote)
    }

    async fn wallet_balance(
        &self,
        chain: Chain,
        wallet: Address,
        token: Address,
    ) -> Result<BigDecimal> {
        let path = format!(
            "tokens/balances/{}/{}/{}.json",
            chain,
            hex_address(&wallet),
            hex_address(&token)
        );
        let msg: BalanceMsg = self.get_json(&path).await?;
        Ok(msg.balances.walletbalance)
    }
}
