use async_trait::async_trait;
use ethers::{
    contract::abigen,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, MnemonicBuilder, Signer, coins_bip39::English},
    types::{Address, H256, U64, U256},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::{Confirmation, OrderRequest, TradingVenue};
use crate::config::Credential;
use crate::errors::{AppError, Result};
use crate::models::{Chain, TradeAction};
use crate::utils::to_base_units;

abigen!(
    SaturnExchange,
    r"[
        function buyOrderWithEth(uint256 orderId) payable
        function sellTokensToOrder(address token, uint256 orderId, uint256 amount)
    ]",
);

abigen!(
    Erc20,
    r"[
        function approve(address spender, uint256 amount) returns (bool)
    ]",
);

type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

const ETHER_DECIMALS: u32 = 18;

/// Build the signing wallet from exactly one credential form.
///
/// Mnemonic accounts use `m/44'/60'/0'/0/{index}`.
pub fn load_wallet(credential: &Credential) -> Result<LocalWallet> {
    let wallet = match credential {
        Credential::PrivateKey(key) => key.trim().trim_start_matches("0x").parse::<LocalWallet>()?,
        Credential::Mnemonic { phrase, index } => MnemonicBuilder::<English>::default()
            .phrase(phrase.trim())
            .derivation_path(&format!("m/44'/60'/0'/0/{index}"))?
            .build()?,
    };
    Ok(wallet)
}

fn execution_error(e: impl std::fmt::Display) -> AppError {
    AppError::Execution(e.to_string())
}

/// Fills Saturn exchange orders from a local wallet, one signer client per chain.
#[derive(Clone)]
pub struct EvmVenue {
    address: Address,
    clients: HashMap<Chain, Arc<Client>>,
}

impl EvmVenue {
    pub fn new(wallet: LocalWallet, chains: impl IntoIterator<Item = Chain>) -> Result<Self> {
        let address = wallet.address();
        let mut clients = HashMap::new();
        for chain in chains {
            let provider = Provider::<Http>::try_from(chain.rpc_url())?;
            let signer = wallet.clone().with_chain_id(chain.chain_id());
            clients.insert(chain, Arc::new(SignerMiddleware::new(provider, signer)));
        }
        Ok(Self { address, clients })
    }

    fn client(&self, chain: Chain) -> Result<Arc<Client>> {
        self.clients
            .get(&chain)
            .cloned()
            .ok_or_else(|| AppError::Execution(format!("no client configured for {chain}")))
    }

    async fn approve(
        &self,
        client: Arc<Client>,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<()> {
        let erc20 = Erc20::new(token, client);
        let call = erc20.approve(spender, amount);
        let pending = call.send().await.map_err(execution_error)?;
        let tx = *pending;
        info!(?tx, "[TX] approval sent");
        match pending.await? {
            Some(receipt) if receipt.status == Some(U64::from(1)) => Ok(()),
            Some(_) => Err(AppError::Reverted(tx)),
            None => Err(AppError::Execution(format!("approval {tx:?} dropped"))),
        }
    }
}

#[async_trait]
impl TradingVenue for EvmVenue {
    fn wallet_address(&self) -> Address {
        self.address
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<H256> {
        let client = self.client(request.chain)?;
        let order = &request.counter_order;
        let exchange_addr = order.exchange.ok_or_else(|| {
            AppError::Execution(format!("order {} has no exchange contract", order.order_ref))
        })?;
        let order_id = order
            .order_id
            .map(U256::from)
            .ok_or_else(|| AppError::Execution(format!("order {} has no id", order.order_ref)))?;
        let amount = to_base_units(&request.amount, request.decimals)?;
        let exchange = SaturnExchange::new(exchange_addr, client.clone());

        let tx = match request.action {
            TradeAction::Buy => {
                let value = to_base_units(&(&request.amount * &order.price), ETHER_DECIMALS)?;
                let call = exchange.buy_order_with_eth(order_id).value(value);
                let pending = call.send().await.map_err(execution_error)?;
                *pending
            }
            TradeAction::Sell => {
                self.approve(client.clone(), request.token, exchange_addr, amount)
                    .await?;
                let call = exchange.sell_tokens_to_order(request.token, order_id, amount);
                let pending = call.send().await.map_err(execution_error)?;
                *pending
            }
        };
        Ok(tx)
    }

    async fn await_confirmation(&self, chain: Chain, tx: H256) -> Result<Confirmation> {
        let client = self.client(chain)?;
        match PendingTransaction::new(tx, client.provider()).await? {
            Some(receipt) if receipt.status == Some(U64::from(1)) => Ok(Confirmation::Success),
            Some(_) => Ok(Confirmation::Reverted),
            None => Err(AppError::Execution(format!("transaction {tx:?} dropped"))),
        }
    }
}
