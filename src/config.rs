//! Configuration loader and application settings.

use bigdecimal::BigDecimal;
use clap::Parser;
use num_traits::Signed;
use ethers::types::Address;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::errors::{AppError, Result};
use crate::executor::ExecutionPolicy;
use crate::gateway::saturn::SATURN_API_URL;
use crate::indicator::DEFAULT_RSI_PERIOD;
use crate::models::{Chain, TokenWatch};
use crate::sizing::default_dust_threshold;
use crate::utils::{lenient_decimal, lenient_decimal_opt, lenient_f64};

/// Command line flags. Credentials can also come from `PRIVATE_KEY` / `MNEMONIC`.
#[derive(Debug, Parser)]
#[command(
    name = "rsi-trading-bot",
    version,
    about = "Watch RSI of given tokens on Saturn Network and auto buy/sell"
)]
pub struct CliArgs {
    /// Private key of the wallet to use for trading
    #[arg(short = 'p', long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub pkey: Option<String>,

    /// Mnemonic of the wallet to use for trading
    #[arg(short = 'm', long, env = "MNEMONIC", hide_env_values = true)]
    pub mnemonic: Option<String>,

    /// Account number when using a mnemonic (1-based)
    #[arg(short = 'i', long, default_value_t = 2)]
    pub walletid: u32,

    /// Trading bot config file
    #[arg(short = 'j', long)]
    pub json: Option<PathBuf>,

    /// Polling delay in seconds
    #[arg(short = 'd', long, default_value_t = 60)]
    pub delay: u64,
}

/// Wallet secret. Exactly one form must be supplied.
#[derive(Clone, PartialEq)]
pub enum Credential {
    PrivateKey(String),
    /// Zero-based account index.
    Mnemonic { phrase: String, index: u32 },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::PrivateKey(_) => f.write_str("PrivateKey(<redacted>)"),
            Credential::Mnemonic { index, .. } => {
                write!(f, "Mnemonic {{ phrase: <redacted>, index: {index} }}")
            }
        }
    }
}

impl Credential {
    pub fn from_flags(
        pkey: Option<String>,
        mnemonic: Option<String>,
        walletid: u32,
    ) -> Result<Self> {
        let pkey = pkey.filter(|s| !s.trim().is_empty());
        let mnemonic = mnemonic.filter(|s| !s.trim().is_empty());
        match (pkey, mnemonic) {
            (None, None) => Err(AppError::Config(
                "at least one of [pkey], [mnemonic] must be supplied".into(),
            )),
            (Some(_), Some(_)) => Err(AppError::Config(
                "only one of [pkey], [mnemonic] must be supplied".into(),
            )),
            (Some(key), None) => Ok(Credential::PrivateKey(key)),
            (None, Some(phrase)) => {
                let index = walletid.checked_sub(1).ok_or_else(|| {
                    AppError::Config("walletid is 1-based and must be at least 1".into())
                })?;
                Ok(Credential::Mnemonic { phrase, index })
            }
        }
    }
}

/// Immutable settings the decision loop runs with.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub tokens: Vec<TokenWatch>,
    /// Ether that must stay in the wallet.
    pub min_ether_reserve: BigDecimal,
    /// Token balance at or below which selling is skipped.
    pub dust_threshold: BigDecimal,
    pub rsi_period: usize,
    pub delay: Duration,
    pub api_url: String,
    pub execution_policy: ExecutionPolicy,
}

impl BotConfig {
    pub fn chains(&self) -> Vec<Chain> {
        let mut chains: Vec<Chain> = Vec::new();
        for watch in &self.tokens {
            if !chains.contains(&watch.chain) {
                chains.push(watch.chain);
            }
        }
        chains
    }
}

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credential: Credential,
    pub bot: BotConfig,
}

impl AppConfig {
    /// Validate flags and read the bot file. Every failure here is fatal.
    pub fn load(args: CliArgs) -> Result<Self> {
        let credential = Credential::from_flags(args.pkey, args.mnemonic, args.walletid)?;
        let path = args
            .json
            .ok_or_else(|| AppError::Config("must specify bot config .json file location".into()))?;
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("cannot read bot config {}: {e}", path.display()))
        })?;
        let bot = parse_bot_config(&raw, Duration::from_secs(args.delay))?;
        Ok(Self { credential, bot })
    }
}

#[derive(Debug, Deserialize)]
struct BotFile {
    global: GlobalSection,
    tokens: Vec<TokenRow>,
}

#[derive(Debug, Deserialize)]
struct GlobalSection {
    #[serde(deserialize_with = "lenient_decimal")]
    min_ether_in_wallet: BigDecimal,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    rsi_period: Option<usize>,
    #[serde(default, deserialize_with = "lenient_decimal_opt")]
    dust_threshold: Option<BigDecimal>,
    #[serde(default)]
    on_execution_error: Option<ExecutionPolicy>,
}

#[derive(Debug, Deserialize)]
struct TokenRow {
    blockchain: String,
    token: String,
    #[serde(deserialize_with = "lenient_f64")]
    rsi_buy: f64,
    #[serde(deserialize_with = "lenient_f64")]
    rsi_sell: f64,
}

impl TokenRow {
    fn into_watch(self) -> Result<TokenWatch> {
        let chain: Chain = self.blockchain.parse()?;
        let token: Address = self
            .token
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("invalid token address '{}': {e}", self.token)))?;
        if !self.rsi_buy.is_finite() || !self.rsi_sell.is_finite() {
            return Err(AppError::Config(format!(
                "thresholds for {} must be finite numbers",
                self.token
            )));
        }
        Ok(TokenWatch {
            chain,
            token,
            buy_threshold: self.rsi_buy,
            sell_threshold: self.rsi_sell,
        })
    }
}

/// Parse the JSON bot file into a validated [`BotConfig`].
pub fn parse_bot_config(raw: &str, delay: Duration) -> Result<BotConfig> {
    let file: BotFile = serde_json::from_str(raw)
        .map_err(|e| AppError::Config(format!("malformed bot config: {e}")))?;

    let tokens = file
        .tokens
        .into_iter()
        .map(TokenRow::into_watch)
        .collect::<Result<Vec<_>>>()?;
    if tokens.is_empty() {
        return Err(AppError::Config("bot config lists no tokens".into()));
    }

    let api_url = file.global.api_url.unwrap_or_else(|| SATURN_API_URL.to_string());
    Url::parse(&api_url)
        .map_err(|e| AppError::Config(format!("invalid api_url '{api_url}': {e}")))?;

    let rsi_period = file.global.rsi_period.unwrap_or(DEFAULT_RSI_PERIOD);
    if rsi_period == 0 {
        return Err(AppError::Config("rsi_period must be at least 1".into()));
    }

    let min_ether_reserve = file.global.min_ether_in_wallet;
    if min_ether_reserve.is_negative() {
        return Err(AppError::Config(format!(
            "min_ether_in_wallet must not be negative, got {min_ether_reserve}"
        )));
    }
    let dust_threshold = file
        .global
        .dust_threshold
        .unwrap_or_else(default_dust_threshold);
    if dust_threshold.is_negative() {
        return Err(AppError::Config(format!(
            "dust_threshold must not be negative, got {dust_threshold}"
        )));
    }

    Ok(BotConfig {
        tokens,
        min_ether_reserve,
        dust_threshold,
        rsi_period,
        delay,
        api_url,
        execution_policy: file.global.on_execution_error.unwrap_or_default(),
    })
}
