use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Gateway returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Transaction {0:?} reverted")]
    Reverted(ethers::types::H256),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Provider error: {0}")]
    Provider(#[from] ethers::providers::ProviderError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] ethers::signers::WalletError),
}

impl AppError {
    /// Errors that must stop the process before the polling loop starts.
    pub fn is_startup(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::Wallet(_))
    }

    /// Errors raised while fetching market data; the cycle is retried later.
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            AppError::Gateway(_) | AppError::Status { .. } | AppError::Http(_)
        )
    }
}
