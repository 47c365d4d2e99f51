//! Miscellaneous helper utilities.

use bigdecimal::BigDecimal;
use ethers::types::{Address, U256};
use num_traits::Signed;
use serde::{Deserialize, Deserializer, de::Error as _};
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt};

use crate::errors::{AppError, Result};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Full lower-case `0x` hex form of an address, as used in API paths.
pub fn hex_address(address: &Address) -> String {
    format!("{address:?}")
}

/// Convert a decimal token amount into integer base units, truncating
/// anything finer than `decimals`.
pub fn to_base_units(amount: &BigDecimal, decimals: u32) -> Result<U256> {
    if amount.is_negative() {
        return Err(AppError::Execution(format!("negative amount {amount}")));
    }
    let (digits, _) = amount.with_scale(i64::from(decimals)).into_bigint_and_exponent();
    U256::from_dec_str(&digits.to_string())
        .map_err(|e| AppError::Execution(format!("amount {amount} out of range: {e}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrString {
    fn into_text(self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::Text(s) => s.trim().to_string(),
        }
    }
}

/// Accept `4` or `"4"`.
pub fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    let raw = NumberOrString::deserialize(d)?.into_text();
    raw.parse().map_err(D::Error::custom)
}

/// Accept `42`, `"42"`, `null` or a missing field.
pub fn lenient_u64_opt<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<u64>, D::Error> {
    match Option::<NumberOrString>::deserialize(d)? {
        Some(v) => v.into_text().parse().map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}

/// Accept `1.25` or `"1.25"`, parsing the literal text so no value passes through `f64`.
pub fn lenient_decimal<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<BigDecimal, D::Error> {
    let raw = NumberOrString::deserialize(d)?.into_text();
    BigDecimal::from_str(&raw).map_err(D::Error::custom)
}

pub fn lenient_decimal_opt<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<BigDecimal>, D::Error> {
    match Option::<NumberOrString>::deserialize(d)? {
        Some(v) => BigDecimal::from_str(&v.into_text())
            .map(Some)
            .map_err(D::Error::custom),
        None => Ok(None),
    }
}

/// Accept `30`, `30.5` or `"30.5"`.
pub fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    let raw = NumberOrString::deserialize(d)?.into_text();
    raw.parse().map_err(D::Error::custom)
}
