//! Trade sizing with reserve and holdings guards.
//!
//! Sizing never fails with an error: when a trade must not happen the
//! functions return a [`Refusal`], which the executor reports as a skip.

use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::Zero;
use std::fmt;
use std::str::FromStr;

use crate::models::{OrderQuote, WalletState};

/// Token balance at or below which there is nothing worth selling.
pub fn default_dust_threshold() -> BigDecimal {
    BigDecimal::from_str("0.00005").unwrap_or_else(|_| BigDecimal::zero())
}

/// Reasons a trade is not placed.
#[derive(Debug, Clone, PartialEq)]
pub enum Refusal {
    /// Ether balance does not exceed the configured reserve floor.
    ReserveFloor {
        balance: BigDecimal,
        reserve: BigDecimal,
    },
    /// Token holdings are at or below the dust threshold.
    NoHoldings {
        balance: BigDecimal,
        epsilon: BigDecimal,
    },
    /// Counter-order has a non-positive price or nothing left to fill.
    EmptyOrder,
    /// Rounding to the token's decimals left nothing to trade.
    ZeroAmount,
    /// Token has no resting counter-order to trade against.
    NoCounterOrder,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::ReserveFloor { balance, reserve } => write!(
                f,
                "ether balance {balance} is not above the configured minimum of {reserve}"
            ),
            Refusal::NoHoldings { balance, epsilon } => write!(
                f,
                "token balance {balance} is at or below the dust threshold {epsilon}"
            ),
            Refusal::EmptyOrder => f.write_str("counter-order has nothing to fill"),
            Refusal::ZeroAmount => f.write_str("trade amount rounds down to zero"),
            Refusal::NoCounterOrder => f.write_str("no counter-order on the book"),
        }
    }
}

fn round_down(value: &BigDecimal, decimals: u32) -> BigDecimal {
    value.with_scale_round(i64::from(decimals), RoundingMode::Down)
}

fn has_liquidity(order: &OrderQuote) -> bool {
    order.price > BigDecimal::zero() && order.ether_equivalent > BigDecimal::zero()
}

/// Token amount to buy against a sell order without spending into the reserve.
pub fn size_buy(
    order: &OrderQuote,
    wallet: &WalletState,
    min_ether_reserve: &BigDecimal,
    decimals: u32,
) -> Result<BigDecimal, Refusal> {
    if wallet.ether_balance <= *min_ether_reserve {
        return Err(Refusal::ReserveFloor {
            balance: wallet.ether_balance.clone(),
            reserve: min_ether_reserve.clone(),
        });
    }
    if !has_liquidity(order) {
        return Err(Refusal::EmptyOrder);
    }

    let trade_limit = &wallet.ether_balance - min_ether_reserve;
    let ether_to_spend = if trade_limit > order.ether_equivalent {
        order.ether_equivalent.clone()
    } else {
        trade_limit
    };

    let amount = round_down(&(ether_to_spend / &order.price), decimals);
    if amount.is_zero() {
        return Err(Refusal::ZeroAmount);
    }
    Ok(amount)
}

/// Token amount to sell into a buy order, never more than currently held.
pub fn size_sell(
    order: &OrderQuote,
    wallet: &WalletState,
    epsilon: &BigDecimal,
    decimals: u32,
) -> Result<BigDecimal, Refusal> {
    if wallet.token_balance <= *epsilon {
        return Err(Refusal::NoHoldings {
            balance: wallet.token_balance.clone(),
            epsilon: epsilon.clone(),
        });
    }
    if !has_liquidity(order) {
        return Err(Refusal::EmptyOrder);
    }

    let desired = round_down(&(&order.ether_equivalent / &order.price), decimals);
    let amount = if desired > wallet.token_balance {
        wallet.token_balance.clone()
    } else {
        desired
    };

    if amount.is_zero() {
        return Err(Refusal::ZeroAmount);
    }
    Ok(amount)
}
