//! RSI trading bot for Saturn Network order books on ETC and ETH.
//!
//! The binary wires these modules together: `config` parses flags and the
//! bot file, `decision` runs the polling loop, `executor` fills resting
//! orders through a `venue`, and `gateway` reads market data.

pub mod config;
pub mod decision;
pub mod errors;
pub mod executor;
pub mod gateway;
pub mod indicator;
pub mod models;
pub mod report;
pub mod sizing;
pub mod utils;
pub mod venue;

#[cfg(test)]
mod testing;
