//! Spot prices for currency pairs, current or historical.

mod oracle;
pub mod providers;

pub use oracle::{CurrencyPair, PriceError, PriceOracle};
