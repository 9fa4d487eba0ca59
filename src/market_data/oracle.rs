use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A base/quote currency pair such as BTC-USD.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim().to_uppercase(),
            quote: quote.as_ref().trim().to_uppercase(),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

/// Formats an optional lookup date for error messages.
fn at(date: &Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.to_string(),
        None => "now".to_string(),
    }
}

/// The price source had no usable quote for a pair and date.
///
/// Cloneable so a single current-price lookup can be shared by several
/// address groups.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PriceError {
    #[error("price request for {pair} at {} failed: {message}", at(.date))]
    Transport {
        pair: CurrencyPair,
        date: Option<NaiveDate>,
        message: String,
    },
    #[error("price source returned {status} for {pair} at {}: {body}", at(.date))]
    Status {
        pair: CurrencyPair,
        date: Option<NaiveDate>,
        status: u16,
        body: String,
    },
    #[error("malformed price response for {pair} at {}: {message}", at(.date))]
    Decode {
        pair: CurrencyPair,
        date: Option<NaiveDate>,
        message: String,
    },
    #[error("price for {pair} at {} is not positive: {price}", at(.date))]
    NotPositive {
        pair: CurrencyPair,
        date: Option<NaiveDate>,
        price: Decimal,
    },
}

/// Resolves spot prices. Implementations perform one upstream request per
/// call; wrap one in a caching oracle if repeated lookups matter.
#[async_trait::async_trait]
pub trait PriceOracle: Send + Sync {
    /// Price of one `pair.base` in `pair.quote` on `date`, or now when `date`
    /// is `None`. Always positive on success.
    async fn spot_price(
        &self,
        pair: &CurrencyPair,
        date: Option<NaiveDate>,
    ) -> Result<Decimal, PriceError>;

    fn name(&self) -> &str;
}
