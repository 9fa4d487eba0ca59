use chrono::{DateTime, NaiveDate, Utc};

/// An inbound transfer as reported by a chain explorer, before pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransfer {
    /// Address that received the funds.
    pub address: String,
    /// Amount in the network's smallest unit (satoshi, wei, ...).
    pub amount: u128,
    pub timestamp: DateTime<Utc>,
    /// UTC calendar date of `timestamp`; the key for historical price lookups.
    pub date: NaiveDate,
    pub hash: String,
}

impl RawTransfer {
    pub fn new(
        address: impl Into<String>,
        amount: u128,
        timestamp: DateTime<Utc>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            amount,
            timestamp,
            date: timestamp.date_naive(),
            hash: hash.into(),
        }
    }

    /// Builds a transfer from a unix timestamp in seconds.
    pub fn from_unix(
        address: impl Into<String>,
        amount: u128,
        seconds: i64,
        hash: impl Into<String>,
    ) -> Option<Self> {
        let timestamp = DateTime::from_timestamp(seconds, 0)?;
        Some(Self::new(address, amount, timestamp, hash))
    }
}
