//! Coinbase spot price oracle.
//!
//! Uses the public `/v2/prices/{pair}/spot` endpoint, which takes an optional
//! `date=YYYY-MM-DD` query for historical prices. No API key is required.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::market_data::{CurrencyPair, PriceError, PriceOracle};

const COINBASE_API_BASE: &str = "https://api.coinbase.com";

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotPrice,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct SpotPrice {
    base: Option<String>,
    currency: Option<String>,
    /// Decimal string, e.g. "42850.12".
    amount: String,
}

/// Coinbase spot price oracle.
#[derive(Debug, Clone)]
pub struct CoinbaseSpotOracle {
    client: Client,
    base_url: String,
}

impl CoinbaseSpotOracle {
    /// Creates an oracle with a default HTTP client.
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Creates an oracle with a custom reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: COINBASE_API_BASE.to_string(),
        }
    }

    /// Creates an oracle whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self::with_client(Client::builder().timeout(timeout).build()?))
    }

    /// Overrides the API base URL (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, pair: &CurrencyPair) -> String {
        format!("{}/v2/prices/{}/spot", self.base_url, pair)
    }
}

impl Default for CoinbaseSpotOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PriceOracle for CoinbaseSpotOracle {
    async fn spot_price(
        &self,
        pair: &CurrencyPair,
        date: Option<NaiveDate>,
    ) -> Result<Decimal, PriceError> {
        let mut request = self
            .client
            .get(self.url(pair))
            .header("Accept", "application/json");
        if let Some(date) = date {
            request = request.query(&[("date", date.format("%Y-%m-%d").to_string())]);
        }

        tracing::debug!(pair = %pair, ?date, "fetching spot price");

        let transport = |err: reqwest::Error| PriceError::Transport {
            pair: pair.clone(),
            date,
            message: err.to_string(),
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(PriceError::Status {
                pair: pair.clone(),
                date,
                status: status.as_u16(),
                body,
            });
        }

        let price = parse_spot_price(&body).map_err(|message| PriceError::Decode {
            pair: pair.clone(),
            date,
            message,
        })?;

        if price <= Decimal::ZERO {
            return Err(PriceError::NotPositive {
                pair: pair.clone(),
                date,
                price,
            });
        }

        Ok(price)
    }

    fn name(&self) -> &str {
        "coinbase"
    }
}

fn parse_spot_price(body: &str) -> Result<Decimal, String> {
    let response: SpotResponse = serde_json::from_str(body).map_err(|e| e.to_string())?;
    Decimal::from_str(response.data.amount.trim())
        .map_err(|e| format!("invalid amount {:?}: {e}", response.data.amount))
}
