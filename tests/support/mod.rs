#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use incomebook::fetch::{FetchError, TransferFetcher};
use incomebook::market_data::{CurrencyPair, PriceError, PriceOracle};
use incomebook::models::{AddressGroup, RawTransfer};
use rust_decimal::Decimal;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A transfer received at noon UTC on `day`.
pub fn transfer(address: &str, amount: u128, day: NaiveDate, hash: &str) -> RawTransfer {
    let timestamp = Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap());
    RawTransfer::new(address, amount, timestamp, hash)
}

/// Oracle answering from a (base, date) table; `None` is the current price.
#[derive(Default)]
pub struct MockOracle {
    prices: HashMap<(String, Option<NaiveDate>), Decimal>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, base: &str, date: Option<NaiveDate>, price: Decimal) -> Self {
        self.prices.insert((base.to_uppercase(), date), price);
        self
    }

    /// Sleeps before answering, to exercise concurrency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn spot_price(
        &self,
        pair: &CurrencyPair,
        date: Option<NaiveDate>,
    ) -> Result<Decimal, PriceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.prices
            .get(&(pair.base.clone(), date))
            .copied()
            .ok_or_else(|| PriceError::Status {
                pair: pair.clone(),
                date,
                status: 404,
                body: "no quote".to_string(),
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Fetcher serving canned transfers per address, or failing for some.
#[derive(Default)]
pub struct MockFetcher {
    network: String,
    transfers: HashMap<String, Vec<RawTransfer>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new(network: &str) -> Self {
        Self {
            network: network.to_string(),
            ..Default::default()
        }
    }

    pub fn with_transfers(mut self, address: &str, transfers: Vec<RawTransfer>) -> Self {
        self.transfers.insert(address.to_string(), transfers);
        self
    }

    pub fn failing_for(mut self, address: &str) -> Self {
        self.failing.insert(address.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferFetcher for MockFetcher {
    fn network(&self) -> &str {
        &self.network
    }

    async fn fetch_inbound(&self, group: &AddressGroup) -> Result<Vec<RawTransfer>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if group.addresses.iter().any(|a| self.failing.contains(a)) {
            return Err(FetchError::Api {
                network: self.network.clone(),
                address: group.to_string(),
                message: "simulated outage".to_string(),
            });
        }

        Ok(group
            .addresses
            .iter()
            .flat_map(|a| self.transfers.get(a).cloned().unwrap_or_default())
            .collect())
    }
}
