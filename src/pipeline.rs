//! Runs fetching and valuation for every configured address group.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use rust_decimal::Decimal;

use crate::config::NetworkAddresses;
use crate::fetch::{create_fetcher, FetchError, FetcherSettings, TransferFetcher};
use crate::market_data::{CurrencyPair, PriceError, PriceOracle};
use crate::models::{AddressGroup, RawTransfer, ResultRecord, ValuedTransaction};
use crate::network::{NetworkDescriptor, NetworkRegistry};
use crate::valuation::{ValuationEngine, ValuationError};

/// A current-price lookup that several address groups can await.
type CurrentPrice = Shared<BoxFuture<'static, Result<Decimal, PriceError>>>;

/// Why an address group produced no record.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("current price unavailable: {0}")]
    CurrentPrice(#[from] PriceError),
    #[error("unsupported network {0:?}")]
    UnknownNetwork(String),
    #[error("no fetcher configured for {0}")]
    MissingFetcher(String),
}

#[derive(Debug)]
pub struct GroupFailure {
    pub group: AddressGroup,
    /// Set when only the record for this currency failed.
    pub currency: Option<String>,
    pub error: GroupError,
}

/// A transfer left out of its record because it could not be valued.
#[derive(Debug)]
pub struct DroppedTransfer {
    pub network: String,
    pub address: String,
    pub hash: String,
    pub date: NaiveDate,
    pub currency: String,
    pub error: ValuationError,
}

/// Everything a run produced. Records for different groups come in no
/// particular order.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub records: Vec<ResultRecord>,
    pub failures: Vec<GroupFailure>,
    pub dropped: Vec<DroppedTransfer>,
}

impl RunOutcome {
    fn merge(&mut self, other: RunOutcome) {
        self.records.extend(other.records);
        self.failures.extend(other.failures);
        self.dropped.extend(other.dropped);
    }
}

/// Splits configured addresses into fetch groups: all together for networks
/// that accept batches, one per address otherwise.
pub fn address_groups(network: &NetworkDescriptor, addresses: &[String]) -> Vec<AddressGroup> {
    if network.batch {
        vec![AddressGroup::new(&network.name, addresses.to_vec())]
    } else {
        addresses
            .iter()
            .map(|address| AddressGroup::single(&network.name, address))
            .collect()
    }
}

pub struct Pipeline {
    registry: Arc<NetworkRegistry>,
    fetchers: HashMap<String, Arc<dyn TransferFetcher>>,
    engine: ValuationEngine,
    currencies: Vec<String>,
}

impl Pipeline {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        oracle: Arc<dyn PriceOracle>,
        currencies: Vec<String>,
    ) -> Self {
        Self {
            registry,
            fetchers: HashMap::new(),
            engine: ValuationEngine::new(oracle),
            currencies: currencies.into_iter().map(|c| c.to_uppercase()).collect(),
        }
    }

    /// Builds a pipeline with a fetcher for every network in `plan`.
    pub fn from_settings(
        registry: Arc<NetworkRegistry>,
        oracle: Arc<dyn PriceOracle>,
        currencies: Vec<String>,
        plan: &[NetworkAddresses],
        settings: &FetcherSettings,
    ) -> Result<Self> {
        let mut pipeline = Self::new(registry.clone(), oracle, currencies);
        for entry in plan {
            if let Some(network) = registry.get(&entry.network) {
                pipeline = pipeline.with_fetcher(&network.name, create_fetcher(network, settings)?);
            }
        }
        Ok(pipeline)
    }

    pub fn with_fetcher(
        mut self,
        network: impl Into<String>,
        fetcher: Arc<dyn TransferFetcher>,
    ) -> Self {
        self.fetchers.insert(network.into(), fetcher);
        self
    }

    /// Fetches and values every address group of `plan` concurrently.
    ///
    /// Never fails as a whole: groups that could not be fetched or priced are
    /// reported in [`RunOutcome::failures`] and left out of the records.
    pub async fn run(&self, plan: &[NetworkAddresses]) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        let mut groups = Vec::new();

        for entry in plan {
            let Some(network) = self.registry.get(&entry.network) else {
                outcome.failures.push(GroupFailure {
                    group: AddressGroup::new(&entry.network, entry.addresses.clone()),
                    currency: None,
                    error: GroupError::UnknownNetwork(entry.network.clone()),
                });
                continue;
            };
            let Some(fetcher) = self.fetchers.get(&network.name) else {
                outcome.failures.push(GroupFailure {
                    group: AddressGroup::new(&network.name, entry.addresses.clone()),
                    currency: None,
                    error: GroupError::MissingFetcher(network.name.clone()),
                });
                continue;
            };

            // Started before any transfer is fetched so both proceed together.
            let current_prices: Vec<(String, CurrentPrice)> = self
                .currencies
                .iter()
                .map(|currency| (currency.clone(), self.spawn_current_price(network, currency)))
                .collect();

            for group in address_groups(network, &entry.addresses) {
                groups.push(self.run_group(network, fetcher.as_ref(), group, current_prices.clone()));
            }
        }

        for group_outcome in join_all(groups).await {
            outcome.merge(group_outcome);
        }

        for failure in &outcome.failures {
            tracing::warn!(
                network = %failure.group.network,
                address = %failure.group,
                currency = failure.currency.as_deref().unwrap_or("*"),
                error = %failure.error,
                "address group skipped"
            );
        }
        tracing::info!(
            oracle = self.engine.oracle().name(),
            records = outcome.records.len(),
            failures = outcome.failures.len(),
            dropped = outcome.dropped.len(),
            "valuation run finished"
        );

        outcome
    }

    fn spawn_current_price(&self, network: &NetworkDescriptor, currency: &str) -> CurrentPrice {
        let oracle = self.engine.oracle().clone();
        let pair = CurrencyPair::new(&network.code, currency);
        let lookup_pair = pair.clone();
        let handle = tokio::spawn(async move { oracle.spot_price(&lookup_pair, None).await });

        async move {
            match handle.await {
                Ok(price) => price,
                Err(err) => Err(PriceError::Transport {
                    pair,
                    date: None,
                    message: format!("current price task failed: {err}"),
                }),
            }
        }
        .boxed()
        .shared()
    }

    async fn run_group(
        &self,
        network: &NetworkDescriptor,
        fetcher: &dyn TransferFetcher,
        group: AddressGroup,
        current_prices: Vec<(String, CurrentPrice)>,
    ) -> RunOutcome {
        let transfers = match fetcher.fetch_inbound(&group).await {
            Ok(transfers) => transfers,
            Err(error) => {
                return RunOutcome {
                    failures: vec![GroupFailure {
                        group,
                        currency: None,
                        error: error.into(),
                    }],
                    ..Default::default()
                };
            }
        };

        tracing::debug!(
            network = %network.name,
            address = %group,
            transfers = transfers.len(),
            "valuing inbound transfers"
        );

        let valuations = current_prices.into_iter().map(|(currency, current_price)| {
            self.value_group(network, &group, transfers.clone(), currency, current_price)
        });

        let mut outcome = RunOutcome::default();
        for currency_outcome in join_all(valuations).await {
            outcome.merge(currency_outcome);
        }
        outcome
    }

    async fn value_group(
        &self,
        network: &NetworkDescriptor,
        group: &AddressGroup,
        transfers: Vec<RawTransfer>,
        currency: String,
        current_price: CurrentPrice,
    ) -> RunOutcome {
        let lookups = transfers.into_iter().map(|transfer| {
            let address = transfer.address.clone();
            let hash = transfer.hash.clone();
            let date = transfer.date;
            let currency = &currency;
            async move {
                let result = self.engine.value_transfer(transfer, network, currency).await;
                (address, hash, date, result)
            }
        });

        let mut outcome = RunOutcome::default();
        let mut valued: Vec<ValuedTransaction> = Vec::new();
        for (address, hash, date, result) in join_all(lookups).await {
            match result {
                Ok(tx) => valued.push(tx),
                Err(error) => {
                    tracing::warn!(
                        network = %network.name,
                        address = %address,
                        hash = %hash,
                        %date,
                        currency = %currency,
                        error = %error,
                        "dropping transfer without a price"
                    );
                    outcome.dropped.push(DroppedTransfer {
                        network: network.name.clone(),
                        address,
                        hash,
                        date,
                        currency: currency.clone(),
                        error,
                    });
                }
            }
        }

        match self
            .engine
            .build_result(valued, network, group, &currency, current_price)
            .await
        {
            Ok(record) => outcome.records.push(record),
            Err(error) => outcome.failures.push(GroupFailure {
                group: group.clone(),
                currency: Some(currency),
                error: error.into(),
            }),
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_network_gets_one_group() {
        let registry = NetworkRegistry::builtin();
        let addresses = vec!["a".to_string(), "b".to_string()];

        let groups = address_groups(registry.get("bitcoin").unwrap(), &addresses);
        assert_eq!(groups, vec![AddressGroup::new("bitcoin", addresses.clone())]);

        let groups = address_groups(registry.get("litecoin").unwrap(), &addresses);
        assert_eq!(
            groups,
            vec![
                AddressGroup::single("litecoin", "a"),
                AddressGroup::single("litecoin", "b"),
            ]
        );
    }
}
