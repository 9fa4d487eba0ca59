use std::sync::Arc;

use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::SecretString;

use super::fetchers::{BlockCypherFetcher, BlockchainInfoFetcher, EtherscanFetcher};
use super::TransferFetcher;
use crate::config::Endpoints;
use crate::network::{NetworkDescriptor, TransferSource};

/// Everything a fetcher may need besides its network descriptor.
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub client: Client,
    pub etherscan_api_key: Option<SecretString>,
    pub endpoints: Endpoints,
}

impl FetcherSettings {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            etherscan_api_key: None,
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_etherscan_api_key(mut self, key: SecretString) -> Self {
        self.etherscan_api_key = Some(key);
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

/// Builds the fetcher serving `network`.
///
/// Fails when a credential the source requires is missing.
pub fn create_fetcher(
    network: &NetworkDescriptor,
    settings: &FetcherSettings,
) -> Result<Arc<dyn TransferFetcher>> {
    let client = settings.client.clone();
    let endpoints = &settings.endpoints;

    match &network.source {
        TransferSource::BlockchainInfo => {
            let mut fetcher = BlockchainInfoFetcher::new(&network.name, client);
            if let Some(url) = &endpoints.blockchain_info {
                fetcher = fetcher.with_base_url(url);
            }
            Ok(Arc::new(fetcher))
        }
        TransferSource::BlockCypher { chain } => {
            let mut fetcher = BlockCypherFetcher::new(&network.name, chain, client);
            if let Some(url) = &endpoints.blockcypher {
                fetcher = fetcher.with_base_url(url);
            }
            Ok(Arc::new(fetcher))
        }
        TransferSource::Etherscan => {
            let api_key = settings.etherscan_api_key.clone().ok_or_else(|| {
                anyhow!(
                    "{} requires an Etherscan API key (credentials.etherscan_api_key or ETHERSCAN_API_KEY)",
                    network.name
                )
            })?;
            let mut fetcher = EtherscanFetcher::new(&network.name, client, api_key);
            if let Some(url) = &endpoints.etherscan {
                fetcher = fetcher.with_base_url(url);
            }
            Ok(Arc::new(fetcher))
        }
    }
}
