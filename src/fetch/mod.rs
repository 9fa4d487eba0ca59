//! Retrieval of inbound transfers from chain explorers.
//!
//! Every network has its own pagination contract. Each variant implements
//! [`PagedSource`] with its own cursor type and [`fetch_all_pages`] drives
//! them all with the same loop.

mod factory;
pub mod fetchers;
mod paging;

pub use factory::{create_fetcher, FetcherSettings};
pub use paging::{fetch_all_pages, Page, PagedSource};

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::models::{AddressGroup, RawTransfer};

/// Failure to retrieve transfers for one address group.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{network} request for {address} failed: {source}")]
    Transport {
        network: String,
        address: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{network} returned {status} for {address}: {body}")]
    Status {
        network: String,
        address: String,
        status: u16,
        body: String,
    },
    #[error("malformed {network} response for {address}: {message}")]
    Decode {
        network: String,
        address: String,
        message: String,
    },
    #[error("{network} API error for {address}: {message}")]
    Api {
        network: String,
        address: String,
        message: String,
    },
}

impl FetchError {
    pub fn decode(network: &str, group: &AddressGroup, message: impl Into<String>) -> Self {
        Self::Decode {
            network: network.to_string(),
            address: group.to_string(),
            message: message.into(),
        }
    }

    pub fn api(network: &str, group: &AddressGroup, message: impl Into<String>) -> Self {
        Self::Api {
            network: network.to_string(),
            address: group.to_string(),
            message: message.into(),
        }
    }

    /// Network the failed request was made for.
    pub fn network(&self) -> &str {
        match self {
            Self::Transport { network, .. }
            | Self::Status { network, .. }
            | Self::Decode { network, .. }
            | Self::Api { network, .. } => network,
        }
    }
}

/// Retrieves every inbound transfer for an address group on one network.
#[async_trait::async_trait]
pub trait TransferFetcher: Send + Sync {
    /// Name of the network this fetcher serves.
    fn network(&self) -> &str;

    /// Returns the inbound transfers, oldest page first. An address that never
    /// received anything yields an empty vector.
    async fn fetch_inbound(&self, group: &AddressGroup) -> Result<Vec<RawTransfer>, FetchError>;
}

/// Sends a GET request and decodes the JSON body, attributing any failure to
/// `network` and `group`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    network: &str,
    group: &AddressGroup,
) -> Result<T, FetchError> {
    let transport = |source: reqwest::Error| FetchError::Transport {
        network: network.to_string(),
        address: group.to_string(),
        source,
    };

    let response = request
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(transport)?;
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    if !status.is_success() {
        return Err(FetchError::Status {
            network: network.to_string(),
            address: group.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| FetchError::decode(network, group, e.to_string()))
}

/// Parses an amount given as a decimal integer string (e.g. wei) without
/// going through floating point.
pub(crate) fn parse_amount(value: &str) -> Result<u128, String> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("amount {value:?} is not a non-negative integer"));
    }
    value
        .parse::<u128>()
        .map_err(|e| format!("amount {value:?} out of range: {e}"))
}
