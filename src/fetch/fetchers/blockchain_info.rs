//! Bitcoin transfers from blockchain.info's `multiaddr` endpoint.
//!
//! One request covers every address of the group. Responses report the total
//! transaction count for the whole set (`wallet.n_tx`), and results are paged
//! with `offset`/`n`.

use reqwest::Client;
use serde::Deserialize;

use crate::fetch::{fetch_all_pages, get_json, FetchError, Page, PagedSource, TransferFetcher};
use crate::models::{AddressGroup, RawTransfer};

const BLOCKCHAIN_INFO_API_BASE: &str = "https://blockchain.info";

/// Largest page the endpoint will serve.
const DEFAULT_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
struct MultiAddrResponse {
    wallet: Wallet,
    #[serde(default)]
    txs: Vec<MultiAddrTx>,
}

#[derive(Debug, Deserialize)]
struct Wallet {
    n_tx: u64,
}

#[derive(Debug, Deserialize)]
struct MultiAddrTx {
    hash: String,
    time: i64,
    /// Net effect of the transaction on the queried set, in satoshi.
    result: i64,
    #[serde(default)]
    out: Vec<TxOutput>,
}

#[derive(Debug, Deserialize)]
struct TxOutput {
    addr: Option<String>,
}

pub struct BlockchainInfoFetcher {
    network: String,
    client: Client,
    base_url: String,
    page_size: u64,
}

impl BlockchainInfoFetcher {
    pub fn new(network: impl Into<String>, client: Client) -> Self {
        Self {
            network: network.into(),
            client,
            base_url: BLOCKCHAIN_INFO_API_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn to_transfer(
        &self,
        group: &AddressGroup,
        tx: MultiAddrTx,
    ) -> Result<Option<RawTransfer>, FetchError> {
        // Outgoing and zero-value entries carry a non-positive result.
        if tx.result <= 0 {
            return Ok(None);
        }

        let address = tx
            .out
            .iter()
            .filter_map(|o| o.addr.as_deref())
            .find(|addr| group.contains(addr))
            .unwrap_or_else(|| group.primary())
            .to_string();

        let transfer = RawTransfer::from_unix(address, tx.result as u128, tx.time, &tx.hash)
            .ok_or_else(|| {
                FetchError::decode(
                    &self.network,
                    group,
                    format!("transaction {} has invalid time {}", tx.hash, tx.time),
                )
            })?;
        Ok(Some(transfer))
    }
}

#[async_trait::async_trait]
impl PagedSource for BlockchainInfoFetcher {
    /// Number of transactions already consumed.
    type Cursor = u64;

    fn network(&self) -> &str {
        &self.network
    }

    fn first_cursor(&self) -> u64 {
        0
    }

    async fn fetch_page(
        &self,
        group: &AddressGroup,
        offset: &u64,
    ) -> Result<Page<u64>, FetchError> {
        let request = self
            .client
            .get(format!("{}/multiaddr", self.base_url))
            .query(&[
                ("active", group.addresses.join("|")),
                ("n", self.page_size.to_string()),
                ("offset", offset.to_string()),
            ]);

        let response: MultiAddrResponse = get_json(request, &self.network, group).await?;

        let received = response.txs.len() as u64;
        let retrieved = offset + received;

        let mut transfers = Vec::new();
        for tx in response.txs {
            if let Some(transfer) = self.to_transfer(group, tx)? {
                transfers.push(transfer);
            }
        }

        // An empty page with more reported would never advance the offset.
        let next = (received > 0 && retrieved < response.wallet.n_tx).then_some(retrieved);

        Ok(Page { transfers, next })
    }
}

#[async_trait::async_trait]
impl TransferFetcher for BlockchainInfoFetcher {
    fn network(&self) -> &str {
        &self.network
    }

    async fn fetch_inbound(&self, group: &AddressGroup) -> Result<Vec<RawTransfer>, FetchError> {
        fetch_all_pages(self, group).await
    }
}
