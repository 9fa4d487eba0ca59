//! Transfers from BlockCypher's address endpoint (Litecoin, Dogecoin).
//!
//! Pages are linked by block height: when a response sets `hasMore`, the next
//! request passes `before=<highest block height on the page>`. Consecutive
//! pages can overlap, so references are de-duplicated by output.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::fetch::{fetch_all_pages, get_json, FetchError, Page, PagedSource, TransferFetcher};
use crate::models::{AddressGroup, RawTransfer};

const BLOCKCYPHER_API_BASE: &str = "https://api.blockcypher.com";

const DEFAULT_PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
struct AddressResponse {
    #[serde(rename = "hasMore", default)]
    has_more: bool,
    #[serde(default)]
    txrefs: Vec<TxRef>,
}

#[derive(Debug, Deserialize)]
struct TxRef {
    tx_hash: String,
    block_height: u64,
    /// -1 for input references.
    #[serde(default)]
    tx_output_n: Option<i64>,
    value: u64,
    /// Only present on outputs.
    spent: Option<bool>,
    confirmed: DateTime<Utc>,
}

pub struct BlockCypherFetcher {
    network: String,
    chain: String,
    client: Client,
    base_url: String,
    page_size: u32,
}

impl BlockCypherFetcher {
    /// `chain` is BlockCypher's coin path segment, e.g. "ltc" or "doge".
    pub fn new(network: impl Into<String>, chain: impl Into<String>, client: Client) -> Self {
        Self {
            network: network.into(),
            chain: chain.into(),
            client,
            base_url: BLOCKCYPHER_API_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// Continuation state between BlockCypher pages.
#[derive(Clone, Default)]
pub struct HeightCursor {
    /// `before` block height; `None` on the first request.
    before: Option<u64>,
    /// Outputs already collected, keyed by transaction hash and output index.
    seen: HashSet<(String, Option<i64>)>,
}

impl fmt::Debug for HeightCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeightCursor")
            .field("before", &self.before)
            .field("seen", &self.seen.len())
            .finish()
    }
}

/// Unspent references not collected yet become transfers; everything else is
/// dropped.
fn inbound_transfers(
    address: &str,
    txrefs: &[TxRef],
    seen: &mut HashSet<(String, Option<i64>)>,
) -> Vec<RawTransfer> {
    txrefs
        .iter()
        .filter(|r| r.spent == Some(false))
        .filter(|r| seen.insert((r.tx_hash.clone(), r.tx_output_n)))
        .map(|r| RawTransfer::new(address, u128::from(r.value), r.confirmed, &r.tx_hash))
        .collect()
}

#[async_trait::async_trait]
impl PagedSource for BlockCypherFetcher {
    type Cursor = HeightCursor;

    fn network(&self) -> &str {
        &self.network
    }

    fn first_cursor(&self) -> HeightCursor {
        HeightCursor::default()
    }

    async fn fetch_page(
        &self,
        group: &AddressGroup,
        cursor: &HeightCursor,
    ) -> Result<Page<HeightCursor>, FetchError> {
        let address = group.primary();
        let mut request = self
            .client
            .get(format!(
                "{}/v1/{}/main/addrs/{}",
                self.base_url, self.chain, address
            ))
            .query(&[("limit", self.page_size.to_string())]);
        if let Some(height) = cursor.before {
            request = request.query(&[("before", height.to_string())]);
        }

        let response: AddressResponse = get_json(request, &self.network, group).await?;

        let mut seen = cursor.seen.clone();
        let transfers = inbound_transfers(address, &response.txrefs, &mut seen);

        // Without references there is no height to continue from.
        let max_height = response.txrefs.iter().map(|r| r.block_height).max();
        let next = match max_height {
            Some(height) if response.has_more => {
                if cursor.before.is_some_and(|before| height >= before) {
                    tracing::warn!(
                        network = %self.network,
                        address = %group,
                        before = ?cursor.before,
                        height,
                        "block height cursor did not advance, stopping"
                    );
                    None
                } else {
                    Some(HeightCursor {
                        before: Some(height),
                        seen,
                    })
                }
            }
            _ => None,
        };

        Ok(Page { transfers, next })
    }
}

#[async_trait::async_trait]
impl TransferFetcher for BlockCypherFetcher {
    fn network(&self) -> &str {
        &self.network
    }

    async fn fetch_inbound(&self, group: &AddressGroup) -> Result<Vec<RawTransfer>, FetchError> {
        fetch_all_pages(self, group).await
    }
}
