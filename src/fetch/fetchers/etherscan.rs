//! Ether transfers from Etherscan's `txlist` account endpoint.
//!
//! A single request returns the whole history of the address, in and out.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::fetch::{
    fetch_all_pages, get_json, parse_amount, FetchError, Page, PagedSource, TransferFetcher,
};
use crate::models::{AddressGroup, RawTransfer};

const ETHERSCAN_API_BASE: &str = "https://api.etherscan.io";

/// Message Etherscan pairs with `status: "0"` for an account with no history.
const NO_TRANSACTIONS: &str = "No transactions found";

#[derive(Debug, Deserialize)]
struct TxListResponse {
    status: String,
    message: String,
    /// A list on success, an error string otherwise.
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountTx {
    hash: String,
    time_stamp: String,
    /// Empty or null for contract creations.
    #[serde(default)]
    to: Option<String>,
    /// Wei, as a decimal string.
    value: String,
    /// "1" when execution reverted and no value moved.
    #[serde(default)]
    is_error: Option<String>,
    /// "0" for a failed receipt; empty before Byzantium.
    #[serde(rename = "txreceipt_status", default)]
    txreceipt_status: Option<String>,
}

impl AccountTx {
    fn failed(&self) -> bool {
        self.is_error.as_deref() == Some("1") || self.txreceipt_status.as_deref() == Some("0")
    }
}

pub struct EtherscanFetcher {
    network: String,
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl EtherscanFetcher {
    pub fn new(network: impl Into<String>, client: Client, api_key: SecretString) -> Self {
        Self {
            network: network.into(),
            client,
            api_key,
            base_url: ETHERSCAN_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn parse(
        &self,
        group: &AddressGroup,
        response: TxListResponse,
    ) -> Result<Vec<RawTransfer>, FetchError> {
        if response.status != "1" {
            if response.message == NO_TRANSACTIONS {
                return Ok(Vec::new());
            }
            let detail = match &response.result {
                serde_json::Value::String(s) => format!("{}: {s}", response.message),
                _ => response.message.clone(),
            };
            return Err(FetchError::api(&self.network, group, detail));
        }

        let txs: Vec<AccountTx> = serde_json::from_value(response.result)
            .map_err(|e| FetchError::decode(&self.network, group, e.to_string()))?;

        let address = group.primary();
        let mut transfers = Vec::new();
        for tx in txs {
            // Hex addresses differ only in checksum casing.
            let inbound = tx
                .to
                .as_deref()
                .is_some_and(|to| to.eq_ignore_ascii_case(address));
            if !inbound || tx.failed() {
                continue;
            }

            let amount = parse_amount(&tx.value)
                .map_err(|e| FetchError::decode(&self.network, group, e))?;
            if amount == 0 {
                continue;
            }

            let seconds: i64 = tx.time_stamp.trim().parse().map_err(|_| {
                FetchError::decode(
                    &self.network,
                    group,
                    format!("transaction {} has invalid timeStamp {:?}", tx.hash, tx.time_stamp),
                )
            })?;
            let transfer = RawTransfer::from_unix(address, amount, seconds, &tx.hash)
                .ok_or_else(|| {
                    FetchError::decode(
                        &self.network,
                        group,
                        format!("transaction {} has out of range timeStamp", tx.hash),
                    )
                })?;
            transfers.push(transfer);
        }

        Ok(transfers)
    }
}

#[async_trait::async_trait]
impl PagedSource for EtherscanFetcher {
    type Cursor = ();

    fn network(&self) -> &str {
        &self.network
    }

    fn first_cursor(&self) -> Self::Cursor {}

    async fn fetch_page(&self, group: &AddressGroup, _cursor: &()) -> Result<Page<()>, FetchError> {
        let request = self.client.get(format!("{}/api", self.base_url)).query(&[
            ("module", "account"),
            ("action", "txlist"),
            ("address", group.primary()),
            ("startblock", "0"),
            ("endblock", "99999999"),
            ("sort", "asc"),
            ("apikey", self.api_key.expose_secret()),
        ]);

        let response: TxListResponse = get_json(request, &self.network, group).await?;
        Ok(Page::last(self.parse(group, response)?))
    }
}

#[async_trait::async_trait]
impl TransferFetcher for EtherscanFetcher {
    fn network(&self) -> &str {
        &self.network
    }

    async fn fetch_inbound(&self, group: &AddressGroup) -> Result<Vec<RawTransfer>, FetchError> {
        fetch_all_pages(self, group).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe";

    fn fetcher() -> EtherscanFetcher {
        EtherscanFetcher::new("ethereum", Client::new(), SecretString::from("key".to_string()))
    }

    fn group() -> AddressGroup {
        AddressGroup::single("ethereum", ADDRESS)
    }

    fn parse(json: &str) -> Result<Vec<RawTransfer>, FetchError> {
        let response: TxListResponse = serde_json::from_str(json).unwrap();
        fetcher().parse(&group(), response)
    }

    #[test]
    fn test_keeps_only_inbound_entries() {
        let transfers = parse(
            r#"{
                "status": "1",
                "message": "OK",
                "result": [
                    {
                        "hash": "0xin",
                        "timeStamp": "1700000000",
                        "from": "0x1111111111111111111111111111111111111111",
                        "to": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
                        "value": "1500000000000000000"
                    },
                    {
                        "hash": "0xout",
                        "timeStamp": "1700000100",
                        "from": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
                        "to": "0x2222222222222222222222222222222222222222",
                        "value": "500000000000000000"
                    },
                    {
                        "hash": "0xzero",
                        "timeStamp": "1700000200",
                        "from": "0x1111111111111111111111111111111111111111",
                        "to": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
                        "value": "0"
                    },
                    {
                        "hash": "0xcreate",
                        "timeStamp": "1700000300",
                        "from": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
                        "to": "",
                        "value": "0"
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].hash, "0xin");
        assert_eq!(transfers[0].amount, 1_500_000_000_000_000_000);
        assert_eq!(transfers[0].address, ADDRESS);
    }

    #[test]
    fn test_reverted_transfers_are_not_income() {
        let transfers = parse(
            r#"{
                "status": "1",
                "message": "OK",
                "result": [
                    {
                        "hash": "0xreverted",
                        "timeStamp": "1700000000",
                        "to": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
                        "value": "5000000000000000000",
                        "isError": "1",
                        "txreceipt_status": "0"
                    },
                    {
                        "hash": "0xfailedreceipt",
                        "timeStamp": "1700000100",
                        "to": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
                        "value": "1000000000000000000",
                        "isError": "0",
                        "txreceipt_status": "0"
                    },
                    {
                        "hash": "0xok",
                        "timeStamp": "1700000200",
                        "to": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
                        "value": "2000000000000000000",
                        "isError": "0",
                        "txreceipt_status": "1"
                    },
                    {
                        "hash": "0xlegacy",
                        "timeStamp": "1400000000",
                        "to": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
                        "value": "3000000000000000000",
                        "isError": "0",
                        "txreceipt_status": ""
                    }
                ]
            }"#,
        )
        .unwrap();

        let hashes: Vec<_> = transfers.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xok", "0xlegacy"]);
    }

    #[test]
    fn test_no_transactions_is_empty_not_an_error() {
        let transfers =
            parse(r#"{"status": "0", "message": "No transactions found", "result": []}"#).unwrap();
        assert!(transfers.is_empty());
    }

    #[test]
    fn test_api_error_is_reported() {
        let err = parse(r#"{"status": "0", "message": "NOTOK", "result": "Invalid API Key"}"#)
            .unwrap_err();
        assert!(matches!(err, FetchError::Api { .. }));
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[test]
    fn test_fractional_value_is_a_decode_error() {
        let err = parse(
            r#"{"status": "1", "message": "OK", "result": [
                {"hash": "0x1", "timeStamp": "1700000000", "to": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae", "value": "1.5"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }
}
