//! Static descriptions of the blockchains we know how to fetch from.
//!
//! The registry is built once at startup and handed around by `Arc`; nothing
//! in here is mutable after construction.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

/// Which upstream API (and therefore which pagination policy) serves a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSource {
    /// blockchain.info `multiaddr`, offset-counted, accepts many addresses.
    BlockchainInfo,
    /// BlockCypher address endpoint, paginated by `before` block height.
    BlockCypher { chain: String },
    /// Etherscan `txlist`, one page with the whole account history.
    Etherscan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDescriptor {
    /// Config key, also used as the "Coin" column of the report.
    pub name: String,
    /// Symbol used for price lookups (e.g. "BTC").
    pub code: String,
    /// Number of decimal places between the smallest unit and one coin.
    pub decimals: u32,
    /// Whether one fetch call can cover every configured address.
    pub batch: bool,
    pub source: TransferSource,
    /// Explorer URL with an `{address}` placeholder.
    pub address_url: String,
    /// Explorer URL with a `{hash}` placeholder.
    pub transaction_url: String,
}

impl NetworkDescriptor {
    /// Converts an amount in smallest units to coins without rounding.
    ///
    /// Returns `None` when the amount does not fit in a `Decimal`.
    pub fn convert(&self, amount: u128) -> Option<Decimal> {
        let amount = i128::try_from(amount).ok()?;
        Decimal::try_from_i128_with_scale(amount, self.decimals).ok()
    }

    pub fn address_link(&self, address: &str) -> String {
        self.address_url.replace("{address}", address)
    }

    pub fn transaction_link(&self, hash: &str) -> String {
        self.transaction_url.replace("{hash}", hash)
    }
}

/// Immutable lookup table of supported networks.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    networks: BTreeMap<String, NetworkDescriptor>,
}

impl NetworkRegistry {
    pub fn new(networks: impl IntoIterator<Item = NetworkDescriptor>) -> Self {
        Self {
            networks: networks
                .into_iter()
                .map(|network| (network.name.clone(), network))
                .collect(),
        }
    }

    /// The networks supported out of the box.
    pub fn builtin() -> Self {
        Self::new([
            NetworkDescriptor {
                name: "bitcoin".to_string(),
                code: "BTC".to_string(),
                decimals: 8,
                batch: true,
                source: TransferSource::BlockchainInfo,
                address_url: "https://www.blockchain.com/btc/address/{address}".to_string(),
                transaction_url: "https://www.blockchain.com/btc/tx/{hash}".to_string(),
            },
            NetworkDescriptor {
                name: "litecoin".to_string(),
                code: "LTC".to_string(),
                decimals: 8,
                batch: false,
                source: TransferSource::BlockCypher {
                    chain: "ltc".to_string(),
                },
                address_url: "https://live.blockcypher.com/ltc/address/{address}/".to_string(),
                transaction_url: "https://live.blockcypher.com/ltc/tx/{hash}/".to_string(),
            },
            NetworkDescriptor {
                name: "dogecoin".to_string(),
                code: "DOGE".to_string(),
                decimals: 8,
                batch: false,
                source: TransferSource::BlockCypher {
                    chain: "doge".to_string(),
                },
                address_url: "https://live.blockcypher.com/doge/address/{address}/".to_string(),
                transaction_url: "https://live.blockcypher.com/doge/tx/{hash}/".to_string(),
            },
            NetworkDescriptor {
                name: "ethereum".to_string(),
                code: "ETH".to_string(),
                decimals: 18,
                batch: false,
                source: TransferSource::Etherscan,
                address_url: "https://etherscan.io/address/{address}".to_string(),
                transaction_url: "https://etherscan.io/tx/{hash}".to_string(),
            },
        ])
    }

    pub fn get(&self, name: &str) -> Option<&NetworkDescriptor> {
        self.networks.get(&name.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkDescriptor> {
        self.networks.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.networks.keys().map(String::as_str).collect()
    }
}
