use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;

use crate::network::NetworkRegistry;

/// Environment variable consulted when the config has no Etherscan key.
pub const ETHERSCAN_API_KEY_ENV: &str = "ETHERSCAN_API_KEY";

fn default_reporting_currencies() -> Vec<String> {
    vec!["USD".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Addresses configured for one network: a single address or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AddressSpec {
    One(String),
    Many(Vec<String>),
}

impl AddressSpec {
    pub fn addresses(&self) -> Vec<String> {
        match self {
            Self::One(address) => vec![address.trim().to_string()],
            Self::Many(addresses) => addresses.iter().map(|a| a.trim().to_string()).collect(),
        }
    }
}

/// API credentials for upstream sources.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub etherscan_api_key: Option<SecretString>,
}

/// Base URL overrides for upstream APIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub coinbase: Option<String>,
    pub blockchain_info: Option<String>,
    pub blockcypher: Option<String>,
    pub etherscan: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fiat currencies to value transfers in (e.g. "USD").
    #[serde(default = "default_reporting_currencies")]
    pub reporting_currencies: Vec<String>,

    /// Upper bound on any single upstream request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Network name -> address or addresses.
    pub addresses: BTreeMap<String, AddressSpec>,

    pub credentials: Credentials,

    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reporting_currencies: default_reporting_currencies(),
            request_timeout_secs: default_request_timeout_secs(),
            addresses: BTreeMap::new(),
            credentials: Credentials::default(),
            endpoints: Endpoints::default(),
        }
    }
}

/// Validated addresses for one supported network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddresses {
    pub network: String,
    pub addresses: Vec<String>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reporting currencies, upper-cased and de-duplicated in order.
    pub fn currencies(&self) -> Result<Vec<String>> {
        let mut currencies: Vec<String> = Vec::new();
        for currency in &self.reporting_currencies {
            let currency = currency.trim().to_uppercase();
            if currency.is_empty() {
                bail!("reporting_currencies contains an empty currency code");
            }
            if !currencies.contains(&currency) {
                currencies.push(currency);
            }
        }
        if currencies.is_empty() {
            bail!("reporting_currencies must name at least one currency");
        }
        Ok(currencies)
    }

    /// Validates the address table against the supported networks.
    pub fn network_addresses(&self, registry: &NetworkRegistry) -> Result<Vec<NetworkAddresses>> {
        let mut networks: Vec<NetworkAddresses> = Vec::new();

        for (name, spec) in &self.addresses {
            let Some(network) = registry.get(name) else {
                bail!(
                    "Unsupported network {name:?} (supported: {})",
                    registry.names().join(", ")
                );
            };
            // Network names match case-insensitively, table keys do not.
            if networks.iter().any(|n| n.network == network.name) {
                bail!(
                    "Network {name:?} is configured more than once (as {:?})",
                    network.name
                );
            }

            let mut addresses: Vec<String> = Vec::new();
            for address in spec.addresses() {
                if address.is_empty() {
                    bail!("Network {name:?} has a blank address");
                }
                if !addresses.contains(&address) {
                    addresses.push(address);
                }
            }
            if addresses.is_empty() {
                bail!("Network {name:?} has no addresses");
            }

            networks.push(NetworkAddresses {
                network: network.name.clone(),
                addresses,
            });
        }

        Ok(networks)
    }

    /// Etherscan key from the config, falling back to the environment.
    pub fn etherscan_api_key(&self) -> Option<SecretString> {
        self.credentials.etherscan_api_key.clone().or_else(|| {
            std::env::var(ETHERSCAN_API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from)
        })
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./incomebook.toml` if it exists in current directory
/// 2. `incomebook/incomebook.toml` under the XDG config directory
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("incomebook.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("incomebook").join("incomebook.toml");
    }

    local_config
}
