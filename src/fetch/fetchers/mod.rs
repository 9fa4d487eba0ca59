//! Per-network transfer fetchers.

mod blockchain_info;
mod blockcypher;
mod etherscan;

pub use blockchain_info::BlockchainInfoFetcher;
pub use blockcypher::BlockCypherFetcher;
pub use etherscan::EtherscanFetcher;
