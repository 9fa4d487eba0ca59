pub mod coinbase;

pub use coinbase::CoinbaseSpotOracle;
