pub mod config;
pub mod fetch;
pub mod market_data;
pub mod models;
pub mod network;
pub mod pipeline;
pub mod report;
pub mod valuation;
