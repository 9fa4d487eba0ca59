use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use incomebook::config::{default_config_path, Config};
use incomebook::fetch::FetcherSettings;
use incomebook::market_data::providers::CoinbaseSpotOracle;
use incomebook::network::NetworkRegistry;
use incomebook::pipeline::Pipeline;
use incomebook::report;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "incomebook")]
#[command(about = "Value crypto received by your addresses at its historical price")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reporting currency (repeatable); overrides the config file
    #[arg(long = "currency")]
    currencies: Vec<String>,

    /// Write the CSV report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also print per-record totals to stderr
    #[arg(long)]
    summary: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    // An explicit path must exist; the default one may not.
    let (config_path, loaded) = match &cli.config {
        Some(path) => (path.clone(), Config::load(path)),
        None => {
            let path = default_config_path();
            let loaded = Config::load_or_default(&path);
            (path, loaded)
        }
    };
    let mut config = loaded
        .with_context(|| format!("Failed to load incomebook config: {}", config_path.display()))?;
    if config.addresses.is_empty() {
        tracing::warn!(config = %config_path.display(), "no addresses configured");
    }
    if !cli.currencies.is_empty() {
        config.reporting_currencies = cli.currencies.clone();
    }

    let registry = Arc::new(NetworkRegistry::builtin());
    let plan = config.network_addresses(&registry)?;
    let currencies = config.currencies()?;

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let mut oracle = CoinbaseSpotOracle::with_client(client.clone());
    if let Some(url) = &config.endpoints.coinbase {
        oracle = oracle.with_base_url(url);
    }

    let mut settings = FetcherSettings::new(client).with_endpoints(config.endpoints.clone());
    if let Some(key) = config.etherscan_api_key() {
        settings = settings.with_etherscan_api_key(key);
    }

    let pipeline = Pipeline::from_settings(
        registry.clone(),
        Arc::new(oracle),
        currencies,
        &plan,
        &settings,
    )?;

    tracing::info!(
        config = %config_path.display(),
        networks = plan.len(),
        "starting valuation run"
    );
    let mut outcome = pipeline.run(&plan).await;
    report::sort_records(&mut outcome.records);

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create report: {}", path.display()))?;
            report::write_transactions(BufWriter::new(file), &outcome.records)?;
        }
        None => report::write_transactions(io::stdout().lock(), &outcome.records)?,
    }

    if cli.summary {
        let mut stderr = io::stderr().lock();
        report::write_summary(&mut stderr, &outcome.records)?;
        for failure in &outcome.failures {
            writeln!(stderr, "skipped {} {}: {}", failure.group.network, failure.group, failure.error)?;
        }
        if !outcome.dropped.is_empty() {
            writeln!(stderr, "dropped {} transfer(s) without a price", outcome.dropped.len())?;
        }
    }

    Ok(())
}
