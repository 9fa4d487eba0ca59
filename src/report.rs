//! CSV rendering of result records.

use std::io::Write;

use anyhow::{Context, Result};
use csv::Writer;
use rust_decimal::Decimal;

use crate::models::ResultRecord;

pub const TRANSACTION_HEADER: [&str; 8] = [
    "Coin",
    "Code",
    "Date",
    "Price",
    "Amount",
    "Value When Received",
    "Address",
    "Transaction",
];

pub const SUMMARY_HEADER: [&str; 8] = [
    "Coin",
    "Code",
    "Address",
    "Currency",
    "Current Price",
    "Amount",
    "Value",
    "Value When Received",
];

/// Renders a decimal without trailing zeros.
fn decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Writes one row per valued transaction across all records.
pub fn write_transactions<W: Write>(writer: W, records: &[ResultRecord]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(TRANSACTION_HEADER)
        .context("Failed to write CSV header")?;

    for record in records {
        let network = &record.network;
        for tx in &record.transactions {
            wtr.write_record([
                network.name.clone(),
                network.code.clone(),
                tx.transfer.date.format("%Y-%m-%d").to_string(),
                decimal(tx.price),
                decimal(tx.amount),
                decimal(tx.value_when_received),
                network.address_link(&tx.transfer.address),
                network.transaction_link(&tx.transfer.hash),
            ])
            .with_context(|| format!("Failed to write row for {}", tx.transfer.hash))?;
        }
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Writes one totals row per record.
pub fn write_summary<W: Write>(writer: W, records: &[ResultRecord]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(SUMMARY_HEADER)
        .context("Failed to write CSV header")?;

    for record in records {
        wtr.write_record([
            record.network.name.clone(),
            record.network.code.clone(),
            record.group.to_string(),
            record.currency.clone(),
            decimal(record.current_price),
            decimal(record.totals.amount),
            decimal(record.totals.value),
            decimal(record.totals.value_when_received),
        ])
        .context("Failed to write summary row")?;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Orders records so output is stable across runs.
pub fn sort_records(records: &mut [ResultRecord]) {
    records.sort_by(|a, b| {
        (&a.network.name, a.group.to_string(), &a.currency)
            .cmp(&(&b.network.name, b.group.to_string(), &b.currency))
    });
}
