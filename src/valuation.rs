//! Turns raw transfers into priced transactions and result records.

use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::market_data::{CurrencyPair, PriceError, PriceOracle};
use crate::models::{AddressGroup, RawTransfer, ResultRecord, ValuedTransaction};
use crate::network::NetworkDescriptor;

/// Why a single transfer could not be valued. The transfer is left out of its
/// record; nothing else is affected.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValuationError {
    #[error(transparent)]
    PriceUnavailable(#[from] PriceError),
    #[error("amount {amount} of transfer {hash} does not fit a decimal for {network}")]
    AmountOutOfRange {
        network: String,
        hash: String,
        amount: u128,
    },
}

#[derive(Clone)]
pub struct ValuationEngine {
    oracle: Arc<dyn PriceOracle>,
}

impl ValuationEngine {
    pub fn new(oracle: Arc<dyn PriceOracle>) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &Arc<dyn PriceOracle> {
        &self.oracle
    }

    /// Prices `transfer` at its own date in `currency`.
    pub async fn value_transfer(
        &self,
        transfer: RawTransfer,
        network: &NetworkDescriptor,
        currency: &str,
    ) -> Result<ValuedTransaction, ValuationError> {
        let amount =
            network
                .convert(transfer.amount)
                .ok_or_else(|| ValuationError::AmountOutOfRange {
                    network: network.name.clone(),
                    hash: transfer.hash.clone(),
                    amount: transfer.amount,
                })?;

        let pair = CurrencyPair::new(&network.code, currency);
        let price = self.oracle.spot_price(&pair, Some(transfer.date)).await?;

        Ok(ValuedTransaction::new(transfer, amount, price))
    }

    /// Waits for the current-price lookup already in flight and assembles the
    /// record. Totals cover only the transactions passed in.
    pub async fn build_result<F>(
        &self,
        transactions: Vec<ValuedTransaction>,
        network: &NetworkDescriptor,
        group: &AddressGroup,
        currency: &str,
        current_price: F,
    ) -> Result<ResultRecord, PriceError>
    where
        F: Future<Output = Result<Decimal, PriceError>>,
    {
        let current_price = current_price.await?;
        Ok(ResultRecord::new(
            network.clone(),
            group.clone(),
            currency.to_uppercase(),
            current_price,
            transactions,
        ))
    }
}
