use rust_decimal::Decimal;

use super::{AddressGroup, RawTransfer};
use crate::network::NetworkDescriptor;

/// A transfer together with its price on the day it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedTransaction {
    pub transfer: RawTransfer,
    /// Amount in whole coins.
    pub amount: Decimal,
    /// Unit price in the target currency on `transfer.date`.
    pub price: Decimal,
    pub value_when_received: Decimal,
}

impl ValuedTransaction {
    pub fn new(transfer: RawTransfer, amount: Decimal, price: Decimal) -> Self {
        Self {
            transfer,
            amount,
            price,
            value_when_received: amount * price,
        }
    }
}

/// Sums over the valued transactions of one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub amount: Decimal,
    /// `amount` at the current spot price.
    pub value: Decimal,
    pub value_when_received: Decimal,
}

impl Totals {
    pub fn from_transactions(transactions: &[ValuedTransaction], current_price: Decimal) -> Self {
        let amount: Decimal = transactions.iter().map(|tx| tx.amount).sum();
        let value_when_received = transactions.iter().map(|tx| tx.value_when_received).sum();

        Self {
            amount,
            value: amount * current_price,
            value_when_received,
        }
    }
}

/// Valued income for one network, address group and target currency.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub network: NetworkDescriptor,
    pub group: AddressGroup,
    pub currency: String,
    pub current_price: Decimal,
    pub transactions: Vec<ValuedTransaction>,
    pub totals: Totals,
}

impl ResultRecord {
    pub fn new(
        network: NetworkDescriptor,
        group: AddressGroup,
        currency: impl Into<String>,
        current_price: Decimal,
        transactions: Vec<ValuedTransaction>,
    ) -> Self {
        let totals = Totals::from_transactions(&transactions, current_price);
        Self {
            network,
            group,
            currency: currency.into(),
            current_price,
            transactions,
            totals,
        }
    }

    /// Recomputes the totals from the transaction list.
    pub fn recompute_totals(&self) -> Totals {
        Totals::from_transactions(&self.transactions, self.current_price)
    }
}
