mod group;
mod record;
mod transfer;

pub use group::AddressGroup;
pub use record::{ResultRecord, Totals, ValuedTransaction};
pub use transfer::RawTransfer;
