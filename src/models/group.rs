use std::fmt;

/// The addresses covered by a single fetch: one address, or every configured
/// address of a network whose API accepts batches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressGroup {
    pub network: String,
    pub addresses: Vec<String>,
}

impl AddressGroup {
    pub fn new(network: impl Into<String>, addresses: Vec<String>) -> Self {
        Self {
            network: network.into(),
            addresses,
        }
    }

    pub fn single(network: impl Into<String>, address: impl Into<String>) -> Self {
        Self::new(network, vec![address.into()])
    }

    /// First address of the group, used when a transfer cannot be attributed
    /// to a specific member.
    pub fn primary(&self) -> &str {
        self.addresses.first().map(String::as_str).unwrap_or_default()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.iter().any(|a| a == address)
    }
}

impl fmt::Display for AddressGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addresses.join("|"))
    }
}
