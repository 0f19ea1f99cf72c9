//! Token model: an on-chain address plus optionally-resolved decimals.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use alloy_primitives::Address;
use anyhow::{Context, Result};

/// A token identified by its address. `decimals` stays `None` until
/// resolved externally (resolution via eth_call is out of scope here).
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub address: Address,
    pub decimals: Option<u8>,
}

impl Token {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            decimals: None,
        }
    }

    /// Used where decimals are already known, which avoids on-chain lookups.
    pub fn with_decimals(address: Address, decimals: u8) -> Self {
        Self {
            address,
            decimals: Some(decimals),
        }
    }

    /// Parse from a raw address string (checksummed or lowercase hex).
    pub fn parse(address: &str) -> Result<Self> {
        let address = address
            .parse::<Address>()
            .with_context(|| format!("invalid token address: {address}"))?;
        Ok(Self::new(address))
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.decimals == other.decimals
    }
}

impl Eq for Token {}

// Ordered by address alone so sorts stay deterministic while decimals
// are unresolved.
impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address
            .to_checksum(None)
            .cmp(&other.address.to_checksum(None))
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Hash must stay keyed on the address only, matching the ordering.
impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address.to_checksum(None))
    }
}
