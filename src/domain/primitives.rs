//! Domain primitives: Address, PoolId, BlockNumber, Timestamp.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const ADDRESS_BYTES: usize = 20;
const POOL_ID_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("missing 0x prefix: {0}")]
    MissingPrefix(String),
    #[error("invalid hex in {0}")]
    InvalidHex(String),
    #[error("expected {expected} bytes, got {actual}: {value}")]
    InvalidLength {
        value: String,
        expected: usize,
        actual: usize,
    },
}

/// Decode `0x`-prefixed hex of an exact byte length into its canonical
/// lowercase form.
fn canonical_hex(value: &str, expected: usize) -> Result<String, AddressParseError> {
    let trimmed = value.trim();
    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| AddressParseError::MissingPrefix(value.to_string()))?;
    let bytes =
        hex::decode(payload).map_err(|_| AddressParseError::InvalidHex(value.to_string()))?;
    if bytes.len() != expected {
        return Err(AddressParseError::InvalidLength {
            value: value.to_string(),
            expected,
            actual: bytes.len(),
        });
    }
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Token or contract address, stored as lowercase `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and canonicalize a 20-byte hex address.
    pub fn parse(value: &str) -> Result<Self, AddressParseError> {
        canonical_hex(value, ADDRESS_BYTES).map(Address)
    }

    /// The all-zero address.
    pub fn zero() -> Self {
        Address(format!("0x{}", "0".repeat(ADDRESS_BYTES * 2)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vault pool id: 32 bytes whose leading 20 bytes are the pool's own address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PoolId(String);

impl PoolId {
    pub fn parse(value: &str) -> Result<Self, AddressParseError> {
        canonical_hex(value, POOL_ID_BYTES).map(PoolId)
    }

    /// Address of the pool's share token, encoded in the id itself.
    pub fn pool_address(&self) -> Address {
        // "0x" + 40 hex chars
        Address(self.0[..2 + ADDRESS_BYTES * 2].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PoolId {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoolId::parse(s)
    }
}

impl TryFrom<String> for PoolId {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PoolId::parse(&value)
    }
}

impl From<PoolId> for String {
    fn from(value: PoolId) -> Self {
        value.0
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chain height at which an event was observed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockNumber(pub u64);

impl BlockNumber {
    pub fn new(n: u64) -> Self {
        BlockNumber(n)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block timestamp in seconds since Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn new(secs: i64) -> Self {
        Timestamp(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Index of the `period_secs`-wide bucket containing this timestamp.
    pub fn bucket_index(&self, period_secs: i64) -> i64 {
        self.0.div_euclid(period_secs)
    }

    /// Start of the `period_secs`-wide bucket containing this timestamp.
    pub fn bucket_start(&self, period_secs: i64) -> Timestamp {
        Timestamp(self.bucket_index(period_secs) * period_secs)
    }
}
