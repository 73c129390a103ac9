//! Vault events driving price and liquidity updates.

use crate::domain::{Address, BlockNumber, Decimal, PoolId, PoolType, Timestamp, TokenPrice};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable unique identifier of an event, used to apply each event once.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey(String);

impl EventKey {
    /// Key derived from the on-chain log position.
    pub fn from_log(tx_hash: &str, log_index: u64) -> Self {
        EventKey(format!("log:{}-{}", tx_hash.to_lowercase(), log_index))
    }

    /// Key derived from a hash of the event contents.
    ///
    /// Decimals are hashed in canonical text form, so amounts differing in
    /// any digit get distinct keys. Two identical events in the same block
    /// share a key and the second is treated as a replay; sources that can
    /// emit such pairs must key by log position instead.
    pub fn from_contents(block: BlockNumber, timestamp: Timestamp, kind: &EventKind) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(block.as_u64().to_le_bytes());
        hasher.update(timestamp.as_secs().to_le_bytes());
        hash_kind(&mut hasher, kind);
        let hash = hasher.finalize();
        EventKey(format!("hash:{}", hex::encode(&hash[..16])))
    }

    pub fn from_stored(value: String) -> Self {
        EventKey(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Feed one field followed by a separator, so adjacent fields never merge.
fn hash_field(hasher: &mut Sha256, field: &str) {
    hasher.update(field.as_bytes());
    hasher.update([0x1f]);
}

fn hash_kind(hasher: &mut Sha256, kind: &EventKind) {
    hash_field(hasher, kind.name());
    match kind {
        EventKind::PoolRegistered {
            pool_id,
            pool_type,
            tokens,
        } => {
            hash_field(hasher, pool_id.as_str());
            hash_field(hasher, pool_type.as_str());
            hasher.update((tokens.len() as u64).to_le_bytes());
            for token in tokens {
                hash_field(hasher, token.as_str());
            }
        }
        EventKind::PriceObserved(price) => {
            hash_field(hasher, price.asset.as_str());
            hash_field(hasher, price.pricing_asset.as_str());
            hasher.update(price.block.as_u64().to_le_bytes());
            hash_field(hasher, price.pool_id.as_str());
            hash_field(hasher, &price.price.to_canonical_string());
        }
        EventKind::PoolBalanceChanged {
            pool_id,
            deltas,
            shares_delta,
        } => {
            hash_field(hasher, pool_id.as_str());
            hasher.update((deltas.len() as u64).to_le_bytes());
            for (token, delta) in deltas {
                hash_field(hasher, token.as_str());
                hash_field(hasher, &delta.to_canonical_string());
            }
            hash_field(hasher, &shares_delta.to_canonical_string());
        }
        EventKind::Swap {
            pool_id,
            token_in,
            amount_in,
            token_out,
            amount_out,
        } => {
            hash_field(hasher, pool_id.as_str());
            hash_field(hasher, token_in.as_str());
            hash_field(hasher, &amount_in.to_canonical_string());
            hash_field(hasher, token_out.as_str());
            hash_field(hasher, &amount_out.to_canonical_string());
        }
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A pool was registered with the vault.
    PoolRegistered {
        pool_id: PoolId,
        pool_type: PoolType,
        tokens: Vec<Address>,
    },
    /// A price was recorded for an asset against a pricing asset.
    PriceObserved(TokenPrice),
    /// Join or exit: signed balance deltas per token, plus minted (positive)
    /// or burned (negative) shares.
    PoolBalanceChanged {
        pool_id: PoolId,
        deltas: Vec<(Address, Decimal)>,
        shares_delta: Decimal,
    },
    Swap {
        pool_id: PoolId,
        token_in: Address,
        amount_in: Decimal,
        token_out: Address,
        amount_out: Decimal,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PoolRegistered { .. } => "pool_registered",
            EventKind::PriceObserved(_) => "price_observed",
            EventKind::PoolBalanceChanged { .. } => "pool_balance_changed",
            EventKind::Swap { .. } => "swap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEvent {
    pub key: EventKey,
    pub block: BlockNumber,
    pub timestamp: Timestamp,
    pub kind: EventKind,
}

impl VaultEvent {
    /// Create an event keyed by its contents.
    pub fn new(block: BlockNumber, timestamp: Timestamp, kind: EventKind) -> Self {
        let key = EventKey::from_contents(block, timestamp, &kind);
        Self {
            key,
            block,
            timestamp,
            kind,
        }
    }

    /// Replace the content key with the originating log position.
    pub fn with_log_position(mut self, tx_hash: &str, log_index: u64) -> Self {
        self.key = EventKey::from_log(tx_hash, log_index);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap() -> EventKind {
        swap_with_amount_in(Decimal::from(3))
    }

    fn swap_with_amount_in(amount_in: Decimal) -> EventKind {
        EventKind::Swap {
            pool_id: PoolId::parse(
                "0x5c6ee304399dbdb9c8ef030ab642b10820db8f56000200000000000000000014",
            )
            .unwrap(),
            token_in: Address::parse("0xba100000625a3754423978a60c9317c58a424e3d").unwrap(),
            amount_in,
            token_out: Address::parse("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2").unwrap(),
            amount_out: Decimal::from(1),
        }
    }

    #[test]
    fn test_content_key_is_deterministic() {
        let a = VaultEvent::new(BlockNumber::new(10), Timestamp::new(1000), swap());
        let b = VaultEvent::new(BlockNumber::new(10), Timestamp::new(1000), swap());
        assert_eq!(a.key, b.key);
        assert!(a.key.as_str().starts_with("hash:"));

        let c = VaultEvent::new(BlockNumber::new(11), Timestamp::new(1000), swap());
        assert_ne!(a.key, c.key);
    }

    #[test]
    fn test_content_key_distinguishes_full_precision_amounts() {
        let a = Decimal::from_str_canonical("1.0000000000000000001").unwrap();
        let b = Decimal::from_str_canonical("1.0000000000000000002").unwrap();
        let key = |amount| {
            EventKey::from_contents(
                BlockNumber::new(10),
                Timestamp::new(1000),
                &swap_with_amount_in(amount),
            )
        };
        assert_ne!(key(a), key(b));
        // Trailing zeros do not change the canonical form.
        let c = Decimal::from_str_canonical("1.00000000000000000010").unwrap();
        assert_eq!(key(a), key(c));
    }

    #[test]
    fn test_identical_events_share_content_key_until_log_keyed() {
        let first = VaultEvent::new(BlockNumber::new(10), Timestamp::new(1000), swap());
        let second = VaultEvent::new(BlockNumber::new(10), Timestamp::new(1000), swap());
        assert_eq!(first.key, second.key);

        let first = first.with_log_position("0xabcd", 0);
        let second = second.with_log_position("0xabcd", 1);
        assert_ne!(first.key, second.key);
    }

    #[test]
    fn test_content_key_separates_adjacent_fields() {
        let pool_id = PoolId::parse(
            "0x5c6ee304399dbdb9c8ef030ab642b10820db8f56000200000000000000000014",
        )
        .unwrap();
        let token = Address::parse("0xba100000625a3754423978a60c9317c58a424e3d").unwrap();
        let change = |deltas: Vec<(Address, Decimal)>, shares: i64| {
            EventKind::PoolBalanceChanged {
                pool_id: pool_id.clone(),
                deltas,
                shares_delta: Decimal::from(shares),
            }
        };
        // "1" + "23" and "12" + "3" concatenate to the same digits.
        let a = change(vec![(token.clone(), Decimal::from(1))], 23);
        let b = change(vec![(token, Decimal::from(12))], 3);
        let block = BlockNumber::new(1);
        let ts = Timestamp::new(12);
        assert_ne!(
            EventKey::from_contents(block, ts, &a),
            EventKey::from_contents(block, ts, &b)
        );
    }

    #[test]
    fn test_log_position_key() {
        let event = VaultEvent::new(BlockNumber::new(10), Timestamp::new(1000), swap())
            .with_log_position("0xABCD", 7);
        assert_eq!(event.key.as_str(), "log:0xabcd-7");
    }

    #[test]
    fn test_event_kind_serializes_with_tag() {
        let json = serde_json::to_value(swap()).unwrap();
        assert_eq!(json["type"], "swap");
        assert_eq!(swap().name(), "swap");
    }
}
