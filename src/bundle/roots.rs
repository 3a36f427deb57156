use crate::core::chain::{BlockRange, ChainId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 32-byte Merkle root, hex-serialized with a `0x` prefix.
pub type MerkleRoot = [u8; 32];

mod root_serde {
    use super::MerkleRoot;
    use serde::de;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(root: &MerkleRoot, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(root)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MerkleRoot, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let stripped = raw.strip_prefix("0x").unwrap_or(&raw);
        let bytes = hex::decode(stripped)
            .map_err(|e| de::Error::custom(format!("invalid hex root: {e}")))?;
        bytes
            .try_into()
            .map_err(|_| de::Error::custom("root must be exactly 32 bytes"))
    }
}

/// An executed settlement proposal.
///
/// Carries the three Merkle roots committed on the hub, the per-chain
/// block windows the proposal covered, and how many pool rebalance
/// leaves remain unclaimed. The end blocks of `block_ranges` are what
/// the range resolver and the bundle history index key off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootBundle {
    #[serde(with = "root_serde")]
    pub pool_rebalance_root: MerkleRoot,
    #[serde(with = "root_serde")]
    pub relayer_refund_root: MerkleRoot,
    #[serde(with = "root_serde")]
    pub slow_relay_root: MerkleRoot,
    pub block_ranges: Vec<BlockRange>,
    pub unclaimed_leaf_count: u32,
}

impl RootBundle {
    /// The end block this bundle covered on `chain`, if the chain was
    /// part of the proposal.
    pub fn end_block_for(&self, chain: ChainId) -> Option<u64> {
        self.block_ranges
            .iter()
            .find(|range| range.chain_id == chain)
            .map(|range| range.end)
    }
}

/// A proposal still inside its challenge window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRootBundle {
    pub bundle: RootBundle,
    pub proposed_at: DateTime<Utc>,
    pub challenge_ends_at: DateTime<Utc>,
}

impl PendingRootBundle {
    pub fn new(
        bundle: RootBundle,
        proposed_at: DateTime<Utc>,
        challenge_ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            bundle,
            proposed_at,
            challenge_ends_at,
        }
    }

    /// True while the bundle can still be disputed.
    pub fn in_challenge_window(&self, now: DateTime<Utc>) -> bool {
        now < self.challenge_ends_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_bundle() -> RootBundle {
        RootBundle {
            pool_rebalance_root: [0xab; 32],
            relayer_refund_root: [0xcd; 32],
            slow_relay_root: [0xef; 32],
            block_ranges: vec![
                BlockRange::new(ChainId::new(1), 0, 15_000_000),
                BlockRange::new(ChainId::new(10), 0, 90_000),
            ],
            unclaimed_leaf_count: 2,
        }
    }

    #[test]
    fn test_end_block_lookup() {
        let bundle = sample_bundle();
        assert_eq!(bundle.end_block_for(ChainId::new(10)), Some(90_000));
        assert_eq!(bundle.end_block_for(ChainId::new(42161)), None);
    }

    #[test]
    fn test_root_hex_serde() {
        let bundle = sample_bundle();
        let json = serde_json::to_string(&bundle).unwrap();
        assert!(json.contains(&format!("0x{}", "ab".repeat(32))));

        let back: RootBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bundle);
    }

    #[test]
    fn test_root_rejects_wrong_length() {
        let result: Result<RootBundle, _> = serde_json::from_str(
            r#"{
                "pool_rebalance_root": "0xabcd",
                "relayer_refund_root": "0xabcd",
                "slow_relay_root": "0xabcd",
                "block_ranges": [],
                "unclaimed_leaf_count": 0
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_challenge_window() {
        let proposed = Utc::now();
        let pending = PendingRootBundle::new(
            sample_bundle(),
            proposed,
            proposed + Duration::hours(2),
        );
        assert!(pending.in_challenge_window(proposed + Duration::hours(1)));
        assert!(!pending.in_challenge_window(proposed + Duration::hours(3)));
    }
}
