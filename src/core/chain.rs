use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier of a chain participating in the bridge.
///
/// Covers the hub (settlement) chain as well as every spoke rollup.
/// Chain ids follow the EVM convention (1 = mainnet, 10 = Optimism,
/// 42161 = Arbitrum One, ...).
///
/// # Examples
///
/// ```
/// use reconciliation_engine::core::chain::ChainId;
///
/// let optimism = ChainId::new(10);
/// let arbitrum = ChainId::new(42161);
/// assert!(optimism < arbitrum);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// An inclusive block window on one chain.
///
/// Produced by the block range resolver and carried on root bundle
/// records to mark the window of events a proposal covers. A range
/// may have `start > end` when the chain head has not advanced past
/// the previous proposal; such a range contains no blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub chain_id: ChainId,
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    pub fn new(chain_id: ChainId, start: u64, end: u64) -> Self {
        Self {
            chain_id,
            start,
            end,
        }
    }

    /// True when the range contains no blocks (`start > end`).
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, block: u64) -> bool {
        block >= self.start && block <= self.end
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..={}]", self.chain_id, self.start, self.end)
    }
}
