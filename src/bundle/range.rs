use crate::bundle::roots::RootBundle;
use crate::core::chain::{BlockRange, ChainId};
use async_trait::async_trait;
use futures::future::try_join_all;
use log::debug;
use std::collections::HashMap;
use thiserror::Error;

/// Errors arising from block range resolution.
#[derive(Debug, Error)]
pub enum RangeError {
    #[error("failed to fetch head block for chain {chain}: {reason}")]
    HeadFetch { chain: ChainId, reason: String },
}

/// Source of current head blocks, one query per chain.
///
/// Implementations wrap whatever RPC client the orchestration layer
/// uses. Each query is independent; `widest_ranges` issues them
/// concurrently.
#[async_trait]
pub trait ChainHead: Send + Sync {
    async fn head_block(&self, chain: ChainId) -> Result<u64, RangeError>;
}

/// Snapshot-backed head source for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct FixedHeads {
    heads: HashMap<ChainId, u64>,
}

impl FixedHeads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, chain: ChainId, head: u64) {
        self.heads.insert(chain, head);
    }
}

#[async_trait]
impl ChainHead for FixedHeads {
    async fn head_block(&self, chain: ChainId) -> Result<u64, RangeError> {
        self.heads
            .get(&chain)
            .copied()
            .ok_or_else(|| RangeError::HeadFetch {
                chain,
                reason: "no head snapshot recorded".to_string(),
            })
    }
}

/// Compute the widest candidate block range per chain.
///
/// Per chain: start one past the end block of the last executed bundle,
/// falling back to the chain's configured floor, falling back to 0; end
/// at the chain's current head. Heads are fetched concurrently for all
/// chains, and a single fetch failure fails the whole computation so a
/// proposal is never built from partial head data.
///
/// Output order matches `chain_ids`. A returned range may be empty
/// (`start > end`) when a chain's head has not advanced past the last
/// executed bundle; such a chain contributes no new events. Ranges are
/// advisory maxima: a proposal may narrow them but must never exceed
/// them.
pub async fn widest_ranges(
    chain_ids: &[ChainId],
    last_executed: Option<&RootBundle>,
    floors: &HashMap<ChainId, u64>,
    heads: &impl ChainHead,
) -> Result<Vec<BlockRange>, RangeError> {
    let head_blocks = try_join_all(chain_ids.iter().map(|&chain| heads.head_block(chain))).await?;

    let ranges: Vec<BlockRange> = chain_ids
        .iter()
        .zip(head_blocks)
        .map(|(&chain, head)| {
            let start = last_executed
                .and_then(|bundle| bundle.end_block_for(chain))
                .map(|end| end.saturating_add(1))
                .or_else(|| floors.get(&chain).copied())
                .unwrap_or(0);
            BlockRange::new(chain, start, head)
        })
        .collect();

    for range in &ranges {
        debug!("resolved candidate range {}", range);
    }
    Ok(ranges)
}
