use crate::bundle::roots::RootBundle;
use crate::core::chain::ChainId;
use crate::core::event::{DepositKey, FillWithBlock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How two blocks on the same chain relate to the executed proposal
/// windows of that chain.
///
/// A block belongs to the earliest executed window whose end block is at
/// or past it. Blocks past every executed end block belong to the still
/// open window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowComparison {
    /// Both blocks fall in the same executed window.
    SameWindow,
    /// The blocks fall in different windows (one may be the open window).
    DifferentWindow,
    /// Neither block falls in any executed window. No earlier proposal
    /// can have reserved funds for events at either block.
    NoPriorWindow,
}

/// Read access to the history of executed proposals and recorded fills.
///
/// The excess correction engine consumes this to decide whether an
/// earlier proposal reserved slow-fill funds for a deposit that a later
/// window's fill has now completed.
pub trait BundleHistory {
    /// Compare the executed windows containing two blocks on `chain`.
    fn compare_windows(&self, chain: ChainId, block_a: u64, block_b: u64) -> WindowComparison;

    /// Block of the earliest recorded fill for `deposit`, if any.
    fn first_fill_block(&self, deposit: &DepositKey) -> Option<u64>;

    /// The most recent fill for `deposit` strictly before `before_block`
    /// whose window also financed a slow fill for the deposit. That
    /// fill's unfilled remainder is what the financing proposal reserved.
    fn latest_reserved_fill(
        &self,
        deposit: &DepositKey,
        before_block: u64,
    ) -> Option<&FillWithBlock>;
}

/// In-memory bundle history assembled from executed bundles and
/// observed fills.
#[derive(Debug, Clone, Default)]
pub struct RecordedBundleHistory {
    /// Per chain, executed window end blocks, ascending.
    window_ends: HashMap<ChainId, Vec<u64>>,
    /// Per deposit, recorded fills ascending by block.
    fills: HashMap<DepositKey, Vec<FillWithBlock>>,
    /// Per deposit, blocks whose containing window financed a slow fill.
    slow_fill_blocks: HashMap<DepositKey, Vec<u64>>,
}

impl RecordedBundleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one executed window end block on `chain`.
    pub fn record_window_end(&mut self, chain: ChainId, end_block: u64) {
        let ends = self.window_ends.entry(chain).or_default();
        let pos = ends.partition_point(|&e| e <= end_block);
        ends.insert(pos, end_block);
    }

    /// Record every per-chain window of an executed bundle.
    pub fn record_executed_bundle(&mut self, bundle: &RootBundle) {
        for range in &bundle.block_ranges {
            self.record_window_end(range.chain_id, range.end);
        }
    }

    /// Record a fill observed on the deposit's destination chain.
    pub fn record_fill(&mut self, fill: FillWithBlock) {
        let fills = self.fills.entry(fill.key()).or_default();
        let pos = fills.partition_point(|f| f.block_number <= fill.block_number);
        fills.insert(pos, fill);
    }

    /// Record that the proposal window containing `block` financed a
    /// slow fill for `deposit`.
    pub fn record_slow_fill(&mut self, deposit: DepositKey, block: u64) {
        self.slow_fill_blocks.entry(deposit).or_default().push(block);
    }

    /// Index of the executed window containing `block`, or `None` when
    /// the block is past every executed end block.
    fn window_of(&self, chain: ChainId, block: u64) -> Option<usize> {
        let ends = self.window_ends.get(&chain)?;
        let idx = ends.partition_point(|&end| end < block);
        (idx < ends.len()).then_some(idx)
    }

    fn window_financed_slow_fill(&self, deposit: &DepositKey, fill: &FillWithBlock) -> bool {
        let Some(blocks) = self.slow_fill_blocks.get(deposit) else {
            return false;
        };
        blocks.iter().any(|&block| {
            self.compare_windows(fill.destination_chain_id, fill.block_number, block)
                == WindowComparison::SameWindow
        })
    }
}

impl BundleHistory for RecordedBundleHistory {
    fn compare_windows(&self, chain: ChainId, block_a: u64, block_b: u64) -> WindowComparison {
        match (self.window_of(chain, block_a), self.window_of(chain, block_b)) {
            (None, None) => WindowComparison::NoPriorWindow,
            (Some(a), Some(b)) if a == b => WindowComparison::SameWindow,
            _ => WindowComparison::DifferentWindow,
        }
    }

    fn first_fill_block(&self, deposit: &DepositKey) -> Option<u64> {
        self.fills
            .get(deposit)
            .and_then(|fills| fills.first())
            .map(|fill| fill.block_number)
    }

    fn latest_reserved_fill(
        &self,
        deposit: &DepositKey,
        before_block: u64,
    ) -> Option<&FillWithBlock> {
        self.fills.get(deposit)?.iter().rev().find(|fill| {
            fill.block_number < before_block && self.window_financed_slow_fill(deposit, fill)
        })
    }
}
