//! # reconciliation-engine
//!
//! Settlement reconciliation core for a cross-chain bridge relayer.
//!
//! Folds deposit, fill, and relayer repayment events observed on
//! independent spoke chains into net per-token balances between each
//! spoke and the hub chain, corrects stale slow-fill reservations, and
//! packages the result into a bounded, ordered, deterministic sequence
//! of pool rebalance leaves for a Merkle-committed settlement proposal.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: chains, tokens, events, ledgers, parameters
//! - **bundle** — Root bundle records, proposal-window history, block range resolution
//! - **reconcile** — Running balance accumulation, excess correction, leaf construction
//! - **simulation** — Random cycle generation for stress testing

pub mod bundle;
pub mod core;
pub mod reconcile;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bundle::history::{BundleHistory, RecordedBundleHistory, WindowComparison};
    pub use crate::bundle::range::{widest_ranges, ChainHead, FixedHeads};
    pub use crate::bundle::roots::{PendingRootBundle, RootBundle};
    pub use crate::core::chain::{BlockRange, ChainId};
    pub use crate::core::event::{DepositWithBlock, FillWithBlock, FillsToRefund, UnfilledDeposit};
    pub use crate::core::ledger::TokenLedger;
    pub use crate::core::params::{ProtocolParams, TokenRegistry};
    pub use crate::core::token::TokenAddress;
    pub use crate::reconcile::cycle::{reconcile_cycle, CycleInputs, CycleReport};
    pub use crate::reconcile::leaves::{build_leaves, PoolRebalanceLeaf};
}
