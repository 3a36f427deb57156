use crate::core::chain::ChainId;
use crate::core::ledger::TokenLedger;
use crate::core::params::{ParamError, ProtocolParams};
use crate::core::token::TokenAddress;
use crate::reconcile::threshold::net_send_and_carry;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One leaf of the pool rebalance tree.
///
/// The four sequences are parallel: entry `i` of each describes the
/// token `l1_tokens[i]`. Tokens are strictly ascending by address and
/// at most the configured leaf limit per leaf. `leaf_id` is unique and
/// ascending across the whole proposal; `group_index` restarts at 0 for
/// each chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRebalanceLeaf {
    pub chain_id: ChainId,
    pub group_index: u32,
    pub leaf_id: u32,
    pub l1_tokens: Vec<TokenAddress>,
    pub bundle_lp_fees: Vec<Decimal>,
    /// Signed transfer amounts: positive flows hub to spoke.
    pub net_send_amounts: Vec<Decimal>,
    /// Sub-threshold remainders carried into the next cycle.
    pub running_balances: Vec<Decimal>,
}

impl PoolRebalanceLeaf {
    pub fn token_count(&self) -> usize {
        self.l1_tokens.len()
    }

    /// All four parallel sequences have matching lengths.
    pub fn is_consistent(&self) -> bool {
        let n = self.l1_tokens.len();
        self.bundle_lp_fees.len() == n
            && self.net_send_amounts.len() == n
            && self.running_balances.len() == n
    }
}

/// Package final balances into an ordered sequence of leaves.
///
/// Chains are emitted ascending by chain id; within a chain, the union
/// of tokens appearing in either ledger is emitted ascending by address
/// and chunked into groups of at most the leaf limit in force at
/// `settlement_block`. Each token's balance is split by its transfer
/// threshold into the net send and the carried remainder; its LP fee
/// defaults to zero when the fee ledger has no bucket. Tokens with a
/// zero balance and a fee bucket (or the reverse) still occupy a slot,
/// as explicit zeros.
///
/// Equal inputs produce byte-identical output.
pub fn build_leaves(
    running: &TokenLedger,
    fees: &TokenLedger,
    params: &ProtocolParams,
    settlement_block: u64,
) -> Result<Vec<PoolRebalanceLeaf>, ParamError> {
    let max_tokens = params.max_tokens_per_leaf(settlement_block)?;

    let mut chains: Vec<ChainId> = running.chains();
    chains.extend(fees.chains());
    chains.sort();
    chains.dedup();

    let mut leaves = Vec::new();
    let mut leaf_id: u32 = 0;

    for chain in chains {
        let mut tokens: Vec<TokenAddress> = running.tokens_on(chain);
        tokens.extend(fees.tokens_on(chain));
        tokens.sort();
        tokens.dedup();

        for (group_index, group) in tokens.chunks(max_tokens).enumerate() {
            let mut bundle_lp_fees = Vec::with_capacity(group.len());
            let mut net_send_amounts = Vec::with_capacity(group.len());
            let mut running_balances = Vec::with_capacity(group.len());

            for token in group {
                let threshold = params.transfer_threshold(token, settlement_block)?;
                let split = net_send_and_carry(threshold, running.balance(chain, token));
                bundle_lp_fees.push(fees.balance(chain, token));
                net_send_amounts.push(split.net_send);
                running_balances.push(split.carry);
            }

            leaves.push(PoolRebalanceLeaf {
                chain_id: chain,
                group_index: group_index as u32,
                leaf_id,
                l1_tokens: group.to_vec(),
                bundle_lp_fees,
                net_send_amounts,
                running_balances,
            });
            leaf_id += 1;
        }
    }

    debug!("built {} pool rebalance leaves", leaves.len());
    Ok(leaves)
}
