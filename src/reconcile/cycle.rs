use crate::bundle::history::BundleHistory;
use crate::core::event::{DepositWithBlock, FillWithBlock, FillsToRefund, UnfilledDeposit};
use crate::core::ledger::TokenLedger;
use crate::core::params::{ProtocolParams, TokenRegistry};
use crate::reconcile::accumulator::BalanceAccumulator;
use crate::reconcile::excess::{subtract_reserved_fill_excess, ExcessCorrection, ReconcileError};
use crate::reconcile::leaves::{build_leaves, PoolRebalanceLeaf};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything one proposal cycle folds in: the window's events plus the
/// prior cycle's remainders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleInputs {
    /// Refund aggregates for the window's valid fills.
    pub refunds: FillsToRefund,
    /// Sub-threshold remainders from the last executed proposal.
    pub carried_balances: TokenLedger,
    /// Deposits still unfilled at proposal time.
    pub unfilled_deposits: Vec<UnfilledDeposit>,
    /// Deposits observed inside the window.
    pub deposits: Vec<DepositWithBlock>,
    /// Fills observed inside the window, for excess correction.
    pub window_fills: Vec<FillWithBlock>,
}

/// Outcome of one reconciliation cycle, ready for Merkle construction
/// and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub settlement_block: u64,
    pub running_balances: TokenLedger,
    pub realized_lp_fees: TokenLedger,
    pub corrections: Vec<ExcessCorrection>,
    pub leaves: Vec<PoolRebalanceLeaf>,
}

impl CycleReport {
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Sum of |net send| across all leaves.
    pub fn total_net_send(&self) -> Decimal {
        self.leaves
            .iter()
            .flat_map(|leaf| leaf.net_send_amounts.iter())
            .map(|amount| amount.abs())
            .sum()
    }

    /// Sum of |carried remainder| across all leaves.
    pub fn total_carried(&self) -> Decimal {
        self.leaves
            .iter()
            .flat_map(|leaf| leaf.running_balances.iter())
            .map(|amount| amount.abs())
            .sum()
    }

    /// The nonzero carried remainders, keyed for the next cycle's
    /// `carried_balances` input.
    pub fn carried_balances(&self) -> TokenLedger {
        let mut carried = TokenLedger::new();
        for leaf in &self.leaves {
            for (token, amount) in leaf.l1_tokens.iter().zip(&leaf.running_balances) {
                if *amount != Decimal::ZERO {
                    carried.add(leaf.chain_id, token.clone(), *amount);
                }
            }
        }
        carried
    }

    /// Verify leaf ids are gapless and every leaf is shape-consistent.
    pub fn is_valid(&self) -> bool {
        self.leaves
            .iter()
            .enumerate()
            .all(|(i, leaf)| leaf.leaf_id == i as u32 && leaf.is_consistent())
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Reconciliation Cycle ===")?;
        writeln!(f, "Settlement Block: {}", self.settlement_block)?;
        writeln!(f, "Leaves:           {}", self.leaf_count())?;
        writeln!(f, "Corrections:      {}", self.corrections.len())?;
        writeln!(f, "Net Send Total:   {}", self.total_net_send())?;
        writeln!(f, "Carried Total:    {}", self.total_carried())?;
        writeln!(f, "Valid:            {}", self.is_valid())?;

        for leaf in &self.leaves {
            writeln!(
                f,
                "\n--- chain {} leaf {} (group {}) ---",
                leaf.chain_id, leaf.leaf_id, leaf.group_index
            )?;
            for (i, token) in leaf.l1_tokens.iter().enumerate() {
                writeln!(
                    f,
                    "  {}  send {:>12}  carry {:>12}  fee {:>10}",
                    token, leaf.net_send_amounts[i], leaf.running_balances[i], leaf.bundle_lp_fees[i]
                )?;
            }
        }
        Ok(())
    }
}

/// Run one full reconciliation cycle.
///
/// Stages run in order over explicitly threaded ledgers: seed from
/// refunds, merge carried remainders, fund slow fills, fold deposits,
/// claw back stale slow-fill reservations, then package leaves. Any
/// stage error aborts the cycle; nothing is retried.
pub fn reconcile_cycle(
    inputs: &CycleInputs,
    registry: &TokenRegistry,
    params: &ProtocolParams,
    history: &impl BundleHistory,
    settlement_block: u64,
) -> Result<CycleReport, ReconcileError> {
    let accumulator = BalanceAccumulator::new(registry, settlement_block);

    let (mut running, fees) = accumulator.initialize(&inputs.refunds)?;
    accumulator.add_carried_balances(&mut running, &inputs.carried_balances);
    accumulator.add_slow_fill_obligations(&mut running, &inputs.unfilled_deposits)?;
    accumulator.add_deposits(&mut running, &inputs.deposits)?;

    let corrections =
        subtract_reserved_fill_excess(&accumulator, &mut running, &inputs.window_fills, history)?;

    let leaves = build_leaves(&running, &fees, params, settlement_block)?;

    info!(
        "cycle at block {} produced {} leaves ({} corrections)",
        settlement_block,
        leaves.len(),
        corrections.len()
    );

    Ok(CycleReport {
        settlement_block,
        running_balances: running,
        realized_lp_fees: fees,
        corrections,
        leaves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::history::RecordedBundleHistory;
    use crate::core::chain::ChainId;
    use crate::core::token::TokenAddress;
    use rust_decimal_macros::dec;

    fn op() -> ChainId {
        ChainId::new(10)
    }

    fn op_weth() -> TokenAddress {
        TokenAddress::new("0x4200000000000000000000000000000000000006")
    }

    fn l1_weth() -> TokenAddress {
        TokenAddress::new("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2")
    }

    fn setup() -> (TokenRegistry, ProtocolParams) {
        let mut registry = TokenRegistry::new();
        registry.set_l1_token(op(), op_weth(), 0, l1_weth());
        let mut params = ProtocolParams::new();
        params
            .set_transfer_threshold(l1_weth(), 0, dec!(50))
            .unwrap();
        params.set_max_tokens_per_leaf(0, 10).unwrap();
        (registry, params)
    }

    #[test]
    fn test_empty_cycle() {
        let (registry, params) = setup();
        let report = reconcile_cycle(
            &CycleInputs::default(),
            &registry,
            &params,
            &RecordedBundleHistory::new(),
            1_000,
        )
        .unwrap();

        assert_eq!(report.leaf_count(), 0);
        assert!(report.is_valid());
        assert_eq!(report.total_net_send(), Decimal::ZERO);
    }

    #[test]
    fn test_refunds_flow_into_leaves() {
        let (registry, params) = setup();
        let mut inputs = CycleInputs::default();
        inputs.refunds.add_refund(op(), op_weth(), dec!(200), dec!(1));

        let report = reconcile_cycle(
            &inputs,
            &registry,
            &params,
            &RecordedBundleHistory::new(),
            1_000,
        )
        .unwrap();

        assert_eq!(report.leaf_count(), 1);
        assert_eq!(report.leaves[0].net_send_amounts, vec![dec!(200)]);
        assert_eq!(report.leaves[0].bundle_lp_fees, vec![dec!(1)]);
        assert!(report.carried_balances().is_empty());
    }

    #[test]
    fn test_carried_balances_round_trip() {
        let (registry, params) = setup();

        // Below the 50 threshold: the whole balance carries.
        let mut inputs = CycleInputs::default();
        inputs.refunds.add_refund(op(), op_weth(), dec!(30), Decimal::ZERO);

        let history = RecordedBundleHistory::new();
        let first = reconcile_cycle(&inputs, &registry, &params, &history, 1_000).unwrap();
        assert_eq!(first.total_net_send(), Decimal::ZERO);

        let carried = first.carried_balances();
        assert_eq!(carried.balance(op(), &l1_weth()), dec!(30));

        // Next cycle with no new events reproduces the carry.
        let next_inputs = CycleInputs {
            carried_balances: carried,
            ..Default::default()
        };
        let second = reconcile_cycle(&next_inputs, &registry, &params, &history, 2_000).unwrap();
        assert_eq!(second.carried_balances().balance(op(), &l1_weth()), dec!(30));
        assert_eq!(second.total_net_send(), Decimal::ZERO);
    }

    #[test]
    fn test_report_serializes() {
        let (registry, params) = setup();
        let mut inputs = CycleInputs::default();
        inputs.refunds.add_refund(op(), op_weth(), dec!(200), dec!(1));

        let report = reconcile_cycle(
            &inputs,
            &registry,
            &params,
            &RecordedBundleHistory::new(),
            1_000,
        )
        .unwrap();

        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("running_balances").is_some());
        assert!(parsed.get("realized_lp_fees").is_some());
        assert!(parsed.get("leaves").is_some());
    }

    #[test]
    fn test_report_display_banner() {
        let (registry, params) = setup();
        let mut inputs = CycleInputs::default();
        inputs.refunds.add_refund(op(), op_weth(), dec!(200), dec!(1));

        let report = reconcile_cycle(
            &inputs,
            &registry,
            &params,
            &RecordedBundleHistory::new(),
            1_000,
        )
        .unwrap();

        let rendered = format!("{}", report);
        assert!(rendered.contains("=== Reconciliation Cycle ==="));
        assert!(rendered.contains("Leaves:           1"));
    }
}
