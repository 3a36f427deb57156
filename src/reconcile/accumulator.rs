use crate::core::event::{DepositWithBlock, FillWithBlock, FillsToRefund, UnfilledDeposit};
use crate::core::ledger::TokenLedger;
use crate::core::params::{ParamError, TokenRegistry};
use log::debug;
use rust_decimal::Decimal;

/// Folds settlement events into running balance and LP fee ledgers.
///
/// All amounts land in hub-token buckets: every event's spoke token is
/// resolved to its hub counterpart through the registry, using the
/// mapping in force at the event's own block (refund aggregates, which
/// have no single event block, resolve at the cycle's settlement
/// block).
///
/// Sign convention: relayer refunds and slow-fill obligations increase
/// a spoke's bucket (the hub owes the spoke), deposits decrease it
/// (deposited funds already sit in spoke custody). A positive final
/// balance is money the hub must send.
pub struct BalanceAccumulator<'a> {
    registry: &'a TokenRegistry,
    /// Hub block anchoring this cycle's parameter lookups.
    settlement_block: u64,
}

impl<'a> BalanceAccumulator<'a> {
    pub fn new(registry: &'a TokenRegistry, settlement_block: u64) -> Self {
        Self {
            registry,
            settlement_block,
        }
    }

    pub fn settlement_block(&self) -> u64 {
        self.settlement_block
    }

    /// Seed both ledgers from the cycle's refund aggregates.
    ///
    /// Refund totals are added to the running balances only when
    /// nonzero; realized LP fees are copied whenever the bucket exists,
    /// so fee-only buckets (slow-relay executions) still surface in the
    /// fee ledger.
    pub fn initialize(
        &self,
        refunds: &FillsToRefund,
    ) -> Result<(TokenLedger, TokenLedger), ParamError> {
        let mut running = TokenLedger::new();
        let mut fees = TokenLedger::new();

        for ((chain, token), totals) in refunds.entries() {
            let l1_token = self.registry.l1_token(*chain, token, self.settlement_block)?;
            if totals.total_refund_amount != Decimal::ZERO {
                running.add(*chain, l1_token.clone(), totals.total_refund_amount);
            }
            fees.add(*chain, l1_token, totals.realized_lp_fees);
        }

        debug!(
            "initialized {} running and {} fee buckets from {} refund entries",
            running.len(),
            fees.len(),
            refunds.len()
        );
        Ok((running, fees))
    }

    /// Merge the prior cycle's sub-threshold remainders.
    ///
    /// Carried entries are already keyed by hub token, so no resolution
    /// happens here. Zero entries are skipped.
    pub fn add_carried_balances(&self, running: &mut TokenLedger, carried: &TokenLedger) {
        let mut merged = 0usize;
        for ((chain, token), amount) in carried.entries() {
            if *amount != Decimal::ZERO {
                running.add(*chain, token.clone(), *amount);
                merged += 1;
            }
        }
        debug!("merged {} carried balances", merged);
    }

    /// Fund the destination spoke pools for outstanding slow fills.
    ///
    /// The obligation lands on the deposit's destination chain under
    /// the hub counterpart of the origin token, resolved at the
    /// deposit's block.
    pub fn add_slow_fill_obligations(
        &self,
        running: &mut TokenLedger,
        unfilled: &[UnfilledDeposit],
    ) -> Result<(), ParamError> {
        for entry in unfilled {
            let deposit = &entry.deposit;
            let l1_token =
                self.registry
                    .l1_token(deposit.origin_chain_id, &deposit.token, deposit.block_number)?;
            running.add(deposit.destination_chain_id, l1_token, entry.unfilled_amount);
        }
        debug!("added {} slow fill obligations", unfilled.len());
        Ok(())
    }

    /// Fold the window's deposits into the running balances.
    pub fn add_deposits(
        &self,
        running: &mut TokenLedger,
        deposits: &[DepositWithBlock],
    ) -> Result<(), ParamError> {
        for deposit in deposits {
            self.apply_deposit(running, deposit, -deposit.amount)?;
        }
        debug!("applied {} deposits", deposits.len());
        Ok(())
    }

    /// Add `delta` to the bucket a fill settles against: the fill's
    /// destination chain, under the hub counterpart of the destination
    /// token at the fill's block.
    pub fn apply_fill(
        &self,
        running: &mut TokenLedger,
        fill: &FillWithBlock,
        delta: Decimal,
    ) -> Result<(), ParamError> {
        let l1_token = self.registry.l1_token(
            fill.destination_chain_id,
            &fill.destination_token,
            fill.block_number,
        )?;
        running.add(fill.destination_chain_id, l1_token, delta);
        Ok(())
    }

    /// Add `delta` to the bucket a deposit settles against: the origin
    /// chain, under the hub counterpart of the origin token at the
    /// deposit's block.
    pub fn apply_deposit(
        &self,
        running: &mut TokenLedger,
        deposit: &DepositWithBlock,
        delta: Decimal,
    ) -> Result<(), ParamError> {
        let l1_token = self.registry.l1_token(
            deposit.origin_chain_id,
            &deposit.token,
            deposit.block_number,
        )?;
        running.add(deposit.origin_chain_id, l1_token, delta);
        Ok(())
    }
}
