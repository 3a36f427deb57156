use crate::bundle::history::{BundleHistory, WindowComparison};
use crate::core::chain::ChainId;
use crate::core::event::{DepositKey, FillWithBlock};
use crate::core::ledger::TokenLedger;
use crate::core::params::ParamError;
use crate::core::token::TokenAddress;
use crate::reconcile::accumulator::BalanceAccumulator;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors arising from reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A completing fill's deposit was first filled in an earlier
    /// executed window, yet no fill in a slow-fill-financing window
    /// precedes it. The recorded history is corrupt or incomplete, and
    /// proposing on top of it would double-count reserved funds.
    #[error("no reserved fill found for deposit {deposit} before block {block}")]
    AccountingInconsistency { deposit: DepositKey, block: u64 },
    #[error(transparent)]
    Param(#[from] ParamError),
}

/// Audit record of one reserved-funds claw-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessCorrection {
    pub deposit: DepositKey,
    /// Destination chain whose bucket was corrected.
    pub chain_id: ChainId,
    /// Destination-chain token of the completing fill.
    pub token: TokenAddress,
    /// What the earlier proposal reserved for the slow fill.
    pub amount_reserved: Decimal,
    /// The portion of the reservation that will never be used.
    pub excess: Decimal,
    /// Block of the completing fill.
    pub block: u64,
}

/// Claw back slow-fill reservations that later fills made unnecessary.
///
/// An earlier proposal that financed a slow fill reserved the deposit's
/// then-unfilled remainder on the destination chain. If the deposit
/// completes in a later window, part or all of that reservation is
/// dead capital:
///
/// - the slow relay itself completed the deposit: the reservation minus
///   what the slow relay actually paid out is excess (zero when nothing
///   else touched the deposit in between);
/// - an ordinary fill preempted the slow relay: the entire reservation
///   is excess.
///
/// Completing fills whose deposit was first filled in the same window,
/// or never filled inside any executed window, are skipped; no earlier
/// proposal can have reserved funds for them. Nonzero excess is
/// subtracted from the destination bucket and reported.
pub fn subtract_reserved_fill_excess(
    accumulator: &BalanceAccumulator,
    running: &mut TokenLedger,
    window_fills: &[FillWithBlock],
    history: &impl BundleHistory,
) -> Result<Vec<ExcessCorrection>, ReconcileError> {
    let mut corrections = Vec::new();

    for fill in window_fills.iter().filter(|f| f.is_completing()) {
        let deposit = fill.key();

        // A deposit with no recorded fills cannot have a prior-window
        // reservation; its first fill is the completing fill itself.
        let first_block = history
            .first_fill_block(&deposit)
            .unwrap_or(fill.block_number);

        match history.compare_windows(fill.destination_chain_id, first_block, fill.block_number) {
            WindowComparison::SameWindow | WindowComparison::NoPriorWindow => continue,
            WindowComparison::DifferentWindow => {}
        }

        let reserved = history
            .latest_reserved_fill(&deposit, fill.block_number)
            .ok_or(ReconcileError::AccountingInconsistency {
                deposit,
                block: fill.block_number,
            })?;
        let amount_reserved = reserved.amount - reserved.total_filled_amount;

        let excess = if fill.is_slow_relay {
            amount_reserved - fill.fill_amount
        } else {
            amount_reserved
        };
        if excess == Decimal::ZERO {
            continue;
        }

        accumulator.apply_fill(running, fill, -excess)?;
        debug!(
            "clawed back {} of {} reserved for deposit {} at block {}",
            excess, amount_reserved, deposit, fill.block_number
        );
        corrections.push(ExcessCorrection {
            deposit,
            chain_id: fill.destination_chain_id,
            token: fill.destination_token.clone(),
            amount_reserved,
            excess,
            block: fill.block_number,
        });
    }

    Ok(corrections)
}
