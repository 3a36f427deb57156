//! Slow fill excess correction example.
//!
//! Walks through the double-count hazard: an executed proposal reserves
//! funds for a slow fill, then a relayer completes the deposit with an
//! ordinary fill before the slow fill runs. The reservation and the
//! relayer refund would both pay out unless the excess is clawed back.

use reconciliation_engine::bundle::history::RecordedBundleHistory;
use reconciliation_engine::core::chain::ChainId;
use reconciliation_engine::core::event::{DepositKey, FillWithBlock, FillsToRefund};
use reconciliation_engine::core::ledger::TokenLedger;
use reconciliation_engine::core::params::{ProtocolParams, TokenRegistry};
use reconciliation_engine::core::token::TokenAddress;
use reconciliation_engine::reconcile::cycle::{reconcile_cycle, CycleInputs};
use rust_decimal_macros::dec;

fn main() {
    env_logger::init();

    println!("╔═══════════════════════════════════════════════╗");
    println!("║  reconciliation-engine: Slow Fill Correction  ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    let mainnet = ChainId::new(1);
    let optimism = ChainId::new(10);
    let op_usdc = TokenAddress::new("0x7f5c764cbc14f9669b88837ca1490cca17c31607");
    let l1_usdc = TokenAddress::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

    let mut registry = TokenRegistry::new();
    registry.set_l1_token(optimism, op_usdc.clone(), 0, l1_usdc.clone());

    let mut params = ProtocolParams::new();
    params
        .set_transfer_threshold(l1_usdc.clone(), 0, dec!(10))
        .unwrap();
    params.set_max_tokens_per_leaf(0, 25).unwrap();

    let deposit = DepositKey::new(mainnet, 42);

    println!("━━━ Prior Window (executed) ━━━\n");
    println!("  Deposit 1/42: 100 USDC from mainnet to Optimism");
    println!("  Block 500:    relayer fills 40, leaving 60 unfilled");
    println!("  Proposal:     slow fill leaf reserves the 60 remainder");
    println!("  Executed:     window closed at Optimism block 1000\n");

    let partial_fill = FillWithBlock {
        origin_chain_id: mainnet,
        deposit_id: 42,
        destination_chain_id: optimism,
        destination_token: op_usdc.clone(),
        amount: dec!(100),
        total_filled_amount: dec!(40),
        fill_amount: dec!(40),
        block_number: 500,
        is_slow_relay: false,
        repayment_chain_id: optimism,
        repayment_token: op_usdc.clone(),
        realized_lp_fee: dec!(0.12),
    };

    let mut history = RecordedBundleHistory::new();
    history.record_window_end(optimism, 1_000);
    history.record_fill(partial_fill);
    history.record_slow_fill(deposit, 500);

    // The reserved 60 rode into this cycle as a carried running balance.
    let mut carried = TokenLedger::new();
    carried.add(optimism, l1_usdc.clone(), dec!(60));

    println!("━━━ Current Window ━━━\n");
    println!("  Block 1500:   relayer completes the deposit with an ordinary");
    println!("                fill of 60, preempting the slow fill\n");

    let completing_fill = FillWithBlock {
        origin_chain_id: mainnet,
        deposit_id: 42,
        destination_chain_id: optimism,
        destination_token: op_usdc.clone(),
        amount: dec!(100),
        total_filled_amount: dec!(100),
        fill_amount: dec!(60),
        block_number: 1_500,
        is_slow_relay: false,
        repayment_chain_id: optimism,
        repayment_token: op_usdc,
        realized_lp_fee: dec!(0.18),
    };

    let window_fills = vec![completing_fill];
    let inputs = CycleInputs {
        refunds: FillsToRefund::from_fills(&window_fills),
        carried_balances: carried,
        unfilled_deposits: vec![],
        deposits: vec![],
        window_fills,
    };

    let report = reconcile_cycle(&inputs, &registry, &params, &history, 2_000)
        .expect("cycle should reconcile");

    println!("{}", report);

    println!("━━━ Corrections ━━━\n");
    for correction in &report.corrections {
        println!("  Deposit:   {}", correction.deposit);
        println!("  Reserved:  {}", correction.amount_reserved);
        println!("  Excess:    {}", correction.excess);
        println!("  At block:  {}", correction.block);
    }

    let balance = report.running_balances.balance(optimism, &l1_usdc);
    println!("\n━━━ Balance Audit ━━━\n");
    println!("  Carried reservation:    +60");
    println!("  Relayer refund:         +60");
    println!("  Excess clawed back:     -60");
    println!("  Final running balance:  {}", balance);

    println!("\n━━━ Interpretation ━━━\n");
    println!("  The prior proposal already funded 60 for the slow fill, and the");
    println!("  relayer's refund funds the same 60 again. Subtracting the unused");
    println!("  reservation leaves exactly one payout on the books.");
}
