//! End-to-end proposal cycle example.
//!
//! Demonstrates how the engine folds one window of bridge activity into
//! running balances and packages them into pool rebalance leaves.

use reconciliation_engine::bundle::history::RecordedBundleHistory;
use reconciliation_engine::core::chain::ChainId;
use reconciliation_engine::core::event::{
    DepositWithBlock, FillWithBlock, FillsToRefund, UnfilledDeposit,
};
use reconciliation_engine::core::params::{ProtocolParams, TokenRegistry};
use reconciliation_engine::core::token::TokenAddress;
use reconciliation_engine::reconcile::cycle::{reconcile_cycle, CycleInputs};
use rust_decimal_macros::dec;

fn main() {
    env_logger::init();

    println!("╔══════════════════════════════════════════════╗");
    println!("║  reconciliation-engine: Full Proposal Cycle  ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let mainnet = ChainId::new(1);
    let optimism = ChainId::new(10);
    let arbitrum = ChainId::new(42161);

    let op_weth = TokenAddress::new("0x4200000000000000000000000000000000000006");
    let op_usdc = TokenAddress::new("0x7f5c764cbc14f9669b88837ca1490cca17c31607");
    let arb_weth = TokenAddress::new("0x82af49447d8a07e3bd95bd0d56f35241523fbab1");
    let arb_usdc = TokenAddress::new("0xff970a61a04b1ca14834a43f5de4533ebddb5cc8");
    let l1_weth = TokenAddress::new("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    let l1_usdc = TokenAddress::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

    let mut registry = TokenRegistry::new();
    registry.set_l1_token(optimism, op_weth.clone(), 0, l1_weth.clone());
    registry.set_l1_token(optimism, op_usdc.clone(), 0, l1_usdc.clone());
    registry.set_l1_token(arbitrum, arb_weth.clone(), 0, l1_weth.clone());
    registry.set_l1_token(arbitrum, arb_usdc.clone(), 0, l1_usdc.clone());

    let mut params = ProtocolParams::new();
    params
        .set_transfer_threshold(l1_weth.clone(), 0, dec!(10))
        .unwrap();
    params
        .set_transfer_threshold(l1_usdc.clone(), 0, dec!(25_000))
        .unwrap();
    params.set_max_tokens_per_leaf(0, 25).unwrap();

    println!("━━━ Window Events ━━━\n");
    println!("  Fill:     50,000 USDC paid out on Optimism, relayer repaid there");
    println!("  Fill:     2 WETH paid out on Arbitrum, relayer repaid there");
    println!("  Deposit:  1.5 WETH locked on Optimism, headed to Arbitrum");
    println!("  Unfilled: 5,000 USDC deposit on Arbitrum still waiting for a relayer\n");

    let usdc_fill = FillWithBlock {
        origin_chain_id: arbitrum,
        deposit_id: 901,
        destination_chain_id: optimism,
        destination_token: op_usdc.clone(),
        amount: dec!(50_000),
        total_filled_amount: dec!(50_000),
        fill_amount: dec!(50_000),
        block_number: 17_000_420,
        is_slow_relay: false,
        repayment_chain_id: optimism,
        repayment_token: op_usdc,
        realized_lp_fee: dec!(150),
    };
    let weth_fill = FillWithBlock {
        origin_chain_id: mainnet,
        deposit_id: 902,
        destination_chain_id: arbitrum,
        destination_token: arb_weth.clone(),
        amount: dec!(2),
        total_filled_amount: dec!(2),
        fill_amount: dec!(2),
        block_number: 105_000_321,
        is_slow_relay: false,
        repayment_chain_id: arbitrum,
        repayment_token: arb_weth,
        realized_lp_fee: dec!(0.006),
    };
    let weth_deposit = DepositWithBlock {
        origin_chain_id: optimism,
        destination_chain_id: arbitrum,
        deposit_id: 903,
        token: op_weth,
        amount: dec!(1.5),
        block_number: 17_000_200,
    };
    let unfilled_usdc = UnfilledDeposit {
        deposit: DepositWithBlock {
            origin_chain_id: arbitrum,
            destination_chain_id: optimism,
            deposit_id: 904,
            token: arb_usdc,
            amount: dec!(5_000),
            block_number: 105_000_100,
        },
        unfilled_amount: dec!(5_000),
    };

    let window_fills = vec![usdc_fill, weth_fill];
    let inputs = CycleInputs {
        refunds: FillsToRefund::from_fills(&window_fills),
        carried_balances: Default::default(),
        unfilled_deposits: vec![unfilled_usdc],
        deposits: vec![weth_deposit],
        window_fills,
    };

    // First proposal ever: no executed bundles to correct against.
    let history = RecordedBundleHistory::new();
    let report = reconcile_cycle(&inputs, &registry, &params, &history, 18_000_000)
        .expect("cycle should reconcile");

    println!("{}", report);

    println!("━━━ Pool Rebalance Leaves ━━━\n");
    for leaf in &report.leaves {
        println!(
            "  Leaf {} (chain {}, group {}):",
            leaf.leaf_id, leaf.chain_id, leaf.group_index
        );
        for (i, token) in leaf.l1_tokens.iter().enumerate() {
            println!(
                "    {}  fee {:>8}  net send {:>8}  carried {:>6}",
                token, leaf.bundle_lp_fees[i], leaf.net_send_amounts[i], leaf.running_balances[i]
            );
        }
        println!();
    }

    println!("━━━ Carried Into Next Cycle ━━━\n");
    let carried = report.carried_balances();
    for chain in carried.chains() {
        for token in carried.tokens_on(chain) {
            println!(
                "  chain {:>6}  {}  {:>6}",
                chain,
                token,
                carried.balance(chain, &token)
            );
        }
    }

    println!("\n━━━ Interpretation ━━━\n");
    println!("  The 55,000 USDC owed to Optimism clears its 25,000 threshold and");
    println!("  moves as a net send. Both WETH balances sit below 10 WETH, so they");
    println!("  ride along as running balances until a later cycle releases them.");
}
