use crate::core::chain::ChainId;
use crate::core::token::TokenAddress;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Globally unique identity of a deposit: the chain it originated on
/// plus the id the origin spoke pool assigned it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DepositKey {
    pub origin_chain_id: ChainId,
    pub deposit_id: u64,
}

impl DepositKey {
    pub fn new(origin_chain_id: ChainId, deposit_id: u64) -> Self {
        Self {
            origin_chain_id,
            deposit_id,
        }
    }
}

impl fmt::Display for DepositKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.origin_chain_id, self.deposit_id)
    }
}

/// A deposit event observed on an origin spoke chain.
///
/// Immutable once observed. The depositor locked `amount` of `token`
/// in the origin spoke pool at `block_number`, asking to be paid out
/// on `destination_chain_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositWithBlock {
    pub origin_chain_id: ChainId,
    pub destination_chain_id: ChainId,
    pub deposit_id: u64,
    /// The token locked on the origin chain.
    pub token: TokenAddress,
    pub amount: Decimal,
    /// Block on the origin chain at which the deposit was made.
    pub block_number: u64,
}

impl DepositWithBlock {
    pub fn key(&self) -> DepositKey {
        DepositKey::new(self.origin_chain_id, self.deposit_id)
    }
}

/// A fill event observed on a destination spoke chain.
///
/// `amount` is the deposit's full size, `total_filled_amount` the
/// cumulative amount filled after this fill, and `fill_amount` the
/// portion this fill contributed. A fill with
/// `total_filled_amount == amount` completes its deposit.
///
/// Non-slow fills carry the relayer's chosen repayment location and the
/// LP fee realized for the protocol; slow relays are executed by the
/// spoke pool itself and refund no relayer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillWithBlock {
    pub origin_chain_id: ChainId,
    pub deposit_id: u64,
    pub destination_chain_id: ChainId,
    /// The token paid out on the destination chain.
    pub destination_token: TokenAddress,
    pub amount: Decimal,
    pub total_filled_amount: Decimal,
    pub fill_amount: Decimal,
    /// Block on the destination chain at which the fill landed.
    pub block_number: u64,
    pub is_slow_relay: bool,
    /// Chain on which the relayer takes repayment.
    pub repayment_chain_id: ChainId,
    /// Token in which the relayer takes repayment.
    pub repayment_token: TokenAddress,
    pub realized_lp_fee: Decimal,
}

impl FillWithBlock {
    pub fn key(&self) -> DepositKey {
        DepositKey::new(self.origin_chain_id, self.deposit_id)
    }

    /// True when this fill brings the deposit to fully filled.
    pub fn is_completing(&self) -> bool {
        self.total_filled_amount == self.amount
    }
}

/// A deposit with an outstanding unfilled remainder at proposal time.
///
/// These become slow-relay leaves: the destination spoke pool is funded
/// to pay out `unfilled_amount` itself if no relayer steps in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfilledDeposit {
    pub deposit: DepositWithBlock,
    pub unfilled_amount: Decimal,
}

/// Totals owed for one (repayment chain, repayment token) bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefundTotals {
    /// Sum of fill amounts the relayers are owed back.
    pub total_refund_amount: Decimal,
    /// Sum of LP fees realized by fills repaid in this bucket.
    pub realized_lp_fees: Decimal,
}

/// Valid relayer fills grouped by where the relayer takes repayment.
///
/// Slow-relay executions contribute only their LP fee, under the
/// destination chain and token, since there is no relayer to refund.
/// Entries with a zero refund and a nonzero fee are therefore normal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillsToRefund {
    /// (repayment chain, repayment token) -> totals
    #[serde(with = "totals_serde")]
    totals: HashMap<(ChainId, TokenAddress), RefundTotals>,
}

mod totals_serde {
    use super::*;
    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeMap;

    pub fn serialize<S: serde::Serializer>(
        totals: &HashMap<(ChainId, TokenAddress), RefundTotals>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(totals.len()))?;
        for ((chain, token), entry) in totals {
            map.serialize_entry(&format!("{}:{}", chain, token), entry)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<(ChainId, TokenAddress), RefundTotals>, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = HashMap<(ChainId, TokenAddress), RefundTotals>;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map with \"chain:token\" keys")
            }
            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut map = HashMap::new();
                while let Some((key, value)) = access.next_entry::<String, RefundTotals>()? {
                    let (chain, token) = key
                        .split_once(':')
                        .ok_or_else(|| de::Error::custom(format!("invalid key: {key}")))?;
                    let chain: u64 = chain
                        .parse()
                        .map_err(|_| de::Error::custom(format!("invalid chain id: {chain}")))?;
                    map.insert((ChainId::new(chain), TokenAddress::new(token)), value);
                }
                Ok(map)
            }
        }
        deserializer.deserialize_map(V)
    }
}

impl FillsToRefund {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group fills into refund buckets.
    pub fn from_fills(fills: &[FillWithBlock]) -> Self {
        let mut refunds = Self::new();
        for fill in fills {
            if fill.is_slow_relay {
                refunds.add_fee(
                    fill.destination_chain_id,
                    fill.destination_token.clone(),
                    fill.realized_lp_fee,
                );
            } else {
                refunds.add_refund(
                    fill.repayment_chain_id,
                    fill.repayment_token.clone(),
                    fill.fill_amount,
                    fill.realized_lp_fee,
                );
            }
        }
        refunds
    }

    /// Add a relayer refund and its LP fee to a bucket.
    pub fn add_refund(
        &mut self,
        chain: ChainId,
        token: TokenAddress,
        refund: Decimal,
        fee: Decimal,
    ) {
        let entry = self.totals.entry((chain, token)).or_default();
        entry.total_refund_amount += refund;
        entry.realized_lp_fees += fee;
    }

    /// Add an LP fee with no relayer refund (slow-relay execution).
    pub fn add_fee(&mut self, chain: ChainId, token: TokenAddress, fee: Decimal) {
        let entry = self.totals.entry((chain, token)).or_default();
        entry.realized_lp_fees += fee;
    }

    pub fn get(&self, chain: ChainId, token: &TokenAddress) -> Option<&RefundTotals> {
        self.totals.get(&(chain, token.clone()))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&(ChainId, TokenAddress), &RefundTotals)> {
        self.totals.iter()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_fill() -> FillWithBlock {
        FillWithBlock {
            origin_chain_id: ChainId::new(1),
            deposit_id: 7,
            destination_chain_id: ChainId::new(10),
            destination_token: TokenAddress::new("0x4200000000000000000000000000000000000006"),
            amount: dec!(100),
            total_filled_amount: dec!(100),
            fill_amount: dec!(100),
            block_number: 5_000,
            is_slow_relay: false,
            repayment_chain_id: ChainId::new(42161),
            repayment_token: TokenAddress::new("0x82af49447d8a07e3bd95bd0d56f35241523fbab1"),
            realized_lp_fee: dec!(0.3),
        }
    }

    #[test]
    fn test_deposit_key_display() {
        let key = DepositKey::new(ChainId::new(1), 42);
        assert_eq!(format!("{}", key), "1/42");
    }

    #[test]
    fn test_fill_is_completing() {
        let mut fill = sample_fill();
        assert!(fill.is_completing());
        fill.total_filled_amount = dec!(60);
        assert!(!fill.is_completing());
    }

    #[test]
    fn test_from_fills_groups_by_repayment() {
        let mut a = sample_fill();
        a.fill_amount = dec!(40);
        a.realized_lp_fee = dec!(0.1);
        let mut b = sample_fill();
        b.deposit_id = 8;
        b.fill_amount = dec!(60);
        b.realized_lp_fee = dec!(0.2);

        let refunds = FillsToRefund::from_fills(&[a.clone(), b]);
        let totals = refunds
            .get(a.repayment_chain_id, &a.repayment_token)
            .unwrap();
        assert_eq!(totals.total_refund_amount, dec!(100));
        assert_eq!(totals.realized_lp_fees, dec!(0.3));
    }

    #[test]
    fn test_from_fills_slow_relay_fee_only() {
        let mut slow = sample_fill();
        slow.is_slow_relay = true;
        slow.fill_amount = dec!(100);
        slow.realized_lp_fee = dec!(0.5);

        let refunds = FillsToRefund::from_fills(&[slow.clone()]);

        // No refund bucket on the repayment chain
        assert!(refunds
            .get(slow.repayment_chain_id, &slow.repayment_token)
            .is_none());

        // Fee-only bucket on the destination chain
        let totals = refunds
            .get(slow.destination_chain_id, &slow.destination_token)
            .unwrap();
        assert_eq!(totals.total_refund_amount, Decimal::ZERO);
        assert_eq!(totals.realized_lp_fees, dec!(0.5));
    }

    #[test]
    fn test_refunds_serde_round_trip() {
        let mut refunds = FillsToRefund::new();
        refunds.add_refund(
            ChainId::new(10),
            TokenAddress::new("0x4200000000000000000000000000000000000006"),
            dec!(250),
            dec!(1.5),
        );

        let json = serde_json::to_string(&refunds).unwrap();
        assert!(json.contains("10:0x4200000000000000000000000000000000000006"));

        let back: FillsToRefund = serde_json::from_str(&json).unwrap();
        assert_eq!(back, refunds);
    }
}
