use crate::core::chain::ChainId;
use crate::core::token::TokenAddress;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Net per-token balances between each spoke chain and the hub.
///
/// One ledger instance tracks one concern for one proposal cycle:
/// either running balances (positive = the hub owes the spoke) or
/// realized LP fees. Balances are keyed by the spoke chain and the
/// hub-chain counterpart token.
///
/// Absent entries read as zero. Entries that net out to zero are kept;
/// leaf construction emits them as explicit zero amounts so a fully
/// corrected chain still appears in the proposal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenLedger {
    /// (spoke chain, hub token) -> balance
    #[serde(with = "entries_serde")]
    entries: HashMap<(ChainId, TokenAddress), Decimal>,
}

mod entries_serde {
    use super::*;
    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeMap;

    pub fn serialize<S: serde::Serializer>(
        entries: &HashMap<(ChainId, TokenAddress), Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for ((chain, token), amount) in entries {
            map.serialize_entry(&format!("{}:{}", chain, token), amount)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<(ChainId, TokenAddress), Decimal>, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = HashMap<(ChainId, TokenAddress), Decimal>;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map with \"chain:token\" keys")
            }
            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut map = HashMap::new();
                while let Some((key, value)) = access.next_entry::<String, Decimal>()? {
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

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance for a (chain, token) bucket; zero when absent.
    pub fn balance(&self, chain: ChainId, token: &TokenAddress) -> Decimal {
        self.entries
            .get(&(chain, token.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Add `delta` to a bucket, creating it if absent.
    pub fn add(&mut self, chain: ChainId, token: TokenAddress, delta: Decimal) {
        *self.entries.entry((chain, token)).or_insert(Decimal::ZERO) += delta;
    }

    /// Overwrite a bucket.
    pub fn set(&mut self, chain: ChainId, token: TokenAddress, amount: Decimal) {
        self.entries.insert((chain, token), amount);
    }

    /// All chains with at least one bucket, ascending.
    pub fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self.entries.keys().map(|(c, _)| *c).collect();
        chains.sort();
        chains.dedup();
        chains
    }

    /// All tokens bucketed on `chain`, ascending by address.
    pub fn tokens_on(&self, chain: ChainId) -> Vec<TokenAddress> {
        let mut tokens: Vec<TokenAddress> = self
            .entries
            .keys()
            .filter(|(c, _)| *c == chain)
            .map(|(_, t)| t.clone())
            .collect();
        tokens.sort();
        tokens.dedup();
        tokens
    }

    pub fn entries(&self) -> &HashMap<(ChainId, TokenAddress), Decimal> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of |balance| across all buckets.
    pub fn total_abs(&self) -> Decimal {
        self.entries.values().map(|v| v.abs()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn weth() -> TokenAddress {
        TokenAddress::new("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2")
    }

    fn usdc() -> TokenAddress {
        TokenAddress::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
    }

    #[test]
    fn test_ledger_zero_default() {
        let ledger = TokenLedger::new();
        assert_eq!(ledger.balance(ChainId::new(10), &weth()), Decimal::ZERO);
    }

    #[test]
    fn test_ledger_add_accumulates() {
        let mut ledger = TokenLedger::new();
        let chain = ChainId::new(10);
        ledger.add(chain, weth(), dec!(100));
        ledger.add(chain, weth(), dec!(-30));
        assert_eq!(ledger.balance(chain, &weth()), dec!(70));
    }

    #[test]
    fn test_ledger_keeps_zeroed_entries() {
        let mut ledger = TokenLedger::new();
        let chain = ChainId::new(10);
        ledger.add(chain, weth(), dec!(100));
        ledger.add(chain, weth(), dec!(-100));
        assert_eq!(ledger.balance(chain, &weth()), Decimal::ZERO);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.tokens_on(chain), vec![weth()]);
    }

    #[test]
    fn test_ledger_chains_sorted() {
        let mut ledger = TokenLedger::new();
        ledger.add(ChainId::new(42161), weth(), dec!(1));
        ledger.add(ChainId::new(10), weth(), dec!(1));
        ledger.add(ChainId::new(137), usdc(), dec!(1));
        assert_eq!(
            ledger.chains(),
            vec![ChainId::new(10), ChainId::new(137), ChainId::new(42161)]
        );
    }

    #[test]
    fn test_ledger_tokens_sorted_by_address() {
        let mut ledger = TokenLedger::new();
        let chain = ChainId::new(10);
        ledger.add(chain, weth(), dec!(1));
        ledger.add(chain, usdc(), dec!(1));
        // 0xa0... < 0xc0...
        assert_eq!(ledger.tokens_on(chain), vec![usdc(), weth()]);
    }

    #[test]
    fn test_ledger_total_abs() {
        let mut ledger = TokenLedger::new();
        ledger.add(ChainId::new(10), weth(), dec!(-40));
        ledger.add(ChainId::new(137), usdc(), dec!(60));
        assert_eq!(ledger.total_abs(), dec!(100));
    }

    #[test]
    fn test_ledger_serde_round_trip() {
        let mut ledger = TokenLedger::new();
        ledger.add(ChainId::new(10), weth(), dec!(123.45));

        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.contains("10:0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"));

        let back: TokenLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }
}
