use crate::core::chain::ChainId;
use crate::core::token::TokenAddress;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Errors arising from protocol parameter lookups and registration.
///
/// An unresolved lookup is fatal to the proposal cycle: settling with a
/// guessed token mapping or threshold would produce a disputable bundle.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("no hub counterpart registered for {token} on chain {chain} at block {block}")]
    UnresolvedToken {
        chain: ChainId,
        token: TokenAddress,
        block: u64,
    },
    #[error("no transfer threshold registered for {token} at block {block}")]
    UnresolvedThreshold { token: TokenAddress, block: u64 },
    #[error("no max-tokens-per-leaf limit registered at block {block}")]
    UnresolvedLeafLimit { block: u64 },
    #[error("transfer threshold must be non-negative, got {threshold} for {token}")]
    InvalidThreshold {
        token: TokenAddress,
        threshold: Decimal,
    },
    #[error("max tokens per leaf must be positive, got {limit}")]
    InvalidLeafLimit { limit: usize },
}

/// Resolve the latest entry effective at or below `block`.
///
/// Entries must be sorted ascending by effective-from block, which the
/// setters below maintain.
fn resolve_at<T: Clone>(entries: &[(u64, T)], block: u64) -> Option<T> {
    entries
        .iter()
        .rev()
        .find(|(effective_from, _)| *effective_from <= block)
        .map(|(_, value)| value.clone())
}

fn insert_sorted<T>(entries: &mut Vec<(u64, T)>, effective_from: u64, value: T) {
    let pos = entries.partition_point(|(b, _)| *b <= effective_from);
    entries.insert(pos, (effective_from, value));
}

/// Maps each spoke-chain token to its hub-chain counterpart.
///
/// Mappings are block-scoped: governance can remap a spoke token to a
/// different hub token over time, and balance accumulation must use the
/// mapping in force at the block of the event it is folding in.
///
/// # Examples
///
/// ```
/// use reconciliation_engine::core::chain::ChainId;
/// use reconciliation_engine::core::params::TokenRegistry;
/// use reconciliation_engine::core::token::TokenAddress;
///
/// let mut registry = TokenRegistry::new();
/// registry.set_l1_token(
///     ChainId::new(10),
///     TokenAddress::new("0x4200000000000000000000000000000000000006"),
///     0,
///     TokenAddress::new("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
/// );
///
/// let weth = registry.l1_token(
///     ChainId::new(10),
///     &TokenAddress::new("0x4200000000000000000000000000000000000006"),
///     15_000_000,
/// ).unwrap();
/// assert_eq!(weth.as_str(), "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    /// (spoke chain, spoke token) -> [(effective-from block, hub token)]
    mappings: HashMap<(ChainId, TokenAddress), Vec<(u64, TokenAddress)>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hub counterpart for a spoke token from `effective_from` on.
    pub fn set_l1_token(
        &mut self,
        chain: ChainId,
        token: TokenAddress,
        effective_from: u64,
        l1_token: TokenAddress,
    ) {
        let entries = self.mappings.entry((chain, token)).or_default();
        insert_sorted(entries, effective_from, l1_token);
    }

    /// The hub counterpart of `token` on `chain`, as mapped at `block`.
    pub fn l1_token(
        &self,
        chain: ChainId,
        token: &TokenAddress,
        block: u64,
    ) -> Result<TokenAddress, ParamError> {
        self.mappings
            .get(&(chain, token.clone()))
            .and_then(|entries| resolve_at(entries, block))
            .ok_or_else(|| ParamError::UnresolvedToken {
                chain,
                token: token.clone(),
                block,
            })
    }
}

/// Block-scoped settlement parameters: per-token transfer thresholds and
/// the leaf-size limit.
///
/// Thresholds are keyed by hub token. A balance at or above its token's
/// threshold is released as a net send; below, it carries forward. A
/// zero threshold releases everything.
#[derive(Debug, Clone, Default)]
pub struct ProtocolParams {
    /// hub token -> [(effective-from block, threshold)]
    thresholds: HashMap<TokenAddress, Vec<(u64, Decimal)>>,
    /// [(effective-from block, max tokens per leaf)]
    leaf_limits: Vec<(u64, usize)>,
}

impl ProtocolParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transfer threshold for a hub token from `effective_from` on.
    pub fn set_transfer_threshold(
        &mut self,
        token: TokenAddress,
        effective_from: u64,
        threshold: Decimal,
    ) -> Result<(), ParamError> {
        if threshold < Decimal::ZERO {
            return Err(ParamError::InvalidThreshold { token, threshold });
        }
        let entries = self.thresholds.entry(token).or_default();
        insert_sorted(entries, effective_from, threshold);
        Ok(())
    }

    /// The transfer threshold for `token` as configured at `block`.
    pub fn transfer_threshold(
        &self,
        token: &TokenAddress,
        block: u64,
    ) -> Result<Decimal, ParamError> {
        self.thresholds
            .get(token)
            .and_then(|entries| resolve_at(entries, block))
            .ok_or_else(|| ParamError::UnresolvedThreshold {
                token: token.clone(),
                block,
            })
    }

    /// Register the leaf-size limit from `effective_from` on.
    pub fn set_max_tokens_per_leaf(
        &mut self,
        effective_from: u64,
        limit: usize,
    ) -> Result<(), ParamError> {
        if limit == 0 {
            return Err(ParamError::InvalidLeafLimit { limit });
        }
        insert_sorted(&mut self.leaf_limits, effective_from, limit);
        Ok(())
    }

    /// The leaf-size limit as configured at `block`.
    pub fn max_tokens_per_leaf(&self, block: u64) -> Result<usize, ParamError> {
        resolve_at(&self.leaf_limits, block)
            .ok_or(ParamError::UnresolvedLeafLimit { block })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn op_weth() -> TokenAddress {
        TokenAddress::new("0x4200000000000000000000000000000000000006")
    }

    fn l1_weth() -> TokenAddress {
        TokenAddress::new("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2")
    }

    #[test]
    fn test_registry_resolves_at_block() {
        let mut registry = TokenRegistry::new();
        registry.set_l1_token(ChainId::new(10), op_weth(), 100, l1_weth());

        let resolved = registry.l1_token(ChainId::new(10), &op_weth(), 100).unwrap();
        assert_eq!(resolved, l1_weth());

        // Before the mapping took effect
        let result = registry.l1_token(ChainId::new(10), &op_weth(), 99);
        assert!(matches!(result, Err(ParamError::UnresolvedToken { .. })));
    }

    #[test]
    fn test_registry_remap_over_time() {
        let remapped = TokenAddress::new("0x1111111111111111111111111111111111111111");
        let mut registry = TokenRegistry::new();
        registry.set_l1_token(ChainId::new(10), op_weth(), 0, l1_weth());
        registry.set_l1_token(ChainId::new(10), op_weth(), 500, remapped.clone());

        assert_eq!(
            registry.l1_token(ChainId::new(10), &op_weth(), 499).unwrap(),
            l1_weth()
        );
        assert_eq!(
            registry.l1_token(ChainId::new(10), &op_weth(), 500).unwrap(),
            remapped
        );
    }

    #[test]
    fn test_registry_unknown_token() {
        let registry = TokenRegistry::new();
        let result = registry.l1_token(ChainId::new(10), &op_weth(), 1_000);
        assert!(result.is_err());
    }

    #[test]
    fn test_threshold_resolution() {
        let mut params = ProtocolParams::new();
        params
            .set_transfer_threshold(l1_weth(), 0, dec!(10))
            .unwrap();
        params
            .set_transfer_threshold(l1_weth(), 200, dec!(25))
            .unwrap();

        assert_eq!(params.transfer_threshold(&l1_weth(), 150).unwrap(), dec!(10));
        assert_eq!(params.transfer_threshold(&l1_weth(), 200).unwrap(), dec!(25));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut params = ProtocolParams::new();
        let result = params.set_transfer_threshold(l1_weth(), 0, dec!(-1));
        assert!(matches!(result, Err(ParamError::InvalidThreshold { .. })));
    }

    #[test]
    fn test_zero_threshold_allowed() {
        let mut params = ProtocolParams::new();
        params
            .set_transfer_threshold(l1_weth(), 0, Decimal::ZERO)
            .unwrap();
        assert_eq!(
            params.transfer_threshold(&l1_weth(), 10).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_leaf_limit_resolution() {
        let mut params = ProtocolParams::new();
        params.set_max_tokens_per_leaf(0, 25).unwrap();
        params.set_max_tokens_per_leaf(1_000, 50).unwrap();

        assert_eq!(params.max_tokens_per_leaf(999).unwrap(), 25);
        assert_eq!(params.max_tokens_per_leaf(1_000).unwrap(), 50);
    }

    #[test]
    fn test_zero_leaf_limit_rejected() {
        let mut params = ProtocolParams::new();
        let result = params.set_max_tokens_per_leaf(0, 0);
        assert!(matches!(result, Err(ParamError::InvalidLeafLimit { .. })));
    }

    #[test]
    fn test_unresolved_leaf_limit() {
        let params = ProtocolParams::new();
        assert!(params.max_tokens_per_leaf(0).is_err());
    }
}
