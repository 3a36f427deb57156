use serde::{Deserialize, Serialize};
use std::fmt;

/// A token contract address in `0x`-prefixed hex form.
///
/// Addresses are normalized to lowercase on construction, so the derived
/// lexicographic ordering coincides with the numeric ordering of the
/// underlying address. Leaf construction relies on this to emit token
/// lists in ascending address order.
///
/// # Examples
///
/// ```
/// use reconciliation_engine::core::token::TokenAddress;
///
/// let usdc = TokenAddress::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
/// assert_eq!(usdc.as_str(), "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TokenAddress(String);

impl TokenAddress {
    /// Create a token address, normalizing to lowercase.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TokenAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// Deserialization routes through `new` so stored checksummed addresses
// come back normalized.
impl<'de> Deserialize<'de> for TokenAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_normalizes_case() {
        let checksummed = TokenAddress::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        let lower = TokenAddress::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(checksummed, lower);
    }

    #[test]
    fn test_token_ordering_matches_numeric() {
        // 0x0a... < 0xB0... numerically; lowercase normalization makes the
        // string comparison agree ('0' < 'b').
        let low = TokenAddress::new("0x0A00000000000000000000000000000000000001");
        let high = TokenAddress::new("0xB000000000000000000000000000000000000002");
        assert!(low < high);
    }

    #[test]
    fn test_token_display() {
        let t = TokenAddress::new("0xDEADBEEF00000000000000000000000000000000");
        assert_eq!(
            format!("{}", t),
            "0xdeadbeef00000000000000000000000000000000"
        );
    }

    #[test]
    fn test_token_deserialize_normalizes() {
        let t: TokenAddress =
            serde_json::from_str("\"0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48\"").unwrap();
        assert_eq!(t.as_str(), "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    }
}
