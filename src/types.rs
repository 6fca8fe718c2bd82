//! Core identifiers shared across every component: symbols, trading pairs
//! and trade direction.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A ticker symbol using `Arc<str>` for cheap cloning — symbols are passed
/// into strategies, signals, orders and positions constantly, so cloning
/// must be O(1), not a fresh heap allocation per clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] Arc<str>);

mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A tradeable pair, e.g. base `BTC` quoted in `USDT`. Equality requires
/// both legs to match exactly (no implicit normalization of case or venue).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: Symbol,
    pub quote: Symbol,
}

impl TradingPair {
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        TradingPair {
            base: Symbol::new(base),
            quote: Symbol::new(quote),
        }
    }
}

impl std::fmt::Display for TradingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Directional side of a position, order or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_equality_requires_both_legs() {
        let a = TradingPair::new("BTC", "USDT");
        let b = TradingPair::new("BTC", "USDT");
        let c = TradingPair::new("BTC", "USDC");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn symbol_clone_is_cheap_and_content_equal() {
        let a = Symbol::new("BTCUSDT");
        let b = a.clone();
        assert_eq!(a, b);
    }
}
