//! Price and candle caching in front of an optional bound `Exchange`.
//!
//! Grounded on the teacher's `exchange.rs` (the concrete CoinDCX client) and
//! `data.rs` (the CSV/cache loader), narrowed to the *contract*: the cache
//! plus direct-write backtest-feed path is the only concrete implementation
//! shipped here. A real network-backed `Exchange` is an external
//! collaborator, out of scope for this crate.

use crate::candle::Candles;
use crate::error::MarketDataError;
use crate::executor::Exchange;
use crate::money::Decimal;
use crate::time::Timeframe;
use crate::time::Timestamp;
use crate::types::TradingPair;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CandleCacheKey {
    pair_display: Arc<str>,
    timeframe: Timeframe,
    start_ms: i64,
    end_ms: i64,
}

/// Caches the latest known price per pair and candle windows already
/// fetched, falling back to a bound `Exchange` on a cache miss.
pub struct MarketDataProvider {
    exchange: Option<Arc<dyn Exchange>>,
    price_cache: HashMap<TradingPair, Decimal>,
    candle_cache: HashMap<CandleCacheKey, Candles>,
}

impl MarketDataProvider {
    pub fn new() -> Self {
        MarketDataProvider {
            exchange: None,
            price_cache: HashMap::new(),
            candle_cache: HashMap::new(),
        }
    }

    pub fn with_exchange(exchange: Arc<dyn Exchange>) -> Self {
        MarketDataProvider {
            exchange: Some(exchange),
            price_cache: HashMap::new(),
            candle_cache: HashMap::new(),
        }
    }

    /// Directly writes a price into the cache — the path the backtest loop
    /// uses to feed each candle's close without touching an exchange.
    pub fn update_price(&mut self, pair: TradingPair, price: Decimal) {
        self.price_cache.insert(pair, price);
    }

    pub fn set_candles(&mut self, pair: &TradingPair, timeframe: Timeframe, start: Timestamp, end: Timestamp, candles: Candles) {
        let key = CandleCacheKey {
            pair_display: Arc::from(pair.to_string().as_str()),
            timeframe,
            start_ms: start.to_millis(),
            end_ms: end.to_millis(),
        };
        self.candle_cache.insert(key, candles);
    }

    pub fn latest_price(&self, pair: &TradingPair) -> Result<Decimal, MarketDataError> {
        if let Some(price) = self.price_cache.get(pair) {
            return Ok(*price);
        }
        match &self.exchange {
            Some(exchange) => exchange.get_ticker(pair),
            None => Err(MarketDataError::NoExchangeConnected),
        }
    }

    pub fn candles(
        &mut self,
        pair: &TradingPair,
        timeframe: Timeframe,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Candles, MarketDataError> {
        let key = CandleCacheKey {
            pair_display: Arc::from(pair.to_string().as_str()),
            timeframe,
            start_ms: start.to_millis(),
            end_ms: end.to_millis(),
        };
        if let Some(cached) = self.candle_cache.get(&key) {
            return Ok(cached.clone());
        }
        match &self.exchange {
            Some(exchange) => {
                let candles = exchange.get_candles(pair, timeframe, start, end)?;
                self.candle_cache.insert(key, candles.clone());
                Ok(candles)
            }
            None => Err(MarketDataError::NoExchangeConnected),
        }
    }
}

impl Default for MarketDataProvider {
    fn default() -> Self {
        Self::new()
    }
}
