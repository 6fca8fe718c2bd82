//! OHLCV candles and the series container strategies read indicators from.

use crate::error::DataError;
use crate::money::Decimal;
use crate::time::{Timeframe, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A single OHLCV bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Timestamp,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn new(
        timestamp: Timestamp,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<Self, DataError> {
        let candle = Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        candle.validate()?;
        Ok(candle)
    }

    /// Construct without validation, for fixtures and trusted loaders.
    pub fn new_unchecked(
        timestamp: Timestamp,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if !self.open.is_positive() || !self.high.is_positive() || !self.low.is_positive() || !self.close.is_positive()
        {
            return Err(DataError::NonPositivePrice {
                open: self.open.to_string(),
                high: self.high.to_string(),
                low: self.low.to_string(),
                close: self.close.to_string(),
            });
        }
        if self.high < self.low {
            return Err(DataError::HighLessThanLow {
                high: self.high.to_string(),
                low: self.low.to_string(),
            });
        }
        if self.volume.is_negative() {
            return Err(DataError::NegativeVolume(self.volume.to_string()));
        }
        if self.open < self.low || self.open > self.high {
            return Err(DataError::OpenOutOfRange {
                open: self.open.to_string(),
                low: self.low.to_string(),
                high: self.high.to_string(),
            });
        }
        if self.close < self.low || self.close > self.high {
            return Err(DataError::CloseOutOfRange {
                close: self.close.to_string(),
                low: self.low.to_string(),
                high: self.high.to_string(),
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// An ordered candle series for one pair/timeframe, plus any named indicator
/// arrays a strategy has attached via [`Strategy::populate_indicators`].
///
/// Warm-up positions in an indicator array are `None` rather than a fake NaN
/// sentinel.
///
/// [`Strategy::populate_indicators`]: crate::strategy::Strategy::populate_indicators
#[derive(Debug, Clone)]
pub struct Candles {
    timeframe: Timeframe,
    candles: Vec<Candle>,
    indicators: HashMap<Arc<str>, Vec<Option<Decimal>>>,
}

impl Candles {
    pub fn new(timeframe: Timeframe) -> Self {
        Candles {
            timeframe,
            candles: Vec::new(),
            indicators: HashMap::new(),
        }
    }

    pub fn from_vec(timeframe: Timeframe, candles: Vec<Candle>) -> Result<Self, DataError> {
        let mut series = Candles::new(timeframe);
        for candle in candles {
            series.push(candle)?;
        }
        Ok(series)
    }

    /// Appends a candle, enforcing monotonically increasing, timeframe-aligned
    /// timestamps (no look-ahead and no out-of-order data is representable).
    pub fn push(&mut self, candle: Candle) -> Result<(), DataError> {
        let aligned = candle.timestamp.align(self.timeframe);
        if aligned != candle.timestamp {
            return Err(DataError::UnalignedTimestamp {
                timestamp: candle.timestamp.to_iso8601(),
                timeframe: self.timeframe.to_string(),
            });
        }
        if let Some(last) = self.candles.last() {
            if candle.timestamp <= last.timestamp {
                return Err(DataError::NonMonotonicTimestamp {
                    previous: last.timestamp.to_iso8601(),
                    next: candle.timestamp.to_iso8601(),
                });
            }
        }
        self.candles.push(candle);
        Ok(())
    }

    /// Attaches (or replaces) a named indicator array. Must have exactly one
    /// entry per candle.
    pub fn attach_indicator(
        &mut self,
        name: impl Into<Arc<str>>,
        values: Vec<Option<Decimal>>,
    ) -> Result<(), DataError> {
        let name = name.into();
        if values.len() != self.candles.len() {
            return Err(DataError::IndicatorLengthMismatch {
                name: name.to_string(),
                expected: self.candles.len(),
                got: values.len(),
            });
        }
        self.indicators.insert(name, values);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn indicator(&self, name: &str) -> Option<&[Option<Decimal>]> {
        self.indicators.get(name).map(|v| v.as_slice())
    }

    pub fn indicator_at(&self, name: &str, index: usize) -> Option<Decimal> {
        self.indicators.get(name)?.get(index).copied().flatten()
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.low).collect()
    }

    /// The no-look-ahead view a strategy callback receives for candle `index`:
    /// everything up to and including it, nothing after. Indices beyond
    /// `index` are structurally unrepresentable through this accessor.
    pub fn up_to(&self, index: usize) -> &[Candle] {
        &self.candles[..=index.min(self.candles.len().saturating_sub(1))]
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: &str) -> Decimal {
        Decimal::from_string(v).unwrap()
    }

    fn candle_at(minute_index: i64, close: &str) -> Candle {
        Candle::new_unchecked(
            Timestamp::from_millis(Timeframe::M1.as_duration().num_milliseconds() * minute_index),
            d(close),
            d(close),
            d(close),
            d(close),
            Decimal::from_int(1),
        )
    }

    #[test]
    fn rejects_non_monotonic_push() {
        let mut series = Candles::new(Timeframe::M1);
        series.push(candle_at(1, "100")).unwrap();
        let err = series.push(candle_at(0, "101")).unwrap_err();
        assert!(matches!(err, DataError::NonMonotonicTimestamp { .. }));
    }

    #[test]
    fn rejects_unaligned_timestamp() {
        let mut series = Candles::new(Timeframe::H1);
        let unaligned = Timestamp::from_millis(90 * 60 * 1000);
        let candle = Candle::new_unchecked(unaligned, d("1"), d("1"), d("1"), d("1"), Decimal::ZERO);
        let err = series.push(candle).unwrap_err();
        assert!(matches!(err, DataError::UnalignedTimestamp { .. }));
    }

    #[test]
    fn indicator_length_must_match_candle_count() {
        let mut series = Candles::new(Timeframe::M1);
        series.push(candle_at(0, "100")).unwrap();
        series.push(candle_at(1, "101")).unwrap();
        let err = series.attach_indicator("sma", vec![None]).unwrap_err();
        assert!(matches!(err, DataError::IndicatorLengthMismatch { .. }));
    }

    #[test]
    fn up_to_excludes_future_candles() {
        let mut series = Candles::new(Timeframe::M1);
        for i in 0..5 {
            series.push(candle_at(i, "100")).unwrap();
        }
        assert_eq!(series.up_to(2).len(), 3);
    }

    #[test]
    fn candle_validation_rejects_open_outside_range() {
        let candle = Candle::new(
            Timestamp::from_millis(0),
            d("110"),
            d("105"),
            d("95"),
            d("100"),
            Decimal::ZERO,
        );
        assert!(candle.is_err());
    }
}
