//! The indicator contract the core consumes but does not implement.
//!
//! Concrete technical indicators (SMA/EMA/RSI/MACD/Bollinger/…) are
//! deliberately out of scope for this crate — the core only needs a way for
//! a strategy to attach named, `Decimal`-typed arrays onto a [`Candles`]
//! series before the backtest loop starts iterating it. Warm-up positions in
//! those arrays are `None` rather than a fabricated NaN sentinel, matching
//! [`Candles::attach_indicator`]'s own convention.
//!
//! An indicator library lives upstream of this crate and is wired in through
//! a [`Strategy::populate_indicators`] implementation, or through this
//! trait for a shared computation reused across several strategies.
//!
//! [`Strategy::populate_indicators`]: crate::strategy::Strategy::populate_indicators

use crate::candle::Candles;
use crate::error::DataError;

/// A pluggable indicator computation that attaches its outputs onto a
/// candle series. Not called directly by the engine — a `Strategy`'s own
/// `populate_indicators` is free to delegate to one or more of these.
pub trait IndicatorManager: Send + Sync {
    fn populate(&self, candles: &mut Candles) -> Result<(), DataError>;
}
