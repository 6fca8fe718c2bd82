//! Per-component error taxonomy.
//!
//! Each component that can fail owns a narrow `thiserror` enum (mirrors the
//! teacher's `CandleValidationError` convention in the old `types.rs`).
//! [`EngineError`] widens all of them into the single error type the engine
//! loop and its callers actually propagate.

use thiserror::Error;

/// Errors from [`crate::money::Decimal`] arithmetic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("decimal overflow")]
    Overflow,
    #[error("could not parse decimal from string")]
    ParseError,
}

/// Errors from [`crate::time`] parsing and alignment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("invalid timestamp format: {0}")]
    InvalidFormat(String),
}

/// Errors from [`crate::candle`] construction and series bookkeeping.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: String,
        high: String,
        low: String,
        close: String,
    },
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: String, low: String },
    #[error("open ({open}) must be within [low, high] = [{low}, {high}]")]
    OpenOutOfRange {
        open: String,
        low: String,
        high: String,
    },
    #[error("close ({close}) must be within [low, high] = [{low}, {high}]")]
    CloseOutOfRange {
        close: String,
        low: String,
        high: String,
    },
    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(String),
    #[error("candle timestamp {timestamp} is not aligned to timeframe {timeframe}")]
    UnalignedTimestamp { timestamp: String, timeframe: String },
    #[error("candle timestamp {next} does not follow {previous} in a monotonically increasing series")]
    NonMonotonicTimestamp { previous: String, next: String },
    #[error("indicator '{name}' has {got} values, expected {expected} (one per candle)")]
    IndicatorLengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("candle series is empty")]
    EmptyCandleList,
}

/// Errors from [`crate::signal`] construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    #[error("signal strength {0} is out of range [0, 1]")]
    StrengthOutOfRange(f64),
    #[error("invalid strategy parameter: {0}")]
    InvalidParameter(String),
    #[error("minimal ROI schedule entries must have non-decreasing time_minutes")]
    NonMonotonicRoiSchedule,
    #[error("minimal ROI profit_ratio must be non-negative, got {0}")]
    NegativeRoiProfitRatio(f64),
    #[error("trailing-stop offset_percent ({offset}) must be <= activate_percent ({activate})")]
    TrailingOffsetExceedsActivation { offset: f64, activate: f64 },
}

/// Errors from [`crate::position`] lifecycle transitions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PositionError {
    #[error("position size must be positive")]
    InvalidPositionSize,
    #[error("entry price must be positive")]
    InvalidEntryPrice,
    #[error("exit price must be positive")]
    InvalidExitPrice,
    #[error("position is already closed")]
    PositionAlreadyClosed,
    #[error("cannot add a position that is already closed")]
    CannotAddClosedPosition,
}

/// Errors from [`crate::risk`] pre-trade validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskError {
    #[error("maximum open trades reached")]
    MaxOpenTradesReached,
    #[error("position size too large for configured stake amount")]
    PositionSizeTooLarge,
    #[error("total exposure would exceed configured risk limits")]
    TotalExposureTooLarge,
    #[error("win rate {0} is out of range [0, 1]")]
    InvalidWinRate(f64),
}

/// Errors from [`crate::executor`] order submission.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("limit orders require a price")]
    LimitOrderRequiresPrice,
    #[error("order amount must be positive")]
    InvalidOrderAmount,
    #[error("order price must be positive")]
    InvalidOrderPrice,
    #[error("order cannot be cancelled in its current state")]
    OrderNotCancellable,
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
}

/// Errors from [`crate::market_data`] and the `Exchange` contract.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("no exchange is connected to service this request")]
    NoExchangeConnected,
    #[error("rate limited by exchange")]
    RateLimited,
    #[error("order rejected by exchange")]
    OrderRejected,
    #[error("request to exchange timed out")]
    Timeout,
}

/// Top-level error union returned by the backtest engine and its public API.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Math(#[from] MathError),
    #[error(transparent)]
    Time(#[from] TimeError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Risk(#[from] RiskError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
    #[error("strategy has already been initialized")]
    AlreadyInitialized,
    #[error("strategy callback failed: {0}")]
    Strategy(#[source] Box<dyn std::error::Error + Send + Sync>),
}
