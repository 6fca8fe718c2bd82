//! The strategy trait every pluggable strategy implements.
//!
//! Unifies what used to be three drifted trait definitions in the teacher
//! codebase (`strategy.rs`, `strategies/mod.rs`, `oms/strategy.rs`) into the
//! single six-operation contract the engine drives.

use crate::candle::Candles;
use crate::logger::Logger;
use crate::money::Decimal;
use crate::position::{Account, Position};
use crate::signal::{Signal, StrategyMetadata, StrategyParameter};

/// A strategy callback's error type. Boxed rather than a fixed enum since
/// strategies are arbitrary third-party code — the engine only needs to log
/// and skip the failing candle's action, not interpret the cause.
pub type StrategyError = Box<dyn std::error::Error + Send + Sync>;

/// Context passed to a strategy's `init` hook.
pub struct InitContext<'a> {
    pub logger: &'a dyn Logger,
}

/// The six-operation contract a pluggable strategy implements. `init` and
/// `deinit` are lifecycle hooks with default no-op bodies; the remaining
/// four are the decision points the engine calls on every candle.
pub trait Strategy: Send + Sync {
    /// Called once before the first candle. Default no-op.
    fn init(&mut self, _ctx: &InitContext) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Called once after the last candle. Default no-op.
    fn deinit(&mut self) {}

    /// Computes and attaches any indicator arrays this strategy needs onto
    /// the series before the backtest loop starts iterating candles.
    fn populate_indicators(&self, candles: &mut Candles) -> Result<(), StrategyError>;

    /// Looks only at `candles.up_to(index)` — no future candle is even
    /// reachable through that accessor — and proposes an entry, or `None`.
    fn generate_entry_signal(&self, candles: &Candles, index: usize) -> Result<Option<Signal>, StrategyError>;

    /// Same no-look-ahead contract as entry, but for exiting an existing
    /// open `position`.
    fn generate_exit_signal(
        &self,
        candles: &Candles,
        index: usize,
        position: &Position,
    ) -> Result<Option<Signal>, StrategyError>;

    /// Sizes an entry signal against the current account state.
    fn calculate_position_size(&self, signal: &Signal, account: &Account) -> Result<Decimal, StrategyError>;

    fn parameters(&self) -> &[StrategyParameter];

    fn metadata(&self) -> &StrategyMetadata;

    /// Optional fill notification hook; strategies that don't care about
    /// individual fills can ignore it.
    fn notify_order(&mut self, _order: &crate::executor::Order) {}
}
