//! Aggregate bookkeeping over all positions for a run: at most one open
//! position per pair, oldest-match close semantics, exposure and
//! unrealized-PnL roll-ups.
//!
//! Grounded on the teacher's `oms/position_manager.rs` structure
//! (`HashMap<Symbol, ...>`, `open_position_count`, `total_unrealized_pnl`)
//! but narrowed from its FIFO multi-fill accounting to a single position per
//! pair — the richer FIFO ledger is the teacher's own, more general model
//! and isn't needed here.

use crate::error::PositionError;
use crate::money::Decimal;
use crate::position::Position;
use crate::time::Timestamp;
use crate::types::TradingPair;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PositionManager {
    open: HashMap<TradingPair, Position>,
    closed: Vec<Position>,
}

impl PositionManager {
    pub fn new() -> Self {
        PositionManager {
            open: HashMap::new(),
            closed: Vec::new(),
        }
    }

    /// Adds a new open position. Only one open position per pair is allowed
    /// at a time — callers are responsible for checking
    /// `get_position(pair).is_none()` first; adding a second silently
    /// replaces the first only if it was already closed, otherwise this
    /// overwrites a still-open position, which would hide it from the
    /// engine's exit checks. The engine itself never does this: entry is
    /// only attempted when no position is open for the pair.
    pub fn add_position(&mut self, position: Position) -> Result<(), PositionError> {
        if !position.is_open() {
            return Err(PositionError::CannotAddClosedPosition);
        }
        self.open.insert(position.pair.clone(), position);
        Ok(())
    }

    /// Closes the open position for `pair` at `exit_price`, moving it to the
    /// closed ledger. Returns `None` if no position was open for that pair.
    pub fn close_position(
        &mut self,
        pair: &TradingPair,
        exit_price: Decimal,
        closed_at: Timestamp,
    ) -> Result<Option<Position>, PositionError> {
        let Some(mut position) = self.open.remove(pair) else {
            return Ok(None);
        };
        position.close(exit_price, closed_at)?;
        self.closed.push(position.clone());
        Ok(Some(position))
    }

    pub fn get_position(&self, pair: &TradingPair) -> Option<&Position> {
        self.open.get(pair)
    }

    pub fn get_position_mut(&mut self, pair: &TradingPair) -> Option<&mut Position> {
        self.open.get_mut(pair)
    }

    pub fn open_position_count(&self) -> usize {
        self.open.len()
    }

    pub fn total_exposure(&self) -> Decimal {
        self.open.values().map(|p| p.size * p.entry_price).sum()
    }

    pub fn total_unrealized_pnl(&self, current_prices: &HashMap<TradingPair, Decimal>) -> Decimal {
        self.open
            .values()
            .map(|p| {
                current_prices
                    .get(&p.pair)
                    .map(|price| p.unrealized_pnl(*price))
                    .unwrap_or(Decimal::ZERO)
            })
            .sum()
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.open.values()
    }

    pub fn closed_positions(&self) -> &[Position] {
        &self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn pair(base: &str) -> TradingPair {
        TradingPair::new(base, "USDT")
    }

    fn open_position(base: &str) -> Position {
        Position::open(
            pair(base),
            Side::Long,
            Decimal::from_int(1),
            Decimal::from_int(100),
            Timestamp::from_millis(0),
        )
        .unwrap()
    }

    #[test]
    fn at_most_one_open_position_per_pair_is_tracked() {
        let mut manager = PositionManager::new();
        manager.add_position(open_position("BTC")).unwrap();
        assert_eq!(manager.open_position_count(), 1);
        assert!(manager.get_position(&pair("BTC")).is_some());
    }

    #[test]
    fn close_position_moves_it_to_closed_ledger() {
        let mut manager = PositionManager::new();
        manager.add_position(open_position("BTC")).unwrap();
        let closed = manager
            .close_position(&pair("BTC"), Decimal::from_int(110), Timestamp::from_millis(1))
            .unwrap()
            .unwrap();
        assert_eq!(closed.realized_pnl, Some(Decimal::from_int(10)));
        assert_eq!(manager.open_position_count(), 0);
        assert_eq!(manager.closed_positions().len(), 1);
    }

    #[test]
    fn closing_unknown_pair_returns_none() {
        let mut manager = PositionManager::new();
        let result = manager
            .close_position(&pair("ETH"), Decimal::from_int(100), Timestamp::from_millis(0))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn total_exposure_sums_size_times_entry_price() {
        let mut manager = PositionManager::new();
        manager.add_position(open_position("BTC")).unwrap();
        manager.add_position(open_position("ETH")).unwrap();
        assert_eq!(manager.total_exposure(), Decimal::from_int(200));
    }
}
