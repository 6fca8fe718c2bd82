//! The strategy-facing view of an open or closed position, and the account
//! (balance + equity curve) it is held against.

use crate::error::PositionError;
use crate::money::Decimal;
use crate::time::Timestamp;
use crate::types::{Side, TradingPair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A single position in one pair. The engine only ever holds at most one of
/// these open per pair at a time (see [`crate::position_manager::PositionManager`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub pair: TradingPair,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub status: PositionStatus,
    pub realized_pnl: Option<Decimal>,
    pub opened_at: Timestamp,
    pub closed_at: Option<Timestamp>,
}

impl Position {
    pub fn open(
        pair: TradingPair,
        side: Side,
        size: Decimal,
        entry_price: Decimal,
        opened_at: Timestamp,
    ) -> Result<Self, PositionError> {
        if !size.is_positive() {
            return Err(PositionError::InvalidPositionSize);
        }
        if !entry_price.is_positive() {
            return Err(PositionError::InvalidEntryPrice);
        }
        Ok(Position {
            pair,
            side,
            size,
            entry_price,
            exit_price: None,
            status: PositionStatus::Open,
            realized_pnl: None,
            opened_at,
            closed_at: None,
        })
    }

    /// Closes the position at `exit_price`, computing and recording realized
    /// PnL. Can only be called once — closing an already-closed position is
    /// an error, not a silent no-op.
    pub fn close(&mut self, exit_price: Decimal, closed_at: Timestamp) -> Result<Decimal, PositionError> {
        if self.status == PositionStatus::Closed {
            return Err(PositionError::PositionAlreadyClosed);
        }
        if !exit_price.is_positive() {
            return Err(PositionError::InvalidExitPrice);
        }
        let pnl = match self.side {
            Side::Long => (exit_price - self.entry_price) * self.size,
            Side::Short => (self.entry_price - exit_price) * self.size,
        };
        self.exit_price = Some(exit_price);
        self.status = PositionStatus::Closed;
        self.realized_pnl = Some(pnl);
        self.closed_at = Some(closed_at);
        Ok(pnl)
    }

    /// Mark-to-market PnL at `current_price`, using the same formula as
    /// `close` would, without mutating the position.
    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        match self.side {
            Side::Long => (current_price - self.entry_price) * self.size,
            Side::Short => (self.entry_price - current_price) * self.size,
        }
    }

    /// Signed return ratio relative to entry price (e.g. 0.05 == +5%).
    pub fn return_ratio(&self, current_price: Decimal) -> f64 {
        if self.entry_price.is_zero() {
            return 0.0;
        }
        let entry = self.entry_price.to_float();
        let current = current_price.to_float();
        match self.side {
            Side::Long => (current - entry) / entry,
            Side::Short => (entry - current) / entry,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

/// Account balance and equity history. Mutated only through
/// `deposit`/`withdraw`/`realize`/`apply_fee` — callers (the risk manager and
/// executor) are responsible for validating a trade before it touches the
/// account, so balance never goes negative after a validated trade.
#[derive(Debug, Clone)]
pub struct Account {
    balance: Decimal,
    equity_curve: Vec<(Timestamp, Decimal)>,
    taker_fee: Decimal,
    maker_fee: Decimal,
}

impl Account {
    pub fn new(initial_balance: Decimal, taker_fee: Decimal, maker_fee: Decimal) -> Self {
        Account {
            balance: initial_balance,
            equity_curve: Vec::new(),
            taker_fee,
            maker_fee,
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn deposit(&mut self, amount: Decimal) {
        self.balance += amount;
    }

    pub fn withdraw(&mut self, amount: Decimal) {
        self.balance -= amount;
    }

    /// Applies realized PnL (positive or negative) to the balance.
    pub fn realize(&mut self, pnl: Decimal) {
        self.balance += pnl;
    }

    /// Charges a fee on `notional` at the maker or taker rate, deducting it
    /// from the balance and returning the amount charged.
    pub fn apply_fee(&mut self, notional: Decimal, is_maker: bool) -> Decimal {
        let rate = if is_maker { self.maker_fee } else { self.taker_fee };
        let fee = notional * rate;
        self.balance -= fee;
        fee
    }

    pub fn record_equity(&mut self, timestamp: Timestamp, equity: Decimal) {
        self.equity_curve.push((timestamp, equity));
    }

    pub fn equity_curve(&self) -> &[(Timestamp, Decimal)] {
        &self.equity_curve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TradingPair {
        TradingPair::new("BTC", "USDT")
    }

    #[test]
    fn long_position_pnl_is_exit_minus_entry_times_size() {
        let mut position = Position::open(
            pair(),
            Side::Long,
            Decimal::from_int(2),
            Decimal::from_int(100),
            Timestamp::from_millis(0),
        )
        .unwrap();
        let pnl = position.close(Decimal::from_int(110), Timestamp::from_millis(1)).unwrap();
        assert_eq!(pnl, Decimal::from_int(20));
    }

    #[test]
    fn short_position_pnl_is_entry_minus_exit_times_size() {
        let mut position = Position::open(
            pair(),
            Side::Short,
            Decimal::from_int(2),
            Decimal::from_int(100),
            Timestamp::from_millis(0),
        )
        .unwrap();
        let pnl = position.close(Decimal::from_int(90), Timestamp::from_millis(1)).unwrap();
        assert_eq!(pnl, Decimal::from_int(20));
    }

    #[test]
    fn closing_twice_is_an_error() {
        let mut position = Position::open(
            pair(),
            Side::Long,
            Decimal::from_int(1),
            Decimal::from_int(100),
            Timestamp::from_millis(0),
        )
        .unwrap();
        position.close(Decimal::from_int(105), Timestamp::from_millis(1)).unwrap();
        let result = position.close(Decimal::from_int(106), Timestamp::from_millis(2));
        assert!(matches!(result, Err(PositionError::PositionAlreadyClosed)));
    }

    #[test]
    fn opening_with_non_positive_size_is_rejected() {
        let result = Position::open(pair(), Side::Long, Decimal::ZERO, Decimal::from_int(100), Timestamp::from_millis(0));
        assert!(matches!(result, Err(PositionError::InvalidPositionSize)));
    }
}
