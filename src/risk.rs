//! Pre-trade risk validation and position-sizing helpers.
//!
//! Grounded on the teacher's `RiskManagerConfig`/`RiskManager` builder
//! pattern and ordered-validation style, narrowed to the three checks and
//! the ordering the runtime mandates: a request is rejected at the first
//! check it fails, in this order —
//! `MaxOpenTradesReached` -> `PositionSizeTooLarge` -> `TotalExposureTooLarge`.

use crate::error::RiskError;
use crate::executor::OrderRequest;
use crate::money::Decimal;
use crate::position_manager::PositionManager;

/// The limits a `RiskManager` enforces for one trading pair/strategy.
#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    pub max_open_trades: usize,
    pub stake_amount: Decimal,
}

impl RiskLimits {
    pub fn max_total_exposure(&self) -> Decimal {
        Decimal::from_int(self.max_open_trades as i64) * self.stake_amount
    }
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    limits: RiskLimits,
}

impl RiskManager {
    pub fn new(limits: RiskLimits) -> Self {
        RiskManager { limits }
    }

    pub fn limits(&self) -> RiskLimits {
        self.limits
    }

    /// Validates an order request against current exposure. `reference_price`
    /// is the price used to estimate the request's notional value (the
    /// current market price for a market order, the limit price for a limit
    /// order).
    pub fn validate_order(
        &self,
        request: &OrderRequest,
        reference_price: Decimal,
        positions: &PositionManager,
    ) -> Result<(), RiskError> {
        if positions.open_position_count() >= self.limits.max_open_trades {
            return Err(RiskError::MaxOpenTradesReached);
        }

        let notional = request.amount * reference_price;
        if notional > self.limits.stake_amount {
            return Err(RiskError::PositionSizeTooLarge);
        }

        let projected_exposure = positions.total_exposure() + notional;
        if projected_exposure > self.limits.max_total_exposure() {
            return Err(RiskError::TotalExposureTooLarge);
        }

        Ok(())
    }

    /// Current exposure as a fraction of the configured maximum, in `[0, 1]`
    /// (clamped — exposure can transiently exceed the cap if limits were
    /// tightened after positions were already opened).
    pub fn current_risk_ratio(&self, positions: &PositionManager) -> f64 {
        let max_exposure = self.limits.max_total_exposure();
        if max_exposure.is_zero() {
            return 0.0;
        }
        (positions.total_exposure().to_float() / max_exposure.to_float()).clamp(0.0, 1.0)
    }
}

/// Quarter-Kelly position sizing: `f = (p*b - (1-p)) / b` with
/// `b = avg_win / avg_loss`, then `balance * clamp(f / 4, 0, 0.10)`.
///
/// Falls back to a flat 1% of balance when `avg_win`/`avg_loss` don't
/// describe a meaningful edge (either is zero or negative), since Kelly's
/// formula is undefined there.
pub fn quarter_kelly_position_size(
    win_rate: f64,
    avg_win: Decimal,
    avg_loss: Decimal,
    balance: Decimal,
) -> Result<Decimal, RiskError> {
    if !(0.0..=1.0).contains(&win_rate) {
        return Err(RiskError::InvalidWinRate(win_rate));
    }

    if avg_win.is_zero() || avg_loss.is_zero() || avg_win.is_negative() || avg_loss.is_negative() {
        return Ok(balance * Decimal::from_float(0.01));
    }

    let b = avg_win.to_float() / avg_loss.to_float();
    let f = (win_rate * b - (1.0 - win_rate)) / b;
    let quarter = (f / 4.0).clamp(0.0, 0.10);
    Ok(balance * Decimal::from_float(quarter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::OrderType;
    use crate::types::{Side, TradingPair};

    fn request(amount: i64) -> OrderRequest {
        OrderRequest {
            pair: TradingPair::new("BTC", "USDT"),
            side: Side::Long,
            order_type: OrderType::Market,
            amount: Decimal::from_int(amount),
            price: None,
        }
    }

    #[test]
    fn rejects_once_max_open_trades_reached() {
        let limits = RiskLimits {
            max_open_trades: 2,
            stake_amount: Decimal::from_int(1000),
        };
        let manager = RiskManager::new(limits);
        let mut positions = PositionManager::new();
        positions
            .add_position(
                crate::position::Position::open(
                    TradingPair::new("BTC", "USDT"),
                    Side::Long,
                    Decimal::from_int(10),
                    Decimal::from_int(100),
                    crate::time::Timestamp::from_millis(0),
                )
                .unwrap(),
            )
            .unwrap();
        positions
            .add_position(
                crate::position::Position::open(
                    TradingPair::new("ETH", "USDT"),
                    Side::Long,
                    Decimal::from_int(10),
                    Decimal::from_int(100),
                    crate::time::Timestamp::from_millis(0),
                )
                .unwrap(),
            )
            .unwrap();

        let result = manager.validate_order(&request(5), Decimal::from_int(100), &positions);
        assert_eq!(result, Err(RiskError::MaxOpenTradesReached));
    }

    #[test]
    fn quarter_kelly_matches_worked_example() {
        let size = quarter_kelly_position_size(
            0.6,
            Decimal::from_int(100),
            Decimal::from_int(50),
            Decimal::from_int(10_000),
        )
        .unwrap();
        assert_eq!(size, Decimal::from_int(1000));
    }

    #[test]
    fn quarter_kelly_rejects_invalid_win_rate() {
        let result = quarter_kelly_position_size(
            1.5,
            Decimal::from_int(100),
            Decimal::from_int(50),
            Decimal::from_int(10_000),
        );
        assert!(matches!(result, Err(RiskError::InvalidWinRate(_))));
    }
}
