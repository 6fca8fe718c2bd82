//! Order submission: a dual-mode executor that fills immediately in
//! simulation, or forwards to a bound `Exchange` in live mode.
//!
//! Grounded on the teacher's `oms::types::Order`/`OrderRequest` shapes and
//! the fill-detection idiom in `oms/execution.rs`, narrowed to the runtime's
//! immediate-total-fill simulation model — no partial fills, no
//! maker/taker fill-price path (that richer OMS behavior is explicitly
//! deferred, see DESIGN.md).

use crate::error::{ExecutorError, MarketDataError};
use crate::money::Decimal;
use crate::time::Timestamp;
use crate::types::{Side, TradingPair};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type OrderId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub pair: TradingPair,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Option<Decimal>,
}

impl OrderRequest {
    pub fn validate(&self) -> Result<(), ExecutorError> {
        if !self.amount.is_positive() {
            return Err(ExecutorError::InvalidOrderAmount);
        }
        match self.order_type {
            OrderType::Limit => match self.price {
                Some(p) if p.is_positive() => {}
                Some(_) => return Err(ExecutorError::InvalidOrderPrice),
                None => return Err(ExecutorError::LimitOrderRequiresPrice),
            },
            OrderType::Market => {
                if let Some(p) = self.price {
                    if !p.is_positive() {
                        return Err(ExecutorError::InvalidOrderPrice);
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub pair: TradingPair,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled_amount: Decimal,
    pub avg_fill_price: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An external venue this engine can submit orders to and pull data from.
/// Per the concurrency model, calls are synchronous from the engine's point
/// of view — a real implementation may block internally (network I/O), but
/// the backtest loop never awaits or suspends mid-candle.
pub trait Exchange: Send + Sync {
    fn create_order(&self, request: OrderRequest) -> Result<Order, MarketDataError>;
    fn cancel_order(&self, order_id: OrderId) -> Result<(), MarketDataError>;
    fn get_ticker(&self, pair: &TradingPair) -> Result<Decimal, MarketDataError>;
    fn get_candles(
        &self,
        pair: &TradingPair,
        timeframe: crate::time::Timeframe,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<crate::candle::Candles, MarketDataError>;
}

/// Fills orders immediately and totally, at the requested price for limit
/// orders or the caller-supplied market price for market orders. This is the
/// only execution model the deterministic backtest loop uses.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulationExecutor {
    next_order_id: OrderId,
}

impl SimulationExecutor {
    pub fn new() -> Self {
        SimulationExecutor { next_order_id: 1 }
    }

    pub fn submit(
        &mut self,
        request: &OrderRequest,
        market_price: Decimal,
        now: Timestamp,
    ) -> Result<Order, ExecutorError> {
        request.validate()?;
        let fill_price = match request.order_type {
            OrderType::Limit => request.price.expect("validated above"),
            OrderType::Market => request.price.unwrap_or(market_price),
        };
        let order = Order {
            id: self.next_order_id,
            pair: request.pair.clone(),
            side: request.side,
            order_type: request.order_type,
            amount: request.amount,
            price: request.price,
            status: OrderStatus::Filled,
            filled_amount: request.amount,
            avg_fill_price: fill_price,
            created_at: now,
            updated_at: now,
        };
        self.next_order_id += 1;
        Ok(order)
    }

    pub fn cancel(&self, order: &mut Order, now: Timestamp) -> Result<(), ExecutorError> {
        match order.status {
            OrderStatus::Open | OrderStatus::PartiallyFilled => {
                order.status = OrderStatus::Cancelled;
                order.updated_at = now;
                Ok(())
            }
            _ => Err(ExecutorError::OrderNotCancellable),
        }
    }
}

/// Dual-mode order executor: simulation (immediate total fill, no external
/// dependency) or live (forwards to a bound `Exchange`).
pub enum OrderExecutor {
    Simulated(SimulationExecutor),
    Live(Arc<dyn Exchange>),
}

impl OrderExecutor {
    pub fn simulated() -> Self {
        OrderExecutor::Simulated(SimulationExecutor::new())
    }

    pub fn live(exchange: Arc<dyn Exchange>) -> Self {
        OrderExecutor::Live(exchange)
    }

    pub fn submit(&mut self, request: OrderRequest, market_price: Decimal, now: Timestamp) -> Result<Order, ExecutorError> {
        match self {
            OrderExecutor::Simulated(sim) => sim.submit(&request, market_price, now),
            OrderExecutor::Live(exchange) => {
                request.validate()?;
                Ok(exchange.create_order(request)?)
            }
        }
    }

    pub fn cancel(&mut self, order: &mut Order, now: Timestamp) -> Result<(), ExecutorError> {
        match self {
            OrderExecutor::Simulated(sim) => sim.cancel(order, now),
            OrderExecutor::Live(exchange) => {
                exchange.cancel_order(order.id)?;
                order.status = OrderStatus::Cancelled;
                order.updated_at = now;
                Ok(())
            }
        }
    }
}
