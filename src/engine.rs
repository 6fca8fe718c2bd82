//! The deterministic backtest loop: the one component that ties every other
//! module together into a single-symbol, single-threaded run over a candle
//! series.
//!
//! Grounded on the teacher's `Backtester::run`/`calculate_metrics` in
//! `backtest.rs` — the per-candle exit-then-entry-then-mark-to-market shape,
//! the end-of-run forced close of any still-open position, and the
//! win-rate/profit-factor/Sharpe/max-drawdown metrics are all lifted from
//! there. Narrowed to a single trading pair per run (the teacher's
//! multi-symbol `align_data` forward-fill step has no counterpart: this
//! engine takes one already-aligned `Candles` series) and rebuilt around the
//! unified `Strategy` trait and `Decimal` arithmetic instead of `f64`.
//!
//! Exit priority is strategy signal, then the minimal-ROI ladder, then
//! stoploss, then trailing stop — first to trigger wins and at most one exit
//! happens per candle. Exits close directly through the position manager;
//! only entries are routed through the risk manager and executor, mirroring
//! the teacher's own asymmetry (`close_position` is a direct local call,
//! opening a position goes through `risk_manager.can_open_position` first).

use crate::candle::Candles;
use crate::error::{DataError, EngineError};
use crate::executor::{OrderRequest, OrderType, SimulationExecutor};
use crate::logger::{Logger, TracingLogger};
use crate::market_data::MarketDataProvider;
use crate::money::Decimal;
use crate::position::{Account, Position};
use crate::position_manager::PositionManager;
use crate::risk::RiskManager;
use crate::signal::SignalType;
use crate::strategy::{InitContext, Strategy};
use crate::time::Timestamp;
use crate::types::{Side, TradingPair};
use std::collections::HashMap;

/// Static configuration for one backtest run.
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub pair: TradingPair,
    pub initial_balance: Decimal,
    pub taker_fee: Decimal,
    pub maker_fee: Decimal,
    pub max_open_trades: usize,
    pub stake_amount: Decimal,
    /// Trading periods per year, used to annualize the Sharpe ratio. 252 for
    /// daily candles; callers on intraday timeframes should scale this up
    /// (e.g. hourly ~= `252 * 24`).
    pub annualization_periods: f64,
}

/// A closed round-trip, independent of the `Position` it closed — this is
/// the report-facing receipt, the position itself is discarded once closed
/// into the ledger.
#[derive(Debug, Clone)]
pub struct Trade {
    pub pair: TradingPair,
    pub side: Side,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    pub entry_time: Timestamp,
    pub exit_time: Timestamp,
    pub gross_pnl: Decimal,
    pub commission: Decimal,
    pub net_pnl: Decimal,
}

/// Summary statistics computed over a run's closed trades and equity curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub profit_factor: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub final_balance: Decimal,
    pub equity_curve: Vec<(Timestamp, Decimal)>,
    pub closed_positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub metrics: PerformanceMetrics,
}

/// A fatal error raised while processing the candle at `index` — arithmetic
/// overflow or an invariant violation in engine-owned bookkeeping, as
/// opposed to a strategy callback error (those are logged and the candle's
/// action is skipped, the run continues).
#[derive(Debug, thiserror::Error)]
#[error("backtest failed at candle {index}: {source}")]
pub struct BacktestError {
    pub index: usize,
    #[source]
    pub source: EngineError,
}

/// Which side, if any, is open for the run's one pair. Asserted rather than
/// inferred from `PositionManager` state on every transition, so a bug that
/// leaves two positions open for the same pair fails loudly in debug builds
/// instead of silently picking one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairState {
    Flat,
    Open(Side),
}

/// Runs one strategy over one candle series from start to finish.
pub struct BacktestEngine {
    config: BacktestConfig,
    strategy: Box<dyn Strategy>,
    risk_manager: RiskManager,
    executor: SimulationExecutor,
    positions: PositionManager,
    account: Account,
    logger: Box<dyn Logger>,
    /// Peak favorable price seen since a position was opened, for the
    /// trailing-stop calculation. Kept engine-side rather than on `Position`
    /// itself, since it is bookkeeping for the exit rule, not part of a
    /// position's own identity.
    trailing_peak: HashMap<TradingPair, Decimal>,
    /// Entry commission already deducted from the balance when a position
    /// was opened, carried until close so the closed `Trade` can report the
    /// full round-trip commission without charging the entry leg twice.
    entry_fees: HashMap<TradingPair, Decimal>,
    /// The cache a live strategy's `MarketDataProvider`-facing code would
    /// read from; in a pure simulation nothing ever falls back to an
    /// `Exchange`, but the engine still keeps it current per candle so the
    /// cache reflects the same "as of this candle" price the strategy saw.
    market_data: MarketDataProvider,
    /// Set once `run` starts processing candles; `run` is one-shot per
    /// engine instance, mirroring `Strategy::init`'s own expectation that it
    /// is called exactly once.
    initialized: bool,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig, strategy: Box<dyn Strategy>) -> Self {
        let risk_manager = RiskManager::new(crate::risk::RiskLimits {
            max_open_trades: config.max_open_trades,
            stake_amount: config.stake_amount,
        });
        let account = Account::new(config.initial_balance, config.taker_fee, config.maker_fee);
        BacktestEngine {
            config,
            strategy,
            risk_manager,
            executor: SimulationExecutor::new(),
            positions: PositionManager::new(),
            account,
            logger: Box::new(TracingLogger),
            trailing_peak: HashMap::new(),
            entry_fees: HashMap::new(),
            market_data: MarketDataProvider::new(),
            initialized: false,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Runs the backtest over every candle in `candles`, in order. Calls
    /// `strategy.init` once, then `strategy.populate_indicators` once over
    /// the full series before any candle is processed.
    pub fn run(&mut self, candles: &mut Candles) -> Result<BacktestResult, BacktestError> {
        if candles.is_empty() {
            return Err(BacktestError { index: 0, source: EngineError::Data(DataError::EmptyCandleList) });
        }
        if self.initialized {
            return Err(BacktestError { index: 0, source: EngineError::AlreadyInitialized });
        }
        self.initialized = true;

        let pair = self.config.pair.clone();
        let init_ctx = InitContext { logger: self.logger.as_ref() };
        self.strategy
            .init(&init_ctx)
            .map_err(|e| BacktestError { index: 0, source: EngineError::Strategy(e) })?;
        self.strategy
            .populate_indicators(candles)
            .map_err(|e| BacktestError { index: 0, source: EngineError::Strategy(e) })?;

        let mut trades = Vec::new();
        let mut pair_state = PairState::Flat;

        for index in 0..candles.len() {
            let candle = candles.get(index).expect("index within bounds");
            let now = candle.timestamp;
            self.market_data.update_price(pair.clone(), candle.close);

            let mut candle_failed = false;

            if let Some(position) = self.positions.get_position(&pair).cloned() {
                debug_assert!(matches!(pair_state, PairState::Open(side) if side == position.side));

                match self.try_exit(candles, index, &position, now) {
                    Ok(Some(trade)) => {
                        pair_state = PairState::Flat;
                        self.trailing_peak.remove(&pair);
                        trades.push(trade);
                    }
                    Ok(None) => {}
                    Err(EngineError::Strategy(e)) => {
                        self.logger.warn(&format!("candle {index}: exit callback failed: {e}"));
                        candle_failed = true;
                    }
                    Err(e) => return Err(BacktestError { index, source: e }),
                }
            }

            if pair_state == PairState::Flat && !candle_failed {
                match self.try_entry(candles, index, now) {
                    Ok(Some(side)) => pair_state = PairState::Open(side),
                    Ok(None) => {}
                    Err(EngineError::Strategy(e)) => {
                        self.logger.warn(&format!("candle {index}: entry callback failed: {e}"));
                    }
                    Err(e) => return Err(BacktestError { index, source: e }),
                }
            }

            let unrealized = self
                .positions
                .get_position(&pair)
                .map(|p| p.unrealized_pnl(candle.close))
                .unwrap_or(Decimal::ZERO);
            self.account.record_equity(now, self.account.balance() + unrealized);
        }

        if let Some(last) = candles.get(candles.len().saturating_sub(1)) {
            if let Some(position) = self.positions.get_position(&pair).cloned() {
                let trade = self
                    .close_position_as_trade(&position, last.close, last.timestamp, "end of backtest")
                    .map_err(|e| BacktestError { index: candles.len() - 1, source: e })?;
                trades.push(trade);
            }
        }

        self.strategy.deinit();

        let metrics = compute_metrics(&trades, self.account.equity_curve(), self.config.initial_balance, self.config.annualization_periods);

        Ok(BacktestResult {
            final_balance: self.account.balance(),
            equity_curve: self.account.equity_curve().to_vec(),
            closed_positions: self.positions.closed_positions().to_vec(),
            trades,
            metrics,
        })
    }

    /// Checks, in priority order, whether the open position for `pair`
    /// should exit on this candle: strategy signal, then minimal ROI, then
    /// stoploss, then trailing stop. At most one of these fires.
    fn try_exit(
        &mut self,
        candles: &Candles,
        index: usize,
        position: &Position,
        now: Timestamp,
    ) -> Result<Option<Trade>, EngineError> {
        let candle = candles.get(index).expect("index within bounds");
        let metadata = self.strategy.metadata().clone();

        if let Some(signal) = self
            .strategy
            .generate_exit_signal(candles, index, position)
            .map_err(EngineError::Strategy)?
        {
            if matches!(signal.signal_type, SignalType::ExitLong | SignalType::ExitShort) {
                return self
                    .close_position_as_trade(position, signal.price, now, "strategy exit signal")
                    .map(Some);
            }
        }

        let elapsed_minutes = (now.to_millis() - position.opened_at.to_millis()) / 60_000;
        let return_ratio = position.return_ratio(candle.close);

        if let Some(threshold) = metadata.minimal_roi.threshold_at(elapsed_minutes) {
            if return_ratio >= threshold {
                return self
                    .close_position_as_trade(position, candle.close, now, "minimal ROI reached")
                    .map(Some);
            }
        }

        if return_ratio <= metadata.stoploss {
            return self
                .close_position_as_trade(position, candle.close, now, "stoploss triggered")
                .map(Some);
        }

        if let Some(trailing) = metadata.trailing_stop {
            let peak = self.update_trailing_peak(&position.pair, position.side, candle.close);
            let peak_ratio = position.return_ratio(peak);
            if peak_ratio >= trailing.activate_percent {
                let retraced_ratio = match position.side {
                    Side::Long => (peak.to_float() - candle.close.to_float()) / peak.to_float(),
                    Side::Short => (candle.close.to_float() - peak.to_float()) / peak.to_float(),
                };
                if retraced_ratio >= trailing.offset_percent {
                    return self
                        .close_position_as_trade(position, candle.close, now, "trailing stop triggered")
                        .map(Some);
                }
            }
        }

        Ok(None)
    }

    /// Tracks the most favorable price seen since entry, for the trailing
    /// stop check. Seeded at the entry price rather than the first candle's
    /// close, so a position opened and immediately adverse still has a
    /// defined peak to trail from.
    fn update_trailing_peak(&mut self, pair: &TradingPair, side: Side, price: Decimal) -> Decimal {
        let entry = self
            .positions
            .get_position(pair)
            .map(|p| p.entry_price)
            .unwrap_or(price);
        let peak = self.trailing_peak.entry(pair.clone()).or_insert(entry);
        *peak = match side {
            Side::Long => peak.max(price),
            Side::Short => peak.min(price),
        };
        *peak
    }

    fn close_position_as_trade(
        &mut self,
        position: &Position,
        exit_price: Decimal,
        now: Timestamp,
        _reason: &str,
    ) -> Result<Trade, EngineError> {
        let closed = self
            .positions
            .close_position(&position.pair, exit_price, now)?
            .expect("position was known open by the caller");

        let exit_notional = closed.size * exit_price;
        let exit_fee = self.account.apply_fee(exit_notional, false);
        let entry_fee = self.entry_fees.remove(&closed.pair).unwrap_or(Decimal::ZERO);
        let commission = entry_fee + exit_fee;
        let gross_pnl = closed.realized_pnl.expect("close() always sets realized_pnl");
        self.account.realize(gross_pnl);

        Ok(Trade {
            pair: closed.pair.clone(),
            side: closed.side,
            entry_price: closed.entry_price,
            exit_price,
            size: closed.size,
            entry_time: closed.opened_at,
            exit_time: now,
            gross_pnl,
            commission,
            net_pnl: gross_pnl - commission,
        })
    }

    /// Attempts to open a new position on this candle. Returns the side
    /// opened, or `None` if the strategy proposed nothing or the attempt was
    /// rejected by risk checks.
    fn try_entry(&mut self, candles: &Candles, index: usize, now: Timestamp) -> Result<Option<Side>, EngineError> {
        let Some(signal) = self
            .strategy
            .generate_entry_signal(candles, index)
            .map_err(EngineError::Strategy)?
        else {
            return Ok(None);
        };

        let side = match signal.signal_type {
            SignalType::EntryLong => Side::Long,
            SignalType::EntryShort => Side::Short,
            _ => return Ok(None),
        };

        let size = self
            .strategy
            .calculate_position_size(&signal, &self.account)
            .map_err(EngineError::Strategy)?;

        let request = OrderRequest {
            pair: signal.pair.clone(),
            side,
            order_type: OrderType::Limit,
            amount: size,
            price: Some(signal.price),
        };

        if let Err(e) = self.risk_manager.validate_order(&request, signal.price, &self.positions) {
            self.logger.info(&format!("order for {} rejected by risk manager: {e}", request.pair));
            return Ok(None);
        }

        let order = self.executor.submit(&request, signal.price, now)?;

        let position = Position::open(request.pair.clone(), side, order.filled_amount, order.avg_fill_price, now)?;
        let notional = position.size * position.entry_price;
        let entry_fee = self.account.apply_fee(notional, false);
        self.entry_fees.insert(position.pair.clone(), entry_fee);
        self.positions.add_position(position)?;
        self.strategy.notify_order(&order);

        Ok(Some(side))
    }
}

/// Computes summary statistics over a run's trades and equity curve.
/// Mirrors the teacher's `calculate_metrics`: total return off first/last
/// equity, win rate and profit factor off realized trades, max drawdown as
/// a peak-to-trough walk of the equity curve, and Sharpe as the mean over
/// stddev of per-step equity returns, annualized by `annualization_periods`.
fn compute_metrics(
    trades: &[Trade],
    equity_curve: &[(Timestamp, Decimal)],
    initial_balance: Decimal,
    annualization_periods: f64,
) -> PerformanceMetrics {
    if equity_curve.is_empty() {
        return PerformanceMetrics::default();
    }

    let final_equity = equity_curve.last().expect("checked non-empty").1;
    let total_return = if initial_balance.is_zero() {
        0.0
    } else {
        ((final_equity - initial_balance).to_float()) / initial_balance.to_float()
    };

    let winning: Vec<&Trade> = trades.iter().filter(|t| t.net_pnl.is_positive()).collect();
    let losing: Vec<&Trade> = trades.iter().filter(|t| !t.net_pnl.is_positive()).collect();

    let win_rate = if trades.is_empty() {
        0.0
    } else {
        winning.len() as f64 / trades.len() as f64
    };

    let gross_profit: Decimal = winning.iter().map(|t| t.net_pnl).sum();
    let gross_loss: Decimal = losing.iter().map(|t| t.net_pnl.abs()).sum();
    let profit_factor = if gross_loss.is_positive() {
        gross_profit.to_float() / gross_loss.to_float()
    } else if gross_profit.is_positive() {
        f64::INFINITY
    } else {
        0.0
    };

    let mut peak = initial_balance.to_float();
    let mut max_drawdown = 0.0_f64;
    for (_, equity) in equity_curve {
        let equity = equity.to_float();
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - equity) / peak;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter_map(|w| {
            let prev = w[0].1.to_float();
            if prev == 0.0 {
                None
            } else {
                Some((w[1].1.to_float() - prev) / prev)
            }
        })
        .collect();

    let sharpe_ratio = if returns.len() > 1 {
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
        let std_dev = variance.sqrt();
        if std_dev > 0.0 {
            (mean / std_dev) * annualization_periods.sqrt()
        } else {
            0.0
        }
    } else {
        0.0
    };

    PerformanceMetrics {
        total_return,
        win_rate,
        sharpe_ratio,
        max_drawdown,
        profit_factor,
        total_trades: trades.len(),
        winning_trades: winning.len(),
        losing_trades: losing.len(),
    }
}
