//! Strategy signals, ROI ladders, and the metadata/config a strategy exposes
//! about itself.

use crate::error::SignalError;
use crate::money::Decimal;
use crate::time::{Timeframe, Timestamp};
use crate::types::{Side, TradingPair};
use serde::{Deserialize, Serialize};

/// What kind of action a signal is proposing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    EntryLong,
    EntryShort,
    ExitLong,
    ExitShort,
    Hold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub name: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalMetadata {
    pub reason: Option<String>,
    pub indicators: Vec<IndicatorSnapshot>,
}

/// A strategy's proposed action on a given candle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub signal_type: SignalType,
    pub pair: TradingPair,
    pub side: Side,
    pub price: Decimal,
    /// Confidence in [0, 1]; purely informational, the engine does not scale
    /// position size by it (strategies may do so themselves in
    /// `calculate_position_size`).
    pub strength: f64,
    pub timestamp: Timestamp,
    pub metadata: Option<SignalMetadata>,
}

impl Signal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        signal_type: SignalType,
        pair: TradingPair,
        side: Side,
        price: Decimal,
        strength: f64,
        timestamp: Timestamp,
        metadata: Option<SignalMetadata>,
    ) -> Result<Self, SignalError> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(SignalError::StrengthOutOfRange(strength));
        }
        Ok(Signal {
            signal_type,
            pair,
            side,
            price,
            strength,
            timestamp,
            metadata,
        })
    }
}

/// One step of a minimal-ROI ladder: after `time_minutes` elapsed, exit once
/// unrealized return reaches `profit_ratio`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoiStep {
    pub time_minutes: u32,
    pub profit_ratio: f64,
}

/// A time-ordered schedule of profit-taking thresholds. Entries must be
/// sorted by non-decreasing `time_minutes`; ties resolve to the latest
/// (highest-index) entry sharing that time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimalROI(Vec<RoiStep>);

impl MinimalROI {
    pub fn new(steps: Vec<RoiStep>) -> Result<Self, SignalError> {
        let roi = MinimalROI(steps);
        roi.validate()?;
        Ok(roi)
    }

    /// Re-checks the invariants `new` enforces at construction. Needed
    /// because `MinimalROI` also derives `Deserialize`, which can produce a
    /// schedule that never went through `new` — callers that accept a
    /// schedule from outside (e.g. `StrategyConfig::validate`) must call
    /// this explicitly.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.0.windows(2).any(|w| w[0].time_minutes > w[1].time_minutes) {
            return Err(SignalError::NonMonotonicRoiSchedule);
        }
        if let Some(step) = self.0.iter().find(|step| step.profit_ratio < 0.0) {
            return Err(SignalError::NegativeRoiProfitRatio(step.profit_ratio));
        }
        Ok(())
    }

    /// The applicable profit-ratio threshold for a position that has been
    /// open for `elapsed_minutes`, or `None` if no step has been reached yet.
    pub fn threshold_at(&self, elapsed_minutes: i64) -> Option<f64> {
        self.0
            .iter()
            .filter(|step| i64::from(step.time_minutes) <= elapsed_minutes)
            .last()
            .map(|step| step.profit_ratio)
    }

    pub fn steps(&self) -> &[RoiStep] {
        &self.0
    }
}

/// Trailing-stop configuration: once favorable movement reaches
/// `activate_percent`, a retracement of `offset_percent` from the peak
/// triggers an exit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrailingStopConfig {
    pub activate_percent: f64,
    pub offset_percent: f64,
}

impl TrailingStopConfig {
    pub fn new(activate_percent: f64, offset_percent: f64) -> Result<Self, SignalError> {
        if offset_percent > activate_percent {
            return Err(SignalError::TrailingOffsetExceedsActivation {
                offset: offset_percent,
                activate: activate_percent,
            });
        }
        Ok(TrailingStopConfig {
            activate_percent,
            offset_percent,
        })
    }
}

/// Static, strategy-authored identity: name, version, timeframe, and the
/// exit ladders the engine enforces alongside the strategy's own signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMetadata {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub strategy_type: String,
    pub timeframe: Timeframe,
    pub startup_candle_count: usize,
    pub minimal_roi: MinimalROI,
    pub stoploss: f64,
    pub trailing_stop: Option<TrailingStopConfig>,
}

/// A single named/valued strategy parameter, for optimization sweeps and
/// reporting — the value is an opaque JSON scalar since parameters can be
/// numeric, boolean, or a short enum string depending on the strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyParameter {
    pub name: String,
    pub value: serde_json::Value,
}

/// Per-run configuration a strategy is instantiated with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub version: String,
    pub pair: TradingPair,
    pub timeframe: Timeframe,
    pub max_open_trades: usize,
    pub stake_amount: Decimal,
    pub trailing_stop: Option<TrailingStopConfig>,
    pub parameters: Vec<StrategyParameter>,
    pub minimal_roi: Option<MinimalROI>,
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.name.trim().is_empty() {
            return Err(SignalError::InvalidParameter("name must not be empty".into()));
        }
        if self.version.trim().is_empty() {
            return Err(SignalError::InvalidParameter("version must not be empty".into()));
        }
        if let Some(trailing) = &self.trailing_stop {
            TrailingStopConfig::new(trailing.activate_percent, trailing.offset_percent)?;
        }
        if let Some(roi) = &self.minimal_roi {
            roi.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_rejects_out_of_range_strength() {
        let pair = TradingPair::new("BTC", "USDT");
        let result = Signal::new(
            SignalType::EntryLong,
            pair,
            Side::Long,
            Decimal::from_int(100),
            1.5,
            Timestamp::from_millis(0),
            None,
        );
        assert!(matches!(result, Err(SignalError::StrengthOutOfRange(_))));
    }

    #[test]
    fn roi_schedule_rejects_non_monotonic_entries() {
        let result = MinimalROI::new(vec![
            RoiStep { time_minutes: 30, profit_ratio: 0.05 },
            RoiStep { time_minutes: 10, profit_ratio: 0.10 },
        ]);
        assert!(matches!(result, Err(SignalError::NonMonotonicRoiSchedule)));
    }

    #[test]
    fn roi_threshold_picks_latest_applicable_step() {
        let roi = MinimalROI::new(vec![
            RoiStep { time_minutes: 0, profit_ratio: 0.10 },
            RoiStep { time_minutes: 30, profit_ratio: 0.05 },
            RoiStep { time_minutes: 60, profit_ratio: 0.02 },
        ])
        .unwrap();
        assert_eq!(roi.threshold_at(0), Some(0.10));
        assert_eq!(roi.threshold_at(29), Some(0.10));
        assert_eq!(roi.threshold_at(30), Some(0.05));
        assert_eq!(roi.threshold_at(90), Some(0.02));
    }

    #[test]
    fn roi_threshold_ties_resolve_to_latest_entry() {
        let roi = MinimalROI::new(vec![
            RoiStep { time_minutes: 30, profit_ratio: 0.05 },
            RoiStep { time_minutes: 30, profit_ratio: 0.08 },
        ])
        .unwrap();
        assert_eq!(roi.threshold_at(30), Some(0.08));
    }

    #[test]
    fn trailing_stop_rejects_offset_exceeding_activation() {
        let result = TrailingStopConfig::new(0.02, 0.05);
        assert!(matches!(result, Err(SignalError::TrailingOffsetExceedsActivation { .. })));
    }

    #[test]
    fn roi_schedule_rejects_negative_profit_ratio() {
        let result = MinimalROI::new(vec![
            RoiStep { time_minutes: 0, profit_ratio: 0.10 },
            RoiStep { time_minutes: 30, profit_ratio: -0.05 },
        ]);
        assert!(matches!(result, Err(SignalError::NegativeRoiProfitRatio(r)) if r == -0.05));
    }

    #[test]
    fn strategy_config_validate_rejects_negative_roi_from_deserialized_schedule() {
        let pair = TradingPair::new("BTC", "USDT");
        let config = StrategyConfig {
            name: "test".into(),
            version: "1.0".into(),
            pair,
            timeframe: Timeframe::H1,
            max_open_trades: 1,
            stake_amount: Decimal::from_int(100),
            trailing_stop: None,
            parameters: Vec::new(),
            // Bypasses MinimalROI::new, exercising the deserialize-bypass path.
            minimal_roi: Some(MinimalROI(vec![RoiStep { time_minutes: 0, profit_ratio: -0.01 }])),
        };
        assert!(matches!(
            config.validate(),
            Err(SignalError::NegativeRoiProfitRatio(_))
        ));
    }
}
