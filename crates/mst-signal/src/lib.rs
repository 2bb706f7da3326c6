//! Signal generator (C6): daily→weekly sentiment aggregation, VIX
//! normalization and weighting, sigmoid/linear ratio mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const VIX_FALLBACK_NEUTRAL: f64 = 20.0;
pub const VIX_MIN: f64 = 10.0;
pub const VIX_MAX: f64 = 40.0;
pub const VIX_ABNORMAL_THRESHOLD: f64 = 40.0;

/// Empirical constants from the original system. Not independently derived
/// — kept as documented defaults, configurable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SignalMethod {
    Sigmoid { steepness: f64, center: f64 },
    Linear { min: f64, max: f64 },
}

impl Default for SignalMethod {
    fn default() -> Self {
        SignalMethod::Sigmoid {
            steepness: 0.3,
            center: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalConfig {
    pub method: SignalMethod,
    pub window_days: i64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            method: SignalMethod::default(),
            window_days: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalInterpretation {
    StrongSell,
    Neutral,
    StrongBuy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalResult {
    pub ratio: i32,
    pub interpretation: SignalInterpretation,
    pub weekly_signal: f64,
    pub vix_normalized: f64,
}

/// Clamp to [10, 40] and linearly map to [0, 1].
pub fn normalize_vix(vix: f64) -> f64 {
    let clamped = vix.clamp(VIX_MIN, VIX_MAX);
    (clamped - VIX_MIN) / (VIX_MAX - VIX_MIN)
}

/// Group quantified sentiment scores by calendar date (UTC) and average each
/// day's scores, returning the per-day means in chronological order.
pub fn daily_scores(scored: &[(DateTime<Utc>, f64)]) -> Vec<f64> {
    let mut by_day: BTreeMap<chrono::NaiveDate, Vec<f64>> = BTreeMap::new();
    for (ts, score) in scored {
        by_day.entry(ts.date_naive()).or_default().push(*score);
    }
    by_day
        .into_values()
        .map(|scores| scores.iter().sum::<f64>() / scores.len() as f64)
        .collect()
}

fn ratio_from_signal(signal: f64, method: SignalMethod) -> i32 {
    let raw = match method {
        SignalMethod::Sigmoid { steepness, center } => {
            100.0 * (1.0 / (1.0 + (-(steepness) * (signal - center)).exp()))
        }
        SignalMethod::Linear { min, max } => {
            let clamped = signal.clamp(min, max);
            ((clamped - min) / (max - min)) * 100.0
        }
    };
    raw.round().clamp(0.0, 100.0) as i32
}

pub fn interpret(ratio: i32) -> SignalInterpretation {
    if ratio <= 30 {
        SignalInterpretation::StrongSell
    } else if ratio >= 71 {
        SignalInterpretation::StrongBuy
    } else {
        SignalInterpretation::Neutral
    }
}

/// Full C6 pipeline. `vix` is `None` when the external quote source could
/// not be reached; the fallback neutral value is substituted so a
/// momentary VIX-feed outage never stops signal generation. Empty
/// `daily_scores` is a boundary case: ratio = 50 ("Neutral"), matching the
/// spec's explicit boundary behavior.
pub fn calculate_buy_sell_ratio(
    daily_scores: &[f64],
    vix: Option<f64>,
    config: &SignalConfig,
) -> SignalResult {
    if daily_scores.is_empty() {
        return SignalResult {
            ratio: 50,
            interpretation: SignalInterpretation::Neutral,
            weekly_signal: 0.0,
            vix_normalized: 0.0,
        };
    }

    let vix_value = vix.unwrap_or(VIX_FALLBACK_NEUTRAL);
    let vix_normalized = normalize_vix(vix_value);
    let weekly_signal: f64 = daily_scores.iter().sum::<f64>() * (1.0 + vix_normalized);
    let ratio = ratio_from_signal(weekly_signal, config.method);

    SignalResult {
        ratio,
        interpretation: interpret(ratio),
        weekly_signal,
        vix_normalized,
    }
}

/// Simplified signal path used by the backtest engine (C10) by default: no
/// VIX weighting, direct linear remap of mean sentiment in [-1.5, 1.0] to
/// [0, 100]. See SPEC_FULL §4.10 for why this diverges from the live
/// pipeline above.
pub fn simplified_ratio(mean_sentiment: f64) -> i32 {
    let normalized = ((mean_sentiment + 1.5) / 2.5) * 100.0;
    normalized.round().clamp(0.0, 100.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vix_normalization_clamps_and_scales() {
        assert_eq!(normalize_vix(10.0), 0.0);
        assert_eq!(normalize_vix(40.0), 1.0);
        assert_eq!(normalize_vix(25.0), 0.5);
        assert_eq!(normalize_vix(5.0), 0.0);
        assert_eq!(normalize_vix(100.0), 1.0);
    }

    #[test]
    fn empty_sentiment_list_is_neutral_fifty() {
        let r = calculate_buy_sell_ratio(&[], Some(20.0), &SignalConfig::default());
        assert_eq!(r.ratio, 50);
        assert_eq!(r.interpretation, SignalInterpretation::Neutral);
    }

    #[test]
    fn all_positive_week_yields_strong_buy() {
        let daily = vec![1.0; 7];
        let r = calculate_buy_sell_ratio(&daily, Some(10.0 + 30.0 * 0.8), &SignalConfig::default());
        assert!(r.ratio >= 71, "ratio was {}", r.ratio);
        assert_eq!(r.interpretation, SignalInterpretation::StrongBuy);
    }

    #[test]
    fn all_negative_week_yields_strong_sell() {
        let daily = vec![-1.5; 7];
        let r = calculate_buy_sell_ratio(&daily, Some(20.0), &SignalConfig::default());
        assert!(r.ratio <= 30, "ratio was {}", r.ratio);
        assert_eq!(r.interpretation, SignalInterpretation::StrongSell);
    }

    #[test]
    fn all_neutral_week_is_in_band() {
        let daily = vec![0.0; 7];
        let r = calculate_buy_sell_ratio(&daily, Some(20.0), &SignalConfig::default());
        assert!((40..=60).contains(&r.ratio), "ratio was {}", r.ratio);
    }

    #[test]
    fn scenario_s1_conservative_bias_balance() {
        // One Positive (+1.0), one Negative (-1.5) today; VIX_norm = 0.0.
        let daily = daily_scores(&[
            (Utc::now(), 1.0),
            (Utc::now(), -1.5),
        ]);
        assert_eq!(daily.len(), 1);
        assert!((daily[0] - (-0.25)).abs() < 1e-9);
        let r = calculate_buy_sell_ratio(&daily, Some(VIX_MIN), &SignalConfig::default());
        assert!((45..=50).contains(&r.ratio), "ratio was {}", r.ratio);
    }

    #[test]
    fn scenario_s2_all_positive_week_high_vix() {
        let daily = vec![1.0; 7];
        // VIX_norm = 0.8 => vix = 10 + 0.8*30 = 34
        let r = calculate_buy_sell_ratio(&daily, Some(34.0), &SignalConfig::default());
        assert!((r.weekly_signal - 12.6).abs() < 1e-9);
        assert!(r.ratio >= 95, "ratio was {}", r.ratio);
        assert_eq!(r.interpretation, SignalInterpretation::StrongBuy);
    }

    #[test]
    fn higher_vix_does_not_reduce_signal_magnitude_for_nonzero_scores() {
        let daily = vec![0.5; 3];
        let low = calculate_buy_sell_ratio(&daily, Some(10.0), &SignalConfig::default());
        let high = calculate_buy_sell_ratio(&daily, Some(40.0), &SignalConfig::default());
        assert!(high.weekly_signal.abs() >= low.weekly_signal.abs());
    }

    #[test]
    fn simplified_ratio_matches_backtest_boundary() {
        assert_eq!(simplified_ratio(-1.5), 0);
        assert_eq!(simplified_ratio(1.0), 100);
        assert_eq!(simplified_ratio(0.0), 60);
    }
}
