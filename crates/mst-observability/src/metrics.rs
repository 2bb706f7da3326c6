use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::Serialize;

pub const DEFAULT_WINDOW_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy)]
struct LlmSample {
    latency_ms: f64,
    tokens: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TradeOutcome {
    pub profit_loss: f64,
    pub won: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    pub count: usize,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LlmStats {
    pub latency: LatencyStats,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TradeStats {
    pub count: usize,
    pub win_rate: f64,
    pub total_profit_loss: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub api_latency: HashMap<String, LatencyStats>,
    pub llm_latency: HashMap<String, LlmStats>,
    pub trade_outcomes: TradeStats,
}

/// Rolling-window metrics collector. Each category is a fixed-capacity
/// `VecDeque` guarded by its own lock, per the append-only-under-one-lock
/// rule — readers take a snapshot copy rather than holding a lock while
/// computing percentiles.
pub struct MetricsCollector {
    window_size: usize,
    api_timings: Mutex<HashMap<String, VecDeque<f64>>>,
    llm_timings: Mutex<HashMap<String, VecDeque<LlmSample>>>,
    trade_outcomes: Mutex<VecDeque<TradeOutcome>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl MetricsCollector {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            api_timings: Mutex::new(HashMap::new()),
            llm_timings: Mutex::new(HashMap::new()),
            trade_outcomes: Mutex::new(VecDeque::new()),
        }
    }

    fn push_bounded<T>(window_size: usize, buf: &mut VecDeque<T>, value: T) {
        buf.push_back(value);
        while buf.len() > window_size {
            buf.pop_front();
        }
    }

    pub fn record_api_timing(&self, endpoint: &str, latency_ms: f64) {
        let mut map = self.api_timings.lock().unwrap();
        let buf = map.entry(endpoint.to_string()).or_default();
        Self::push_bounded(self.window_size, buf, latency_ms);
    }

    pub fn record_llm_timing(&self, model: &str, latency_ms: f64, tokens: u32) {
        let mut map = self.llm_timings.lock().unwrap();
        let buf = map.entry(model.to_string()).or_default();
        Self::push_bounded(self.window_size, buf, LlmSample { latency_ms, tokens });
    }

    pub fn record_trade_outcome(&self, profit_loss: f64) {
        let mut buf = self.trade_outcomes.lock().unwrap();
        Self::push_bounded(self.window_size, &mut buf, TradeOutcome { profit_loss, won: profit_loss > 0.0 });
    }

    /// Clears every window. Test/ops utility — not used on the hot path.
    pub fn reset_metrics(&self) {
        self.api_timings.lock().unwrap().clear();
        self.llm_timings.lock().unwrap().clear();
        self.trade_outcomes.lock().unwrap().clear();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let api_latency = self
            .api_timings
            .lock()
            .unwrap()
            .iter()
            .map(|(endpoint, buf)| (endpoint.clone(), latency_stats(buf.iter().copied())))
            .collect();

        let llm_latency = self
            .llm_timings
            .lock()
            .unwrap()
            .iter()
            .map(|(model, buf)| {
                let total_tokens: u64 = buf.iter().map(|s| s.tokens as u64).sum();
                let latency = latency_stats(buf.iter().map(|s| s.latency_ms));
                (model.clone(), LlmStats { latency, total_tokens })
            })
            .collect();

        let trade_buf = self.trade_outcomes.lock().unwrap();
        let trade_outcomes = TradeStats {
            count: trade_buf.len(),
            win_rate: if trade_buf.is_empty() {
                0.0
            } else {
                trade_buf.iter().filter(|o| o.won).count() as f64 / trade_buf.len() as f64 * 100.0
            },
            total_profit_loss: trade_buf.iter().map(|o| o.profit_loss).sum(),
        };

        MetricsSnapshot { api_latency, llm_latency, trade_outcomes }
    }
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

fn latency_stats(values: impl Iterator<Item = f64>) -> LatencyStats {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    LatencyStats {
        count: sorted.len(),
        p50: percentile_sorted(&sorted, 50.0),
        p95: percentile_sorted(&sorted, 95.0),
        p99: percentile_sorted(&sorted, 99.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_evicts_oldest_samples() {
        let collector = MetricsCollector::new(3);
        for i in 1..=5 {
            collector.record_api_timing("/quote", i as f64);
        }
        let snapshot = collector.snapshot();
        let stats = &snapshot.api_latency["/quote"];
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn trade_outcomes_compute_win_rate() {
        let collector = MetricsCollector::default();
        collector.record_trade_outcome(100.0);
        collector.record_trade_outcome(-50.0);
        collector.record_trade_outcome(25.0);
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.trade_outcomes.count, 3);
        assert!((snapshot.trade_outcomes.win_rate - 66.6666).abs() < 0.01);
        assert_eq!(snapshot.trade_outcomes.total_profit_loss, 75.0);
    }

    #[test]
    fn reset_clears_every_category() {
        let collector = MetricsCollector::default();
        collector.record_api_timing("/quote", 5.0);
        collector.record_llm_timing("gpt", 100.0, 50);
        collector.record_trade_outcome(10.0);
        collector.reset_metrics();
        let snapshot = collector.snapshot();
        assert!(snapshot.api_latency.is_empty());
        assert!(snapshot.llm_latency.is_empty());
        assert_eq!(snapshot.trade_outcomes.count, 0);
    }
}
