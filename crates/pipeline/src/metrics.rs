//! Per-request timing and cost accounting.
//!
//! Each query carries a [`MetricsCollector`] that records wall-clock time
//! per pipeline stage plus boolean flag metrics, and is flattened into the
//! response's timing map on completion. Cost is estimated from provider
//! token usage, falling back to a whitespace-token approximation when the
//! provider reports none.

use crate::types::CostEstimate;
use minirag_clients::TokenUsage;
use minirag_core::error::Stage;
use std::collections::BTreeMap;
use std::time::Duration;

/// Collects stage timings and flags for a single request.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    timings: BTreeMap<String, f64>,
    flags: BTreeMap<String, f64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record elapsed wall-clock time for a stage. Repeated calls for the
    /// same stage accumulate.
    pub fn record_stage(&mut self, stage: Stage, elapsed: Duration) {
        *self.timings.entry(stage.as_str().to_string()).or_insert(0.0) +=
            elapsed.as_secs_f64();
    }

    /// Set a boolean flag metric (recorded as 1.0).
    pub fn flag(&mut self, name: &str) {
        self.flags.insert(name.to_string(), 1.0);
    }

    /// Flatten into the response timing map: one entry per recorded stage,
    /// a `total` entry summing them, and any flags. Times are rounded to
    /// millisecond precision.
    pub fn finish(self) -> BTreeMap<String, f64> {
        let total: f64 = self.timings.values().sum();

        let mut out: BTreeMap<String, f64> = self
            .timings
            .into_iter()
            .map(|(name, secs)| (name, round_ms(secs)))
            .collect();
        out.insert("total".to_string(), round_ms(total));
        out.extend(self.flags);
        out
    }
}

fn round_ms(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// Whitespace-token approximation used when the provider reports no usage.
pub fn approx_token_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Price a request from token usage at a flat per-1k-token rate.
pub fn estimate_cost(usage: &TokenUsage, price_per_1k_tokens_usd: f64, note: Option<String>) -> CostEstimate {
    CostEstimate {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
        estimated_cost_usd: usage.total_tokens as f64 / 1000.0 * price_per_1k_tokens_usd,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_includes_stages_and_total() {
        let mut metrics = MetricsCollector::new();
        metrics.record_stage(Stage::Embed, Duration::from_millis(120));
        metrics.record_stage(Stage::Retrieve, Duration::from_millis(80));
        metrics.record_stage(Stage::Generate, Duration::from_millis(300));

        let map = metrics.finish();
        assert_eq!(map["embed"], 0.12);
        assert_eq!(map["retrieve"], 0.08);
        assert_eq!(map["generate"], 0.3);
        assert!((map["total"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_stage_accumulates() {
        let mut metrics = MetricsCollector::new();
        metrics.record_stage(Stage::Embed, Duration::from_millis(100));
        metrics.record_stage(Stage::Embed, Duration::from_millis(150));

        let map = metrics.finish();
        assert_eq!(map["embed"], 0.25);
    }

    #[test]
    fn test_flags_survive_finish() {
        let mut metrics = MetricsCollector::new();
        metrics.record_stage(Stage::Rerank, Duration::from_millis(10));
        metrics.flag("rerank_degraded");

        let map = metrics.finish();
        assert_eq!(map["rerank_degraded"], 1.0);
        assert_eq!(map["rerank"], 0.01);
    }

    #[test]
    fn test_cost_estimate_from_usage() {
        let usage = TokenUsage::new(800, 200);
        let cost = estimate_cost(&usage, 0.0001, None);

        assert_eq!(cost.total_tokens, 1000);
        assert!((cost.estimated_cost_usd - 0.0001).abs() < 1e-12);
        assert!(cost.note.is_none());
    }

    #[test]
    fn test_approx_token_count() {
        assert_eq!(approx_token_count("three word phrase"), 3);
        assert_eq!(approx_token_count("   "), 0);
    }
}
