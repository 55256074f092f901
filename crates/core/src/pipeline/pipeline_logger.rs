use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use super::mask_status::MaskStatus;

/// Cross-cutting observer for per-request pipeline events.
///
/// Shared by every worker, so methods take `&self` and implementations
/// synchronize internally.
pub trait PipelineLogger: Send + Sync {
    /// Record how long a named stage took for one request.
    fn timing(&self, stage: &str, duration_ms: f64);

    /// Record the final status of one request.
    fn outcome(&self, status: MaskStatus);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&self, _stage: &str, _duration_ms: f64) {}
    fn outcome(&self, _status: MaskStatus) {}
}

#[derive(Default)]
struct Stats {
    timings: HashMap<String, Vec<f64>>,
    outcomes: HashMap<MaskStatus, usize>,
}

/// Collects stage timings and outcome counts for a summary report.
pub struct StatsPipelineLogger {
    stats: Mutex<Stats>,
    start_time: Instant,
}

impl StatsPipelineLogger {
    pub fn new() -> Self {
        Self {
            stats: Mutex::new(Stats::default()),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        let stats = self.stats();
        let requests: usize = stats.outcomes.values().sum();
        if requests == 0 && stats.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({requests} photos, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = stats.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &stats.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        for status in MaskStatus::ALL {
            if let Some(count) = stats.outcomes.get(&status) {
                lines.push(format!("  {status}: {count}"));
            }
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<Vec<f64>> {
        self.stats().timings.get(stage).cloned()
    }

    pub fn count(&self, status: MaskStatus) -> usize {
        self.stats().outcomes.get(&status).copied().unwrap_or(0)
    }

    fn stats(&self) -> std::sync::MutexGuard<'_, Stats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StatsPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StatsPipelineLogger {
    fn timing(&self, stage: &str, duration_ms: f64) {
        self.stats()
            .timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn outcome(&self, status: MaskStatus) {
        *self.stats().outcomes.entry(status).or_default() += 1;
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
