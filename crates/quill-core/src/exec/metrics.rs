//! Session execution metrics
//!
//! Pure aggregation over completed batches: cumulative counters, a
//! per-tool-name table, and parallelization efficiency. No error paths.

use crate::exec::executor::BatchExecutionResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Per-tool execution statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolStats {
    /// Number of calls
    pub calls: u64,
    /// Number of successful calls
    pub successes: u64,
    /// Number of failed calls
    pub failures: u64,
    /// Total execution time across calls
    pub total_time: Duration,
    /// Average execution time per call
    pub average_time: Duration,
}

/// Cumulative session metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Number of completed tool rounds
    pub rounds: u64,
    /// Total tool calls executed
    pub total_calls: u64,
    /// Successful calls
    pub successful_calls: u64,
    /// Failed calls
    pub failed_calls: u64,
    /// Calls that executed in a parallel set
    pub parallel_calls: u64,
    /// Sum of individual call execution times
    pub total_duration: Duration,
    /// Number of batches that ran in parallel mode
    pub parallel_batches: u64,
    /// Mean efficiency across parallel batches, in [0, 1]
    pub average_efficiency: f64,
    /// Statistics per tool name
    pub per_tool: HashMap<String, ToolStats>,
}

/// Collects metrics across a session.
///
/// Append-only until [`MetricsCollector::reset`]; `snapshot` hands out a
/// defensive copy.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: ExecutionMetrics,
    efficiency_sum: f64,
}

impl MetricsCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed batch
    pub fn record_batch(&mut self, result: &BatchExecutionResult) {
        let metrics = &mut self.metrics;
        metrics.rounds += 1;
        metrics.total_calls += result.results.len() as u64;
        metrics.successful_calls += result.succeeded as u64;
        metrics.failed_calls += result.failed as u64;
        metrics.parallel_calls += result.parallel_ids.len() as u64;

        for tool_result in result.results.values() {
            let elapsed = Duration::from_millis(tool_result.execution_time_ms.unwrap_or(0));
            metrics.total_duration += elapsed;

            let stats = metrics
                .per_tool
                .entry(tool_result.tool_name.clone())
                .or_default();
            stats.calls += 1;
            if tool_result.success {
                stats.successes += 1;
            } else {
                stats.failures += 1;
            }
            stats.total_time += elapsed;
            stats.average_time = stats.total_time / stats.calls as u32;
        }

        if result.parallel_mode {
            metrics.parallel_batches += 1;
            self.efficiency_sum += batch_efficiency(result);
            metrics.average_efficiency = self.efficiency_sum / metrics.parallel_batches as f64;
        }
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        self.metrics = ExecutionMetrics::default();
        self.efficiency_sum = 0.0;
    }

    /// Defensive copy of the current metrics
    pub fn snapshot(&self) -> ExecutionMetrics {
        self.metrics.clone()
    }

    /// Human-readable session summary
    pub fn format_summary(&self) -> String {
        let m = &self.metrics;
        let mut lines = vec![format!(
            "Execution: {} rounds, {} calls ({} ok, {} failed), {:.2}s tool time, avg parallel efficiency {:.0}%",
            m.rounds,
            m.total_calls,
            m.successful_calls,
            m.failed_calls,
            m.total_duration.as_secs_f64(),
            m.average_efficiency * 100.0
        )];

        let mut tools: Vec<_> = m.per_tool.iter().collect();
        tools.sort_by(|a, b| b.1.calls.cmp(&a.1.calls).then(a.0.cmp(b.0)));
        for (name, stats) in tools {
            lines.push(format!(
                "  {}: {} calls ({} ok), avg {}ms",
                name,
                stats.calls,
                stats.successes,
                stats.average_time.as_millis()
            ));
        }

        lines.join("\n")
    }
}

/// Parallelization efficiency of one batch, in [0, 1].
///
/// The fraction of total tool time saved by running the parallel set
/// concurrently instead of back to back: the parallel calls' summed
/// durations minus the longest of them (the critical path), over the
/// batch's total tool time. Fully sequential batches score 0.
pub fn batch_efficiency(result: &BatchExecutionResult) -> f64 {
    let duration_ms = |id: &str| -> u64 {
        result
            .results
            .get(id)
            .and_then(|r| r.execution_time_ms)
            .unwrap_or(0)
    };

    let parallel_durations: Vec<u64> = result.parallel_ids.iter().map(|id| duration_ms(id)).collect();
    let parallel_sum: u64 = parallel_durations.iter().sum();
    let parallel_max: u64 = parallel_durations.iter().copied().max().unwrap_or(0);

    let total_tool_time: u64 = result
        .results
        .values()
        .map(|r| r.execution_time_ms.unwrap_or(0))
        .sum();

    if total_tool_time == 0 {
        return 0.0;
    }

    let saved = parallel_sum.saturating_sub(parallel_max) as f64;
    (saved / total_tool_time as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::ToolResult;

    fn batch(
        entries: Vec<(&str, &str, bool, u64)>,
        parallel_ids: Vec<&str>,
    ) -> BatchExecutionResult {
        let mut results = HashMap::new();
        let mut succeeded = 0;
        let mut failed = 0;
        for (id, tool, ok, ms) in entries {
            let result = if ok {
                succeeded += 1;
                ToolResult::success(id, tool, "OK").with_execution_time(ms)
            } else {
                failed += 1;
                ToolResult::error(id, tool, "failed").with_execution_time(ms)
            };
            results.insert(id.to_string(), result);
        }
        let parallel_ids: Vec<String> = parallel_ids.into_iter().map(String::from).collect();
        BatchExecutionResult {
            wall_clock: Duration::from_millis(50),
            succeeded,
            failed,
            parallel_mode: !parallel_ids.is_empty(),
            parallel_ids,
            results,
        }
    }

    #[test]
    fn test_counters_add_up() {
        let mut collector = MetricsCollector::new();
        collector.record_batch(&batch(
            vec![
                ("a", "grep", true, 10),
                ("b", "glob", true, 20),
                ("c", "write_file", false, 30),
            ],
            vec!["a", "b"],
        ));

        let m = collector.snapshot();
        assert_eq!(m.rounds, 1);
        assert_eq!(m.total_calls, 3);
        assert_eq!(m.successful_calls + m.failed_calls, m.total_calls);
        assert_eq!(m.parallel_calls, 2);
        assert_eq!(m.total_duration, Duration::from_millis(60));

        // Recording another batch increases totals by exactly its size
        collector.record_batch(&batch(vec![("d", "grep", true, 5)], vec![]));
        let m = collector.snapshot();
        assert_eq!(m.total_calls, 4);
        assert_eq!(m.rounds, 2);
    }

    #[test]
    fn test_per_tool_table() {
        let mut collector = MetricsCollector::new();
        collector.record_batch(&batch(
            vec![("a", "grep", true, 10), ("b", "grep", false, 30)],
            vec!["a", "b"],
        ));

        let m = collector.snapshot();
        let grep = &m.per_tool["grep"];
        assert_eq!(grep.calls, 2);
        assert_eq!(grep.successes, 1);
        assert_eq!(grep.failures, 1);
        assert_eq!(grep.total_time, Duration::from_millis(40));
        assert_eq!(grep.average_time, Duration::from_millis(20));
    }

    #[test]
    fn test_sequential_batch_efficiency_is_zero() {
        let b = batch(vec![("a", "bash", true, 100)], vec![]);
        assert_eq!(batch_efficiency(&b), 0.0);
    }

    #[test]
    fn test_efficiency_within_unit_interval() {
        // Three equal parallel calls: saved = 2/3 of total
        let b = batch(
            vec![
                ("a", "grep", true, 100),
                ("b", "glob", true, 100),
                ("c", "read_file", true, 100),
            ],
            vec!["a", "b", "c"],
        );
        let eff = batch_efficiency(&b);
        assert!((0.0..=1.0).contains(&eff));
        assert!((eff - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_efficiency_zero_durations() {
        let b = batch(vec![("a", "grep", true, 0)], vec!["a"]);
        assert_eq!(batch_efficiency(&b), 0.0);
    }

    #[test]
    fn test_average_efficiency_over_parallel_batches_only() {
        let mut collector = MetricsCollector::new();
        // Sequential batch contributes nothing to the average
        collector.record_batch(&batch(vec![("s", "bash", true, 50)], vec![]));
        // Parallel batch with two equal calls: efficiency 0.5
        collector.record_batch(&batch(
            vec![("a", "grep", true, 100), ("b", "glob", true, 100)],
            vec!["a", "b"],
        ));

        let m = collector.snapshot();
        assert_eq!(m.parallel_batches, 1);
        assert!((m.average_efficiency - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut collector = MetricsCollector::new();
        collector.record_batch(&batch(vec![("a", "grep", true, 10)], vec!["a"]));
        collector.reset();

        let m = collector.snapshot();
        assert_eq!(m.total_calls, 0);
        assert_eq!(m.rounds, 0);
        assert!(m.per_tool.is_empty());
    }

    #[test]
    fn test_format_summary_mentions_tools() {
        let mut collector = MetricsCollector::new();
        collector.record_batch(&batch(
            vec![("a", "grep", true, 10), ("b", "glob", true, 20)],
            vec!["a", "b"],
        ));

        let summary = collector.format_summary();
        assert!(summary.contains("grep"));
        assert!(summary.contains("glob"));
        assert!(summary.contains("2 calls"));
    }
}
