//! Parallelization classifier
//!
//! Pure decision logic that partitions a batch of tool calls into a
//! parallel-eligible set and a sequential set. No side effects, no
//! dependency on the executor — the partition is computed from tool name
//! categories, configuration overrides, and same-resource conflict
//! detection over the raw arguments.
//!
//! Conflict detection fails closed: a mutating call whose resource
//! identifier cannot be extracted from its arguments is treated as
//! conflicting, which sends the entire batch down the sequential path.

use crate::config::ExecutionConfig;
use crate::tools::names;
use crate::tools::types::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Classifier configuration, derived from [`ExecutionConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Whether parallel execution is enabled at all
    pub parallel_enabled: bool,
    /// Executor concurrency bound (informational; the semaphore enforces it)
    pub max_concurrency: usize,
    /// Tool names that must always execute sequentially
    pub force_sequential: Vec<String>,
    /// Tool names treated as read-only in addition to the built-in table
    pub additional_read_only: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            parallel_enabled: true,
            max_concurrency: 8,
            force_sequential: Vec::new(),
            additional_read_only: Vec::new(),
        }
    }
}

impl From<&ExecutionConfig> for ClassifierConfig {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            parallel_enabled: config.parallel_enabled,
            max_concurrency: config.max_concurrency,
            force_sequential: config.force_sequential.clone(),
            additional_read_only: config.additional_read_only.clone(),
        }
    }
}

impl ClassifierConfig {
    /// Classify a single call as read-only or mutating.
    ///
    /// Precedence: force-sequential list, then additional read-only list,
    /// then the static table, then the name heuristic. Unrecognized names
    /// default to mutating.
    pub fn is_read_only(&self, name: &str) -> bool {
        if self.force_sequential.iter().any(|n| n == name) {
            return false;
        }
        if self.additional_read_only.iter().any(|n| n == name) {
            return true;
        }
        names::is_known_read_only(name) || names::looks_read_only(name)
    }
}

/// Derived partition of a batch for one round
#[derive(Debug, Clone)]
pub struct ClassifiedBatch {
    /// Calls eligible to run concurrently, in submission order
    pub parallel: Vec<ToolCall>,
    /// Calls that must run one at a time, in submission order
    pub sequential: Vec<ToolCall>,
    /// Whether any part of the batch runs in parallel mode
    pub parallel_mode: bool,
}

impl ClassifiedBatch {
    /// Total number of calls in the batch
    pub fn len(&self) -> usize {
        self.parallel.len() + self.sequential.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.parallel.is_empty() && self.sequential.is_empty()
    }

    /// Whether the given call id was classified parallel-eligible
    pub fn is_parallel(&self, call_id: &str) -> bool {
        self.parallel.iter().any(|c| c.id == call_id)
    }

    fn all_sequential(calls: &[ToolCall]) -> Self {
        Self {
            parallel: Vec::new(),
            sequential: calls.to_vec(),
            parallel_mode: false,
        }
    }

    fn all_parallel(calls: &[ToolCall]) -> Self {
        Self {
            parallel: calls.to_vec(),
            sequential: Vec::new(),
            parallel_mode: true,
        }
    }
}

/// Extract the resource identifier a mutating call targets.
///
/// Probes the well-known argument keys in order and returns the first
/// string value. `None` means the arguments carry no recognizable target,
/// which the conflict check treats as a conflict.
fn resource_target(call: &ToolCall) -> Option<String> {
    names::RESOURCE_ARGUMENT_KEYS
        .iter()
        .find_map(|key| call.get_string(key))
}

/// Named fail-closed conflict policy over the mutating subset of a batch.
///
/// Returns true when two or more mutating calls target the same resource
/// identifier, or when any mutating call's target cannot be extracted.
fn conflicts_fail_closed(mutating: &[&ToolCall]) -> bool {
    let mut seen = HashSet::new();
    for call in mutating {
        match resource_target(call) {
            Some(target) => {
                if !seen.insert(target) {
                    debug!(tool = %call.name, "mutating calls share a resource target");
                    return true;
                }
            }
            None => {
                debug!(tool = %call.name, "no resource target extractable, failing closed");
                return true;
            }
        }
    }
    false
}

/// Partition a batch into parallel-eligible and sequential sets.
///
/// The partition preserves submission order within each set. See the
/// module docs for the decision rules.
pub fn classify(calls: &[ToolCall], config: &ClassifierConfig) -> ClassifiedBatch {
    if !config.parallel_enabled || calls.len() <= 1 {
        return ClassifiedBatch::all_sequential(calls);
    }

    let mutating: Vec<&ToolCall> = calls
        .iter()
        .filter(|call| !config.is_read_only(&call.name))
        .collect();

    if mutating.is_empty() {
        return ClassifiedBatch::all_parallel(calls);
    }

    if conflicts_fail_closed(&mutating) {
        return ClassifiedBatch::all_sequential(calls);
    }

    // A single mutation with a distinct target runs alongside the reads.
    if mutating.len() == 1 {
        return ClassifiedBatch::all_parallel(calls);
    }

    // Several mutations on distinct resources: reads keep their parallel
    // eligibility, mutations execute one at a time.
    let mutating_ids: HashSet<&str> = mutating.iter().map(|c| c.id.as_str()).collect();
    let (sequential, parallel): (Vec<ToolCall>, Vec<ToolCall>) = calls
        .iter()
        .cloned()
        .partition(|call| mutating_ids.contains(call.id.as_str()));

    let parallel_mode = !parallel.is_empty();
    ClassifiedBatch {
        parallel,
        sequential,
        parallel_mode,
    }
}
