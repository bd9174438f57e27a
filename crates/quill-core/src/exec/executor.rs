//! Bounded-concurrency batch executor
//!
//! Executes a classified batch and guarantees a result for every call. The
//! parallel set runs as spawned tasks gated by a counting semaphore; the
//! sequential set runs strictly one at a time, in submission order, and may
//! overlap in time with the parallel set. Each call is raced against a
//! per-call timeout.
//!
//! Timeout policy: the executor detaches rather than interrupts. When the
//! deadline fires, the dispatch future is dropped, which cancels in-process
//! work at its next await point; dispatchers owning OS resources must tie
//! them to the future's lifetime (see [`crate::tools::ToolDispatcher`]).

use crate::config::ExecutionConfig;
use crate::exec::classifier::ClassifiedBatch;
use crate::tools::registry::SharedToolDispatcher;
use crate::tools::types::{ToolCall, ToolResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of executing one classified batch.
///
/// The key set of `results` always equals the batch's call-id set exactly:
/// timeouts, panics, and cancelled calls all produce failed entries rather
/// than holes.
#[derive(Debug)]
pub struct BatchExecutionResult {
    /// Result per call id
    pub results: HashMap<String, ToolResult>,
    /// Wall-clock duration of the whole batch (not the sum of call times)
    pub wall_clock: Duration,
    /// Number of successful calls
    pub succeeded: usize,
    /// Number of failed calls
    pub failed: usize,
    /// Whether the batch ran in parallel mode
    pub parallel_mode: bool,
    /// Call ids that executed in the parallel set
    pub parallel_ids: Vec<String>,
}

impl BatchExecutionResult {
    /// Total number of calls in the batch
    pub fn total(&self) -> usize {
        self.results.len()
    }
}

/// Executes classified batches under a concurrency bound.
///
/// Stateless with respect to conversation history; communicates with tools
/// only through [`ToolResult`] values.
pub struct BatchExecutor {
    dispatcher: SharedToolDispatcher,
    semaphore: Arc<Semaphore>,
    default_timeout: Duration,
    cancellation: CancellationToken,
}

impl BatchExecutor {
    /// Create a new executor from configuration
    pub fn new(dispatcher: SharedToolDispatcher, config: &ExecutionConfig) -> Self {
        Self {
            dispatcher,
            semaphore: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            default_timeout: config.tool_timeout,
            cancellation: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token (for wiring into a session hierarchy)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Get a child cancellation token
    pub fn child_token(&self) -> CancellationToken {
        self.cancellation.child_token()
    }

    /// Cancel all pending work
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    fn timeout_for(&self, call: &ToolCall) -> Duration {
        self.dispatcher
            .timeout_for(&call.name)
            .unwrap_or(self.default_timeout)
    }

    /// Execute a classified batch, producing one result per call.
    ///
    /// The sequential set polls cancellation before each call; once
    /// cancellation is observed, remaining sequential calls are not
    /// dispatched and receive failed cancellation results so the result
    /// map stays complete. Already-spawned parallel calls are not
    /// interrupted; their results are still collected here and it is the
    /// caller's decision whether to discard them.
    pub async fn execute(&self, batch: ClassifiedBatch) -> BatchExecutionResult {
        let start = Instant::now();
        let total = batch.len();
        let parallel_mode = batch.parallel_mode;
        let parallel_ids: Vec<String> = batch.parallel.iter().map(|c| c.id.clone()).collect();
        let mut results: HashMap<String, ToolResult> = HashMap::with_capacity(total);

        debug!(
            parallel = batch.parallel.len(),
            sequential = batch.sequential.len(),
            "executing tool batch"
        );

        // Spawn the parallel set first so it overlaps with the sequential
        // lane below. Each task holds an owned semaphore permit for the
        // duration of its dispatch.
        let mut handles = Vec::with_capacity(batch.parallel.len());
        for call in batch.parallel {
            let dispatcher = Arc::clone(&self.dispatcher);
            let semaphore = Arc::clone(&self.semaphore);
            let per_call_timeout = self.timeout_for(&call);
            let call_id = call.id.clone();
            let call_name = call.name.clone();

            let handle = tokio::spawn(async move {
                // A closed semaphore cannot happen here; treat it as failure
                // rather than unwrap to keep the no-panic contract.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ToolResult::error(
                            &call.id,
                            &call.name,
                            "Executor semaphore closed",
                        );
                    }
                };
                match timeout(per_call_timeout, dispatcher.dispatch(&call)).await {
                    Ok(result) => result,
                    Err(_) => ToolResult::error(
                        &call.id,
                        &call.name,
                        &format!("Tool execution timed out after {:?}", per_call_timeout),
                    ),
                }
            });
            handles.push((call_id, call_name, handle));
        }

        // Sequential set: strictly in submission order, one at a time.
        for call in batch.sequential {
            if self.cancellation.is_cancelled() {
                results.insert(
                    call.id.clone(),
                    ToolResult::error(&call.id, &call.name, "Execution cancelled"),
                );
                continue;
            }
            let per_call_timeout = self.timeout_for(&call);
            let result = match timeout(per_call_timeout, self.dispatcher.dispatch(&call)).await {
                Ok(result) => result,
                Err(_) => ToolResult::error(
                    &call.id,
                    &call.name,
                    &format!("Tool execution timed out after {:?}", per_call_timeout),
                ),
            };
            results.insert(call.id.clone(), result);
        }

        // Collect the parallel set. A panicking dispatch surfaces as a
        // JoinError and becomes a failed result for that call only.
        for (call_id, call_name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => {
                    warn!(tool = %call_name, error = %err, "tool dispatch task failed");
                    ToolResult::error(
                        &call_id,
                        &call_name,
                        &format!("Tool dispatch failed: {}", err),
                    )
                }
            };
            results.insert(call_id, result);
        }

        let succeeded = results.values().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        let wall_clock = start.elapsed();

        debug!(
            total,
            succeeded,
            failed,
            ?wall_clock,
            parallel_mode,
            "tool batch finished"
        );

        BatchExecutionResult {
            results,
            wall_clock,
            succeeded,
            failed,
            parallel_mode,
            parallel_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::classifier::{classify, ClassifierConfig};
    use crate::tools::registry::ToolDispatcher;
    use crate::tools::types::ToolSchema;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Dispatcher that sleeps for a fixed delay and records dispatch order
    struct SlowDispatcher {
        delay: Duration,
        dispatched: Mutex<Vec<String>>,
        in_flight: AtomicU32,
        max_in_flight: AtomicU32,
    }

    impl SlowDispatcher {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                dispatched: Mutex::new(Vec::new()),
                in_flight: AtomicU32::new(0),
                max_in_flight: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ToolDispatcher for SlowDispatcher {
        async fn dispatch(&self, call: &ToolCall) -> ToolResult {
            self.dispatched.lock().unwrap().push(call.id.clone());
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ToolResult::success(&call.id, &call.name, "OK")
        }

        fn schemas(&self) -> Vec<ToolSchema> {
            Vec::new()
        }

        fn is_read_only(&self, _tool_name: &str) -> Option<bool> {
            None
        }
    }

    fn read_call(id: &str, name: &str) -> ToolCall {
        ToolCall::new(id, name, HashMap::new(), 0)
    }

    fn write_call(id: &str, path: &str) -> ToolCall {
        let mut args = HashMap::new();
        args.insert("path".to_string(), serde_json::json!(path));
        ToolCall::new(id.to_string(), "write_file".to_string(), args, 0)
    }

    fn config(max_concurrency: usize) -> ExecutionConfig {
        ExecutionConfig {
            max_concurrency,
            tool_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_result_map_key_set_matches_batch() {
        let dispatcher = Arc::new(SlowDispatcher::new(Duration::from_millis(5)));
        let executor = BatchExecutor::new(dispatcher, &config(5));

        let calls = vec![
            read_call("a", "grep"),
            read_call("b", "glob"),
            read_call("c", "read_file"),
        ];
        let batch = classify(&calls, &ClassifierConfig::default());
        let result = executor.execute(batch).await;

        assert_eq!(result.total(), 3);
        for call in &calls {
            assert!(result.results.contains_key(&call.id));
        }
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.failed, 0);
        assert!(result.parallel_mode);
        assert_eq!(result.parallel_ids.len(), 3);
    }

    #[tokio::test]
    async fn test_parallel_set_overlaps() {
        let dispatcher = Arc::new(SlowDispatcher::new(Duration::from_millis(50)));
        let executor = BatchExecutor::new(Arc::clone(&dispatcher) as _, &config(5));

        let calls = vec![
            read_call("a", "grep"),
            read_call("b", "glob"),
            read_call("c", "read_file"),
        ];
        let batch = classify(&calls, &ClassifierConfig::default());

        let start = Instant::now();
        let result = executor.execute(batch).await;
        let elapsed = start.elapsed();

        assert_eq!(result.succeeded, 3);
        // Three 50ms calls in parallel finish well under 150ms
        assert!(elapsed < Duration::from_millis(140), "elapsed {:?}", elapsed);
        assert!(dispatcher.max_in_flight.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_semaphore_bounds_concurrency() {
        let dispatcher = Arc::new(SlowDispatcher::new(Duration::from_millis(30)));
        let executor = BatchExecutor::new(Arc::clone(&dispatcher) as _, &config(2));

        let calls: Vec<ToolCall> = (0..6)
            .map(|i| read_call(&format!("c{}", i), "grep"))
            .collect();
        let batch = classify(&calls, &ClassifierConfig::default());
        let result = executor.execute(batch).await;

        assert_eq!(result.succeeded, 6);
        assert!(dispatcher.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_sequential_set_runs_in_submission_order() {
        let dispatcher = Arc::new(SlowDispatcher::new(Duration::from_millis(10)));
        let executor = BatchExecutor::new(Arc::clone(&dispatcher) as _, &config(5));

        // Two mutations on the same path classify fully sequential
        let calls = vec![write_call("first", "/a.ts"), write_call("second", "/a.ts")];
        let batch = classify(&calls, &ClassifierConfig::default());
        assert!(!batch.parallel_mode);

        let result = executor.execute(batch).await;
        assert_eq!(result.total(), 2);

        let order = dispatcher.dispatched.lock().unwrap().clone();
        assert_eq!(order, vec!["first".to_string(), "second".to_string()]);
        // Sequential calls never overlapped
        assert_eq!(dispatcher.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_produces_distinguishable_failure() {
        let dispatcher = Arc::new(SlowDispatcher::new(Duration::from_secs(10)));
        let exec_config = ExecutionConfig {
            tool_timeout: Duration::from_millis(30),
            ..Default::default()
        };
        let executor = BatchExecutor::new(dispatcher, &exec_config);

        let calls = vec![read_call("a", "grep"), read_call("b", "glob")];
        let batch = classify(&calls, &ClassifierConfig::default());
        let result = executor.execute(batch).await;

        assert_eq!(result.total(), 2);
        assert_eq!(result.failed, 2);
        let err = result.results["a"].error.as_ref().unwrap();
        assert!(err.contains("timed out after"), "error was: {}", err);
    }

    #[tokio::test]
    async fn test_cancellation_skips_remaining_sequential_calls() {
        let dispatcher = Arc::new(SlowDispatcher::new(Duration::from_millis(5)));
        let executor = BatchExecutor::new(Arc::clone(&dispatcher) as _, &config(5));
        executor.cancel();

        let calls = vec![write_call("a", "/a.ts"), write_call("b", "/a.ts")];
        let batch = classify(&calls, &ClassifierConfig::default());
        let result = executor.execute(batch).await;

        // Nothing dispatched, but the result map is still complete
        assert!(dispatcher.dispatched.lock().unwrap().is_empty());
        assert_eq!(result.total(), 2);
        assert!(result.results["a"]
            .error
            .as_ref()
            .unwrap()
            .contains("cancelled"));
    }

    /// Dispatcher that panics for one call id
    struct PanickyDispatcher {
        panic_id: String,
    }

    #[async_trait]
    impl ToolDispatcher for PanickyDispatcher {
        async fn dispatch(&self, call: &ToolCall) -> ToolResult {
            if call.id == self.panic_id {
                panic!("dispatch blew up");
            }
            ToolResult::success(&call.id, &call.name, "OK")
        }

        fn schemas(&self) -> Vec<ToolSchema> {
            Vec::new()
        }

        fn is_read_only(&self, _tool_name: &str) -> Option<bool> {
            None
        }
    }

    #[tokio::test]
    async fn test_panicking_call_does_not_abort_siblings() {
        let dispatcher = Arc::new(PanickyDispatcher {
            panic_id: "bad".to_string(),
        });
        let executor = BatchExecutor::new(dispatcher, &config(5));

        let calls = vec![
            read_call("good1", "grep"),
            read_call("bad", "glob"),
            read_call("good2", "read_file"),
        ];
        let batch = classify(&calls, &ClassifierConfig::default());
        let result = executor.execute(batch).await;

        assert_eq!(result.total(), 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert!(!result.results["bad"].success);
    }
}
