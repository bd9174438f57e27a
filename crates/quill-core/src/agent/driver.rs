//! Conversation loop driver
//!
//! [`TurnDriver`] owns the round loop: it sends the conversation to the
//! model, executes announced tool batches through the classifier and the
//! batch executor, appends results in submission order, and stops on one
//! of the terminal conditions (no tool calls, round limit, cancellation,
//! cost limit, or an LLM failure). A driver runs turns until it
//! terminates; termination is absorbing.

use crate::config::ExecutionConfig;
use crate::cost::CostTracker;
use crate::error::{QuillError, QuillResult};
use crate::events::{AgentEvent, EventBus};
use crate::exec::classifier::{classify, ClassifierConfig};
use crate::exec::executor::BatchExecutor;
use crate::exec::metrics::{ExecutionMetrics, MetricsCollector};
use crate::llm::client::LlmClient;
use crate::llm::messages::{LlmMessage, LlmResponse};
use crate::tools::registry::SharedToolDispatcher;
use crate::tools::types::ToolCall;
use crate::types::Id;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{LoopState, TerminationReason, TurnOutcome};

const CANCELLED_ENTRY: &str = "Operation cancelled.";
const MAX_ROUNDS_ENTRY: &str = "Maximum tool rounds reached; stopping.";
const COST_LIMIT_ENTRY: &str = "Session cost limit reached; stopping.";

/// Drives the conversation loop for one session.
///
/// The driver is the only component that touches conversation history.
/// The classifier, executor, and metrics collector it owns never see
/// messages; they communicate through [`ToolCall`]s and tool results.
pub struct TurnDriver {
    id: Id,
    conversation: Vec<LlmMessage>,
    state: LoopState,
    round: u32,
    llm: Arc<dyn LlmClient>,
    dispatcher: SharedToolDispatcher,
    cost: Arc<dyn CostTracker>,
    executor: BatchExecutor,
    classifier: ClassifierConfig,
    metrics: MetricsCollector,
    config: ExecutionConfig,
    cancellation: CancellationToken,
    bus: EventBus,
}

impl TurnDriver {
    /// Create a driver from its collaborators and configuration
    pub fn new(
        llm: Arc<dyn LlmClient>,
        dispatcher: SharedToolDispatcher,
        cost: Arc<dyn CostTracker>,
        config: ExecutionConfig,
    ) -> QuillResult<Self> {
        config.validate()?;
        let cancellation = CancellationToken::new();
        let executor = BatchExecutor::new(Arc::clone(&dispatcher), &config)
            .with_cancellation(cancellation.clone());

        // Tools that declare themselves read-only extend the classifier's
        // built-in table.
        let mut classifier = ClassifierConfig::from(&config);
        for schema in dispatcher.schemas() {
            if dispatcher.is_read_only(&schema.name) == Some(true) {
                classifier.additional_read_only.push(schema.name);
            }
        }

        let bus = EventBus::new(config.event_capacity);

        Ok(Self {
            id: Id::new_v4(),
            conversation: Vec::new(),
            state: LoopState::Idle,
            round: 0,
            llm,
            dispatcher,
            cost,
            executor,
            classifier,
            metrics: MetricsCollector::new(),
            config,
            cancellation,
            bus,
        })
    }

    /// Seed the conversation (system prompt, restored history)
    pub fn with_history(mut self, history: Vec<LlmMessage>) -> Self {
        self.conversation = history;
        self
    }

    /// Replace the driver's event bus with a shared one
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    /// Wire the driver into an external cancellation hierarchy
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.executor = self.executor.with_cancellation(token.clone());
        self.cancellation = token;
        self
    }

    /// Token callers can use to cancel the running turn
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Request cancellation of the running turn
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Unique identifier of this driver, for log correlation
    pub fn id(&self) -> Id {
        self.id
    }

    /// The driver's event bus; every turn's events are published here
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Current driver state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Full conversation history
    pub fn conversation(&self) -> &[LlmMessage] {
        &self.conversation
    }

    /// Snapshot of the session metrics
    pub fn metrics(&self) -> ExecutionMetrics {
        self.metrics.snapshot()
    }

    /// Human-readable metrics summary
    pub fn metrics_summary(&self) -> String {
        self.metrics.format_summary()
    }

    /// Run one turn of the conversation loop.
    ///
    /// Appends the user input, then loops: LLM call, tool batch, repeat,
    /// until a terminal condition is hit. LLM failures do not surface as
    /// `Err` — they terminate the loop with a user-visible error entry
    /// and a [`TerminationReason::Error`] outcome. `Err` is reserved for
    /// driver misuse, such as running a turn after termination.
    pub async fn run_turn(&mut self, user_input: impl Into<String>) -> QuillResult<TurnOutcome> {
        self.run_inner(user_input.into(), None).await
    }

    /// Run one turn, forwarding [`AgentEvent`]s over the given channel.
    ///
    /// LLM calls go through the streaming endpoint and incremental content
    /// is forwarded as `ContentDelta` events. The `Done` event is always
    /// the last one sent.
    pub async fn run_turn_streaming(
        &mut self,
        user_input: impl Into<String>,
        sender: mpsc::UnboundedSender<AgentEvent>,
    ) -> QuillResult<TurnOutcome> {
        self.run_inner(user_input.into(), Some(sender)).await
    }

    async fn run_inner(
        &mut self,
        user_input: String,
        sender: Option<mpsc::UnboundedSender<AgentEvent>>,
    ) -> QuillResult<TurnOutcome> {
        if self.state.is_terminated() {
            return Err(QuillError::agent("conversation loop already terminated"));
        }
        self.state = LoopState::Looping;
        let sender = sender.as_ref();

        self.conversation.push(LlmMessage::user(user_input));
        let first_new = self.conversation.len();
        let rounds_before = self.round;

        let reason = loop {
            if self.cancellation.is_cancelled() {
                self.conversation.push(LlmMessage::assistant(CANCELLED_ENTRY));
                self.emit(sender, AgentEvent::Cancelled);
                break TerminationReason::Cancelled;
            }

            // One LLM call per iteration; failures terminate, never retry.
            let response = match self.request_completion(sender).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "LLM call failed, terminating turn");
                    self.conversation.push(LlmMessage::assistant(err.user_message()));
                    self.emit(
                        sender,
                        AgentEvent::ErrorOccurred {
                            message: err.to_string(),
                        },
                    );
                    break TerminationReason::Error;
                }
            };

            if let Some(usage) = &response.usage {
                self.cost
                    .record_session_cost(usage.prompt_tokens, usage.completion_tokens);
                self.emit(
                    sender,
                    AgentEvent::TokenCount {
                        usage: usage.clone(),
                    },
                );
            }

            if !response.has_tool_calls() {
                self.conversation.push(LlmMessage::assistant(response.content));
                break TerminationReason::Normal;
            }

            self.round += 1;
            let round = self.round;
            let calls: Vec<ToolCall> = response
                .tool_calls
                .into_iter()
                .map(|call| call.in_round(round))
                .collect();

            self.conversation
                .push(LlmMessage::assistant_with_tools(response.content, calls.clone()));
            self.emit(sender, AgentEvent::RoundStarted { round });
            self.emit(
                sender,
                AgentEvent::ToolCallsAnnounced {
                    round,
                    calls: calls.clone(),
                },
            );

            let batch = classify(&calls, &self.classifier);
            debug!(
                round,
                parallel = batch.parallel.len(),
                sequential = batch.sequential.len(),
                "classified tool batch"
            );
            let result = self.executor.execute(batch).await;

            // Results observed after cancellation are discarded.
            if self.cancellation.is_cancelled() {
                self.conversation.push(LlmMessage::assistant(CANCELLED_ENTRY));
                self.emit(sender, AgentEvent::Cancelled);
                break TerminationReason::Cancelled;
            }

            // Append one tool entry per call, in submission order.
            for call in &calls {
                if let Some(tool_result) = result.results.get(&call.id) {
                    self.conversation.push(LlmMessage::tool(
                        tool_result.content(),
                        call.id.clone(),
                        Some(call.name.clone()),
                    ));
                    self.emit(
                        sender,
                        AgentEvent::ToolResultReady {
                            result: tool_result.clone(),
                        },
                    );
                }
            }
            self.metrics.record_batch(&result);

            if self.round - rounds_before >= self.config.max_tool_rounds {
                self.conversation.push(LlmMessage::assistant(MAX_ROUNDS_ENTRY));
                self.emit(sender, AgentEvent::MaxRoundsReached { rounds: self.round });
                break TerminationReason::MaxRounds;
            }

            if self.cost.is_session_cost_limit_reached() {
                self.conversation.push(LlmMessage::assistant(COST_LIMIT_ENTRY));
                self.emit(sender, AgentEvent::CostLimitReached);
                break TerminationReason::CostLimit;
            }
        };

        self.state = LoopState::Terminated(reason);
        self.emit(sender, AgentEvent::Done { reason });

        let rounds = self.round - rounds_before;
        info!(driver_id = %self.id, %reason, rounds, "turn finished");

        Ok(TurnOutcome {
            new_entries: self.conversation[first_new..].to_vec(),
            rounds,
            termination: reason,
        })
    }

    /// One LLM call over the current conversation. Streaming mode collects
    /// the stream into a full response while forwarding content deltas.
    async fn request_completion(
        &self,
        sender: Option<&mpsc::UnboundedSender<AgentEvent>>,
    ) -> QuillResult<LlmResponse> {
        let schemas = self.dispatcher.schemas();
        let tools = if schemas.is_empty() {
            None
        } else {
            Some(schemas.as_slice())
        };

        match sender {
            None => self.llm.chat(&self.conversation, tools).await,
            Some(_) => {
                let mut stream = self.llm.chat_stream(&self.conversation, tools).await?;
                let mut content = String::new();
                let mut tool_calls = Vec::new();
                let mut usage = None;
                let mut finish_reason = None;

                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    if let Some(delta) = chunk.content {
                        self.emit(
                            sender,
                            AgentEvent::ContentDelta {
                                content: delta.clone(),
                            },
                        );
                        content.push_str(&delta);
                    }
                    if let Some(calls) = chunk.tool_calls {
                        tool_calls.extend(calls);
                    }
                    if chunk.usage.is_some() {
                        usage = chunk.usage;
                    }
                    if chunk.is_final {
                        finish_reason = chunk.finish_reason;
                    }
                }

                let mut response = LlmResponse::with_tool_calls(content, tool_calls);
                response.usage = usage;
                response.finish_reason = finish_reason;
                Ok(response)
            }
        }
    }

    fn emit(&self, sender: Option<&mpsc::UnboundedSender<AgentEvent>>, event: AgentEvent) {
        if let Some(tx) = sender {
            // A dropped receiver only means the caller stopped listening.
            let _ = tx.send(event.clone());
        }
        self.bus.publish(event);
    }
}
