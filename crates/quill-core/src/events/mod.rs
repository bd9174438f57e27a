//! Typed events for the conversation loop
//!
//! The loop driver publishes [`AgentEvent`]s through a broadcast-based
//! [`EventBus`], giving every subscriber the same ordered view of a turn.
//! The streaming run mode additionally forwards the same events over an
//! mpsc channel to its caller.

use crate::agent::state::TerminationReason;
use crate::tools::types::{ToolCall, ToolResult};
use crate::types::LlmUsage;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events emitted while a turn is running
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A tool round is starting
    RoundStarted { round: u32 },

    /// Incremental assistant content
    ContentDelta { content: String },

    /// The model announced a batch of tool calls
    ToolCallsAnnounced { round: u32, calls: Vec<ToolCall> },

    /// A tool call finished
    ToolResultReady { result: ToolResult },

    /// Token usage reported for one LLM call
    TokenCount { usage: LlmUsage },

    /// Cancellation was observed
    Cancelled,

    /// The configured round limit was reached
    MaxRoundsReached { rounds: u32 },

    /// The session cost limit was reached
    CostLimitReached,

    /// An unrecoverable error stopped the loop
    ErrorOccurred { message: String },

    /// The turn is over; always the final event
    Done { reason: TerminationReason },
}

impl AgentEvent {
    /// Stable name for the event kind
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RoundStarted { .. } => "round_started",
            Self::ContentDelta { .. } => "content_delta",
            Self::ToolCallsAnnounced { .. } => "tool_calls_announced",
            Self::ToolResultReady { .. } => "tool_result",
            Self::TokenCount { .. } => "token_count",
            Self::Cancelled => "cancelled",
            Self::MaxRoundsReached { .. } => "max_rounds_reached",
            Self::CostLimitReached => "cost_limit_reached",
            Self::ErrorOccurred { .. } => "error",
            Self::Done { .. } => "done",
        }
    }
}

/// Broadcast bus distributing [`AgentEvent`]s to any number of subscribers.
///
/// Each subscriber receives every event published after it subscribed, in
/// publish order. Slow subscribers that fall more than `capacity` events
/// behind start losing the oldest ones.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<AgentEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new bus with the given buffer capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event; returns the number of active receivers
    pub fn publish(&self, event: AgentEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            capacity: self.capacity,
        }
    }
}

/// Thread-safe shared bus handle
pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new(16);
        let mut subscriber = bus.subscribe();

        let sent = bus.publish(AgentEvent::RoundStarted { round: 1 });
        assert_eq!(sent, 1);

        let event = subscriber.recv().await.unwrap();
        assert_eq!(event.event_type(), "round_started");
    }

    #[tokio::test]
    async fn test_multiple_subscribers_see_same_order() {
        let bus = EventBus::new(16);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        bus.publish(AgentEvent::RoundStarted { round: 1 });
        bus.publish(AgentEvent::Done {
            reason: TerminationReason::Normal,
        });

        for sub in [&mut sub1, &mut sub2] {
            assert_eq!(sub.recv().await.unwrap().event_type(), "round_started");
            assert_eq!(sub.recv().await.unwrap().event_type(), "done");
        }
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(AgentEvent::Cancelled), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
