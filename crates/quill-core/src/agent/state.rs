//! Loop driver state types

use crate::llm::messages::LlmMessage;
use serde::{Deserialize, Serialize};

/// Why the loop terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model responded without requesting tools
    Normal,
    /// The configured tool-round limit was reached
    MaxRounds,
    /// Cancellation was observed
    Cancelled,
    /// The session cost limit was reached
    CostLimit,
    /// An LLM communication failure stopped the loop
    Error,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::MaxRounds => write!(f, "max_rounds"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::CostLimit => write!(f, "cost_limit"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Driver state machine. `Terminated` is absorbing: once entered, no
/// further rounds are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, no turn started
    Idle,
    /// A turn is in progress
    Looping,
    /// The loop has ended
    Terminated(TerminationReason),
}

impl LoopState {
    /// Whether the loop has terminated
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

/// Result of running one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Conversation entries produced by the loop, in order
    pub new_entries: Vec<LlmMessage>,
    /// Number of tool rounds executed
    pub rounds: u32,
    /// Why the loop stopped
    pub termination: TerminationReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_is_absorbing_marker() {
        assert!(!LoopState::Idle.is_terminated());
        assert!(!LoopState::Looping.is_terminated());
        assert!(LoopState::Terminated(TerminationReason::Normal).is_terminated());
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(TerminationReason::MaxRounds.to_string(), "max_rounds");
        assert_eq!(TerminationReason::CostLimit.to_string(), "cost_limit");
    }
}
