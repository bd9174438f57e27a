//! Session cost and token accounting
//!
//! The loop driver consults a [`CostTracker`] at round boundaries; the
//! default [`SessionCostTracker`] keeps cumulative totals in memory with an
//! optional hard limit. Exact tokenization belongs to provider crates — the
//! built-in counter is the usual chars/4 approximation.

use crate::llm::messages::LlmMessage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Cost-accounting seam consulted by the loop driver
pub trait CostTracker: Send + Sync {
    /// Approximate token count for a text
    fn count_tokens(&self, text: &str) -> usize;

    /// Approximate token count for a message list
    fn count_message_tokens(&self, messages: &[LlmMessage]) -> usize {
        messages.iter().map(|m| self.count_tokens(&m.content)).sum()
    }

    /// Record usage for one LLM call
    fn record_session_cost(&self, input_tokens: u32, output_tokens: u32);

    /// Whether the session cost limit has been reached
    fn is_session_cost_limit_reached(&self) -> bool;
}

/// Cumulative session totals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionTotals {
    /// Total input tokens
    pub input_tokens: u64,
    /// Total output tokens
    pub output_tokens: u64,
    /// Total cost in USD
    pub cost_usd: f64,
    /// Number of recorded LLM calls
    pub call_count: u64,
}

/// In-memory cost tracker with per-token pricing and an optional limit
pub struct SessionCostTracker {
    totals: Mutex<SessionTotals>,
    input_price_per_1k: f64,
    output_price_per_1k: f64,
    cost_limit_usd: Option<f64>,
}

impl SessionCostTracker {
    /// Create a tracker with the given per-1k-token prices
    pub fn new(input_price_per_1k: f64, output_price_per_1k: f64) -> Self {
        Self {
            totals: Mutex::new(SessionTotals::default()),
            input_price_per_1k,
            output_price_per_1k,
            cost_limit_usd: None,
        }
    }

    /// Create a tracker that never reports a limit
    pub fn unlimited() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Set a session cost limit in USD
    pub fn with_cost_limit(mut self, limit_usd: f64) -> Self {
        self.cost_limit_usd = Some(limit_usd);
        self
    }

    /// Snapshot of the cumulative totals
    pub fn totals(&self) -> SessionTotals {
        self.totals.lock().clone()
    }
}

impl CostTracker for SessionCostTracker {
    fn count_tokens(&self, text: &str) -> usize {
        // chars/4 approximation, minimum one token for non-empty text
        if text.is_empty() {
            0
        } else {
            (text.chars().count() / 4).max(1)
        }
    }

    fn record_session_cost(&self, input_tokens: u32, output_tokens: u32) {
        let mut totals = self.totals.lock();
        totals.input_tokens += input_tokens as u64;
        totals.output_tokens += output_tokens as u64;
        totals.cost_usd += input_tokens as f64 / 1000.0 * self.input_price_per_1k
            + output_tokens as f64 / 1000.0 * self.output_price_per_1k;
        totals.call_count += 1;
    }

    fn is_session_cost_limit_reached(&self) -> bool {
        match self.cost_limit_usd {
            Some(limit) => self.totals.lock().cost_usd >= limit,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_counting() {
        let tracker = SessionCostTracker::unlimited();
        assert_eq!(tracker.count_tokens(""), 0);
        assert_eq!(tracker.count_tokens("hi"), 1);
        assert_eq!(tracker.count_tokens("12345678"), 2);

        let messages = vec![LlmMessage::user("12345678"), LlmMessage::assistant("1234")];
        assert_eq!(tracker.count_message_tokens(&messages), 3);
    }

    #[test]
    fn test_cost_accumulation_and_limit() {
        let tracker = SessionCostTracker::new(1.0, 2.0).with_cost_limit(0.5);
        assert!(!tracker.is_session_cost_limit_reached());

        // 100 input at $1/1k + 200 output at $2/1k = 0.1 + 0.4 = 0.5
        tracker.record_session_cost(100, 200);
        assert!(tracker.is_session_cost_limit_reached());

        let totals = tracker.totals();
        assert_eq!(totals.input_tokens, 100);
        assert_eq!(totals.output_tokens, 200);
        assert_eq!(totals.call_count, 1);
    }

    #[test]
    fn test_unlimited_never_hits_limit() {
        let tracker = SessionCostTracker::unlimited();
        tracker.record_session_cost(1_000_000, 1_000_000);
        assert!(!tracker.is_session_cost_limit_reached());
    }
}
