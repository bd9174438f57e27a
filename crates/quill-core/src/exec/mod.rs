//! The tool-execution engine: batch classification, bounded-concurrency
//! execution, serialization lanes, and session metrics

pub mod classifier;
pub mod executor;
pub mod lanes;
pub mod metrics;

pub use classifier::{classify, ClassifiedBatch, ClassifierConfig};
pub use executor::{BatchExecutionResult, BatchExecutor};
pub use lanes::LaneRegistry;
pub use metrics::{ExecutionMetrics, MetricsCollector, ToolStats};
