//! Conversation loop driver

pub mod driver;
pub mod state;


pub use driver::TurnDriver;
pub use state::{LoopState, TerminationReason, TurnOutcome};
