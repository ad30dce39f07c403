//! Service layer
//!
//! Services contain the pieces of a run that touch the outside world.
//! They are trait-based so the run state machine can be tested without
//! spawning processes.

mod execution;

// Re-export traits
pub use execution::ExecutionService;

// Re-export implementations
pub use execution::ProcessExecutionService;
