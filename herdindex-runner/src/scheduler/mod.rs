//! Run scheduling
//!
//! [`JobRunner`] drives one run of a job from lock to final run record.
//! Runs are awaited in place or spawned onto the runtime with a
//! [`RunHandle`].

mod runner;

pub use runner::{JobRunner, RunHandle, RunState};
