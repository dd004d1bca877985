//! Fixed-size worker pool
//!
//! Executes submitted network requests off the scheduler thread and returns
//! `ThreadResponse`s on a shared outbound channel. Workers never touch
//! scheduler state directly: their only input is a `ProcessRequest`, their
//! only output is a `ThreadResponse`.

mod job;
mod workers;

pub use job::{run_captured, CollaboratorError, Job, Payload, ProcessRequest, ThreadResponse};
pub use workers::ThreadPool;
