//! Per-authority operation worker
//!
//! Each registered operation gets its own parked OS thread standing in for
//! the cooperative task (fiber/coroutine) spec.md describes: the Scheduler
//! unblocks exactly one worker thread at a time by sending it a [`Resume`]
//! message down its private channel, and the thread runs user code until it
//! next calls [`OperationHandle::execute_request`] or
//! [`OperationHandle::delay`], at which point it blocks again. Because the
//! Scheduler never resumes a second worker before the first suspends, "no
//! user code runs while another worker's code runs" holds despite each
//! operation owning a real OS thread.

mod handle;
mod operation;

pub use handle::{OperationError, OperationHandle, Resume, SuspendKind, UserBlock, WorkerEvent};
pub use operation::{OperationWorker, WorkerState};
