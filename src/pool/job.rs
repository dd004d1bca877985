use std::any::Any;
use std::fmt;

use crate::authority::Authority;

/// Type-erased payload returned by a collaborator call.
///
/// `execute_request` is generic over the collaborator's return type, but a
/// single `ThreadResponse` channel carries every authority's responses, so
/// the payload is boxed behind `dyn Any` here and downcast by the worker
/// that submitted the matching request. At most one request per authority
/// is ever outstanding, so the downcast always targets the type the caller
/// itself asked for.
pub type Payload = Box<dyn Any + Send>;

/// Job closure executed by a pool worker thread. Captures the collaborator
/// call (`client.method(args)`) along with its timing; produces either a
/// boxed result or a captured error.
pub type Job = Box<dyn FnOnce() -> Result<Payload, CollaboratorError> + Send>;

/// An error raised by a collaborator call, or a panic caught while invoking
/// one. The original exception type name is not recoverable across a
/// thread boundary in Rust, so only a human-readable message is preserved,
/// matching the spirit of spec.md §4.C's "original type and message
/// preserved" while working within what `Any` + `catch_unwind` can give us.
#[derive(Debug, Clone)]
pub struct CollaboratorError {
    pub message: String,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CollaboratorError {}

/// Immutable request envelope produced by a worker, consumed by a pool
/// thread. See spec.md §3.
pub struct ProcessRequest {
    pub authority: Authority,
    pub job: Job,
}

impl ProcessRequest {
    pub fn new(authority: Authority, job: Job) -> Self {
        Self { authority, job }
    }
}

impl fmt::Debug for ProcessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRequest")
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

/// Immutable response envelope pushed onto the pool's outbound channel.
/// Exactly one of `result` / `error` is set. See spec.md §3.
#[derive(Debug)]
pub struct ThreadResponse {
    pub authority: Authority,
    pub result: Option<Payload>,
    pub error: Option<CollaboratorError>,
    pub elapsed_seconds: f64,
}

impl ThreadResponse {
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// Runs `job`, catching a panic the same way a collaborator exception would
/// be caught, and times the call. Shared by the pool's worker threads and
/// the Scheduler's own thread (inline `max_workers == 0` mode), so both
/// paths give a panicking collaborator call the same treatment.
pub fn run_captured(job: Job) -> (Result<Payload, CollaboratorError>, f64) {
    let start = std::time::Instant::now();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job));
    let elapsed_seconds = start.elapsed().as_secs_f64();

    let result = match outcome {
        Ok(result) => result,
        Err(panic) => Err(CollaboratorError::new(panic_message(panic))),
    };

    (result, elapsed_seconds)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "collaborator call panicked".to_string()
    }
}
