use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::authority::Authority;
use crate::pool::{CollaboratorError, Job, Payload, ProcessRequest, ThreadResponse};

/// The user-supplied block for one registered operation.
pub type UserBlock = Box<dyn FnOnce(&OperationHandle) -> Result<(), OperationError> + Send>;

/// What a worker thread suspended on, sent to the Scheduler.
pub enum SuspendKind {
    /// `execute_request` with a pool: hand the job to the `ThreadPool`.
    ViaPool(ProcessRequest),
    /// `execute_request` with `max_workers == 0`: the Scheduler itself runs
    /// the job synchronously before resuming this worker.
    Inline(Job),
    /// Explicit `delay(seconds)` call.
    Delay(f64),
}

/// Message sent from a worker thread to the Scheduler.
pub enum WorkerEvent {
    Suspend { authority: Authority, kind: SuspendKind },
    Done { authority: Authority, result: Result<(), OperationError> },
}

/// Message sent from the Scheduler to one worker thread's private channel.
/// Exactly one is ever in flight per worker.
pub enum Resume {
    /// Resume after a delay, or the very first resume after registration.
    Continue,
    /// Resume with the response to the request the worker suspended on.
    WithResponse(ThreadResponse),
    /// Forced shutdown signal. The worker's block must unwind; in Rust this
    /// means `execute_request`/`delay` return `Err(OperationError::Closed)`,
    /// which user code propagates with `?`.
    Close,
}

/// Error surfaced to user blocks by [`OperationHandle`] methods.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("collaborator call failed: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("operation was closed by the scheduler")]
    Closed,

    #[error("response payload did not match the expected type `{0}`")]
    TypeMismatch(&'static str),
}

/// Interface exposed to a running operation's user block.
///
/// Lives for the duration of one worker thread; every method blocks the
/// calling thread until the Scheduler resumes it.
pub struct OperationHandle {
    authority: Authority,
    events_tx: Sender<WorkerEvent>,
    resume_rx: Receiver<Resume>,
}

impl OperationHandle {
    pub(super) fn new(
        authority: Authority,
        events_tx: Sender<WorkerEvent>,
        resume_rx: Receiver<Resume>,
    ) -> Self {
        Self { authority, events_tx, resume_rx }
    }

    /// The authority this operation is registered under.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Executes `call` via the ThreadPool (`use_pool = true`) or inline on
    /// the Scheduler's own thread (`use_pool = false`), suspending this
    /// operation's thread until the result is ready. See spec.md §4.D.
    pub fn execute_request<T, F>(&self, use_pool: bool, call: F) -> Result<T, OperationError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CollaboratorError> + Send + 'static,
    {
        let job: Job = Box::new(move || call().map(|value| Box::new(value) as Payload));

        let kind = if use_pool {
            SuspendKind::ViaPool(ProcessRequest::new(self.authority.clone(), job))
        } else {
            SuspendKind::Inline(job)
        };

        self.suspend(kind)?;

        match self.resume_rx.recv() {
            Ok(Resume::WithResponse(response)) => {
                if let Some(error) = response.error {
                    return Err(OperationError::Collaborator(error));
                }
                let payload = response
                    .result
                    .ok_or(OperationError::TypeMismatch(std::any::type_name::<T>()))?;
                downcast::<T>(payload)
            }
            Ok(Resume::Close) | Err(_) => Err(OperationError::Closed),
            Ok(Resume::Continue) => Err(OperationError::Closed),
        }
    }

    /// Suspends this operation for at least `seconds` before resuming.
    pub fn delay(&self, seconds: f64) -> Result<(), OperationError> {
        self.suspend(SuspendKind::Delay(seconds))?;

        match self.resume_rx.recv() {
            Ok(Resume::Continue) | Ok(Resume::WithResponse(_)) => Ok(()),
            Ok(Resume::Close) | Err(_) => Err(OperationError::Closed),
        }
    }

    fn suspend(&self, kind: SuspendKind) -> Result<(), OperationError> {
        self.events_tx
            .send(WorkerEvent::Suspend { authority: self.authority.clone(), kind })
            .map_err(|_| OperationError::Closed)
    }
}

fn downcast<T: 'static>(payload: Payload) -> Result<T, OperationError> {
    payload
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| OperationError::TypeMismatch(std::any::type_name::<T>()))
}
