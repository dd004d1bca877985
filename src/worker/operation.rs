use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{unbounded, Sender};

use crate::authority::Authority;
use crate::pool::ThreadResponse;

use super::handle::{OperationError, OperationHandle, Resume, UserBlock, WorkerEvent};

/// Lifecycle state of an [`OperationWorker`]. See spec.md §4.D.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Ready,
    WaitingIo,
    Sleeping,
    Dead,
}

/// Scheduler-side bookkeeping record for one registered operation.
///
/// Owns the sending half of the worker thread's private resume channel;
/// the thread itself runs the user block and blocks on the receiving half
/// whenever it suspends.
pub struct OperationWorker {
    pub authority: Authority,
    pub state: WorkerState,
    pub resume_at: Instant,
    pub waiting_for_response: bool,
    pub alive: bool,
    pending_response: Option<ThreadResponse>,
    resume_tx: Sender<Resume>,
    handle: Option<JoinHandle<()>>,
}

impl OperationWorker {
    /// Spawns the worker thread and returns the bookkeeping record for it.
    /// The thread blocks immediately, waiting for the Scheduler's first
    /// resume.
    pub fn spawn(authority: Authority, block: UserBlock, events_tx: Sender<WorkerEvent>) -> Self {
        let (resume_tx, resume_rx) = unbounded();
        let thread_authority = authority.clone();

        let handle = thread::Builder::new()
            .name(format!("operation-{authority}"))
            .spawn(move || {
                let first = resume_rx.recv();
                let closed_before_start = !matches!(first, Ok(Resume::Continue));

                crate::scheduler::set_current_authority(Some(thread_authority.clone()));
                let result = if closed_before_start {
                    Err(OperationError::Closed)
                } else {
                    let op_handle =
                        OperationHandle::new(thread_authority.clone(), events_tx.clone(), resume_rx);
                    (block)(&op_handle)
                };
                crate::scheduler::set_current_authority(None);

                let _ = events_tx.send(WorkerEvent::Done {
                    authority: thread_authority,
                    result,
                });
            })
            .expect("spawn operation worker thread");

        Self {
            authority,
            state: WorkerState::Ready,
            resume_at: Instant::now(),
            waiting_for_response: false,
            alive: true,
            pending_response: None,
            resume_tx,
            handle: Some(handle),
        }
    }

    /// True iff this worker may be resumed right now.
    pub fn is_ready(&self, now: Instant) -> bool {
        self.alive
            && !self.waiting_for_response
            && self.state != WorkerState::Dead
            && now >= self.resume_at
    }

    /// Unblocks the worker thread: delivers the stored response if one is
    /// pending (the worker was suspended on a request), otherwise a plain
    /// "continue" (post-delay or first resume).
    pub fn resume(&mut self) {
        let message = match self.pending_response.take() {
            Some(response) => Resume::WithResponse(response),
            None => Resume::Continue,
        };
        let _ = self.resume_tx.send(message);
        self.state = WorkerState::Ready;
    }

    /// Records the response a `WAITING_IO` worker was suspended on, without
    /// unblocking it yet; the Scheduler delivers it on the next `resume()`
    /// once this worker's `resume_at` is reached.
    pub fn store_response(&mut self, response: ThreadResponse) {
        self.pending_response = Some(response);
        self.waiting_for_response = false;
    }

    /// Marks the worker as waiting on a submitted request.
    pub fn mark_waiting_io(&mut self) {
        self.state = WorkerState::WaitingIo;
        self.waiting_for_response = true;
    }

    /// Marks the worker as sleeping until `resume_at`.
    pub fn mark_sleeping(&mut self, resume_at: Instant) {
        self.state = WorkerState::Sleeping;
        self.resume_at = resume_at;
    }

    /// Forces the worker to close: sends a termination signal and joins its
    /// thread. Safe to call on an already-dead worker.
    pub fn close(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.state = WorkerState::Dead;
        let _ = self.resume_tx.send(Resume::Close);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn mark_dead(&mut self) {
        self.alive = false;
        self.state = WorkerState::Dead;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for OperationWorker {
    fn drop(&mut self) {
        if self.alive {
            self.close();
        }
    }
}
