use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::job::{run_captured, ProcessRequest, ThreadResponse};

/// Fixed-size pool of OS threads executing `ProcessRequest`s.
///
/// Built on `crossbeam-channel` unbounded MPMC queues: many workers (via the
/// scheduler) feed the inbound queue, every pool thread competes to pop from
/// it, and every pool thread pushes onto one shared outbound queue the
/// scheduler drains. See spec.md §4.C.
pub struct ThreadPool {
    task_tx: Option<Sender<ProcessRequest>>,
    response_rx: Receiver<ThreadResponse>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `size` worker threads. `size == 0` is valid and spawns none;
    /// the scheduler is responsible for falling back to inline execution in
    /// that case (spec.md §4.F).
    pub fn new(size: usize) -> Self {
        let (task_tx, task_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();

        let workers = (0..size)
            .map(|id| {
                let task_rx = task_rx.clone();
                let response_tx = response_tx.clone();
                thread::Builder::new()
                    .name(format!("pool-worker-{id}"))
                    .spawn(move || worker_loop(task_rx, response_tx))
                    .expect("spawn pool worker thread")
            })
            .collect();

        Self {
            task_tx: Some(task_tx),
            response_rx,
            workers,
        }
    }

    /// Enqueues a request. Never blocks; returns `false` if the pool has
    /// already been shut down.
    pub fn submit(&self, request: ProcessRequest) -> bool {
        match &self.task_tx {
            Some(tx) => tx.send(request).is_ok(),
            None => false,
        }
    }

    /// Non-blocking receive of the next completed response, if any.
    pub fn poll(&self) -> Option<ThreadResponse> {
        self.response_rx.try_recv().ok()
    }

    /// Number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Stops accepting new work, waits for in-flight jobs to finish, and
    /// returns any responses not yet polled. Safe to call on an empty pool
    /// (returns immediately with an empty list).
    pub fn shutdown(&mut self) -> Vec<ThreadResponse> {
        self.task_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }

        let mut remaining = Vec::new();
        while let Ok(resp) = self.response_rx.try_recv() {
            remaining.push(resp);
        }
        remaining
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if self.task_tx.is_some() || !self.workers.is_empty() {
            self.shutdown();
        }
    }
}

fn worker_loop(task_rx: Receiver<ProcessRequest>, response_tx: Sender<ThreadResponse>) {
    while let Ok(request) = task_rx.recv() {
        let authority = request.authority.clone();
        let (outcome, elapsed_seconds) = run_captured(request.job);
        let (result, error) = match outcome {
            Ok(payload) => (Some(payload), None),
            Err(err) => (None, Some(err)),
        };

        let response = ThreadResponse {
            authority,
            result,
            error,
            elapsed_seconds,
        };

        if response_tx.send(response).is_err() {
            break;
        }
    }
}
