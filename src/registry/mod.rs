//! Operation registry
//!
//! Indexes live [`OperationWorker`]s by authority, the only identity a
//! worker has in this crate (a task-identity index is unnecessary here
//! since workers are never looked up by thread id from outside the
//! Scheduler — see DESIGN.md).

use std::collections::HashMap;
use std::time::Instant;

use crate::authority::Authority;
use crate::worker::OperationWorker;

/// Indexes workers by authority; guarantees uniqueness of authority.
///
/// spec.md §4.E describes a second index keyed by task identity so that a
/// worker can look itself up from inside its own running block. This crate
/// gives each operation thread its own [`crate::worker::OperationHandle`]
/// instead, which already knows its authority, so a thread-identity index
/// would be a lookup nobody performs; `current_authority()` is served by
/// the Scheduler's thread-local instead (see `scheduler::current_authority`).
#[derive(Default)]
pub struct OperationRegistry {
    by_authority: HashMap<Authority, OperationWorker>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a worker. Fails (returning the worker back) if the authority
    /// is already registered.
    pub fn register(&mut self, worker: OperationWorker) -> Result<(), OperationWorker> {
        if self.by_authority.contains_key(&worker.authority) {
            return Err(worker);
        }
        self.by_authority.insert(worker.authority.clone(), worker);
        Ok(())
    }

    /// Removes and returns the worker for `authority`, if any. Idempotent.
    pub fn deregister(&mut self, authority: &Authority) -> Option<OperationWorker> {
        self.by_authority.remove(authority)
    }

    pub fn find(&self, authority: &Authority) -> Option<&OperationWorker> {
        self.by_authority.get(authority)
    }

    pub fn find_mut(&mut self, authority: &Authority) -> Option<&mut OperationWorker> {
        self.by_authority.get_mut(authority)
    }

    /// Workers in `Ready` state, sorted by `resume_at` ascending (ties
    /// broken by authority, a stable proxy for insertion order since
    /// `HashMap` iteration order is not otherwise stable).
    pub fn can_resume(&self, now: Instant) -> Vec<Authority> {
        let mut ready: Vec<_> = self
            .by_authority
            .values()
            .filter(|w| w.is_ready(now))
            .map(|w| (w.resume_at, w.authority.clone()))
            .collect();
        ready.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        ready.into_iter().map(|(_, authority)| authority).collect()
    }

    /// Earliest `resume_at` among alive, non-waiting workers, regardless of
    /// whether that instant has already passed (used to size the
    /// Scheduler's next sleep when nothing is immediately ready).
    pub fn earliest_resume_at(&self) -> Option<Instant> {
        self.by_authority
            .values()
            .filter(|w| w.alive && !w.waiting_for_response)
            .map(|w| w.resume_at)
            .min()
    }

    pub fn size(&self) -> usize {
        self.by_authority.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_authority.is_empty()
    }

    /// Authorities of every worker currently in `Dead` state but still
    /// present in the registry (the Scheduler sweeps these out each loop
    /// iteration per spec.md §4.F step 6).
    pub fn dead_authorities(&self) -> Vec<Authority> {
        self.by_authority
            .values()
            .filter(|w| !w.alive)
            .map(|w| w.authority.clone())
            .collect()
    }

    /// Forcibly closes every registered worker and empties the registry.
    pub fn shutdown(&mut self) {
        for (_, mut worker) in self.by_authority.drain() {
            worker.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{OperationHandle, UserBlock};
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    fn parked_worker(name: &str) -> OperationWorker {
        let (events_tx, _events_rx) = unbounded();
        let block: UserBlock = Box::new(|h: &OperationHandle| {
            h.delay(60.0)?;
            Ok(())
        });
        OperationWorker::spawn(Authority::new(name), block, events_tx)
    }

    #[test]
    fn register_rejects_duplicate_authority() {
        let mut registry = OperationRegistry::new();
        registry.register(parked_worker("a.com")).unwrap();
        let rejected = registry.register(parked_worker("a.com"));
        assert!(rejected.is_err());
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn deregister_is_idempotent() {
        let mut registry = OperationRegistry::new();
        registry.register(parked_worker("a.com")).unwrap();
        assert!(registry.deregister(&Authority::new("a.com")).is_some());
        assert!(registry.deregister(&Authority::new("a.com")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn can_resume_sorts_by_resume_at_ascending() {
        let mut registry = OperationRegistry::new();
        let mut fast = parked_worker("fast.com");
        let mut slow = parked_worker("slow.com");
        let now = Instant::now();
        fast.mark_sleeping(now);
        slow.mark_sleeping(now + Duration::from_millis(1));
        fast.waiting_for_response = false;
        slow.waiting_for_response = false;
        registry.register(slow).unwrap();
        registry.register(fast).unwrap();

        let ready = registry.can_resume(now + Duration::from_secs(1));
        assert_eq!(ready, vec![Authority::new("fast.com"), Authority::new("slow.com")]);
    }

    #[test]
    fn waiting_workers_are_never_ready() {
        let mut registry = OperationRegistry::new();
        let mut worker = parked_worker("a.com");
        worker.mark_waiting_io();
        registry.register(worker).unwrap();
        assert!(registry.can_resume(Instant::now()).is_empty());
    }

    #[test]
    fn shutdown_closes_every_worker_and_empties_the_registry() {
        let mut registry = OperationRegistry::new();
        registry.register(parked_worker("a.com")).unwrap();
        registry.register(parked_worker("b.com")).unwrap();
        registry.shutdown();
        assert!(registry.is_empty());
    }
}
