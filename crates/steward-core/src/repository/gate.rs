//! In-process gate in front of the distributed lock

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// One async mutex per user id with a miss in flight.
///
/// Misses for the same id in one process queue here, so the process sends
/// one lock request per id at a time. Different ids never wait on each
/// other. A slot is dropped when its last caller leaves.
#[derive(Default)]
pub(crate) struct KeyedGate {
    slots: DashMap<i64, Arc<Mutex<()>>>,
}

struct Exit<'a> {
    gate: &'a KeyedGate,
    id: i64,
}

impl Drop for Exit<'_> {
    fn drop(&mut self) {
        // Only the map's reference left means nobody else is queued
        self.gate
            .slots
            .remove_if(&self.id, |_, slot| Arc::strong_count(slot) == 1);
    }
}

impl KeyedGate {
    /// Run `work` once every earlier caller for `id` has left the gate
    pub(crate) async fn run<T>(&self, id: i64, work: impl Future<Output = T>) -> T {
        // Declared first so it runs after `slot` is dropped, also on cancellation
        let _exit = Exit { gate: self, id };
        let slot = self.slots.entry(id).or_default().clone();
        let _turn = slot.lock().await;
        work.await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.len()
    }
}
