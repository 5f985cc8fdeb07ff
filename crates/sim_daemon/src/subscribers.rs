use std::sync::Arc;

use serde::Serialize;
use sim_core::{SimError, Snapshot};
use tokio::sync::broadcast;

/// Receives every published snapshot. Called synchronously from the tick
/// loop, so implementations must not block.
pub trait SnapshotSubscriber: Send + Sync {
    fn on_snapshot(&self, snapshot: &Snapshot) -> anyhow::Result<()>;
}

impl<F> SnapshotSubscriber for F
where
    F: Fn(&Snapshot) -> anyhow::Result<()> + Send + Sync,
{
    fn on_snapshot(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        self(snapshot)
    }
}

/// Fans snapshots out to SSE clients. Having no connected client is normal.
pub struct BroadcastSubscriber {
    tx: broadcast::Sender<Snapshot>,
}

impl BroadcastSubscriber {
    pub fn new(tx: broadcast::Sender<Snapshot>) -> Self {
        Self { tx }
    }
}

impl SnapshotSubscriber for BroadcastSubscriber {
    fn on_snapshot(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        let _ = self.tx.send(snapshot.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriberId(pub u64);

/// Ordered, bounded subscriber list.
pub struct SubscriberRegistry {
    entries: Vec<(SubscriberId, Arc<dyn SnapshotSubscriber>)>,
    next_id: u64,
    max: usize,
}

fn same_subscriber(a: &Arc<dyn SnapshotSubscriber>, b: &Arc<dyn SnapshotSubscriber>) -> bool {
    // Compare data pointers only; vtable pointers are not unique.
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl SubscriberRegistry {
    pub fn new(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            max,
        }
    }

    /// Registering the same handle twice returns the existing id.
    pub fn register(
        &mut self,
        subscriber: Arc<dyn SnapshotSubscriber>,
    ) -> Result<SubscriberId, SimError> {
        if let Some((id, _)) = self
            .entries
            .iter()
            .find(|(_, existing)| same_subscriber(existing, &subscriber))
        {
            return Ok(*id);
        }
        if self.entries.len() >= self.max {
            return Err(SimError::SubscriberLimit(self.max));
        }
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, subscriber));
        Ok(id)
    }

    pub fn unregister(&mut self, id: SubscriberId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Clone of the current list, so delivery runs without holding the lock.
    pub fn handles(&self) -> Vec<(SubscriberId, Arc<dyn SnapshotSubscriber>)> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn SnapshotSubscriber> {
        Arc::new(|_: &Snapshot| -> anyhow::Result<()> { Ok(()) })
    }

    #[test]
    fn duplicate_registration_is_a_no_op() {
        let mut registry = SubscriberRegistry::new(4);
        let handle = noop();
        let a = registry.register(Arc::clone(&handle)).unwrap();
        let b = registry.register(handle).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registration_is_bounded() {
        let mut registry = SubscriberRegistry::new(2);
        registry.register(noop()).unwrap();
        registry.register(noop()).unwrap();
        assert_eq!(registry.register(noop()), Err(SimError::SubscriberLimit(2)));
    }

    #[test]
    fn unregister_frees_a_slot_and_keeps_order() {
        let mut registry = SubscriberRegistry::new(3);
        let first = registry.register(noop()).unwrap();
        let second = registry.register(noop()).unwrap();
        let third = registry.register(noop()).unwrap();
        assert!(registry.unregister(second));
        assert!(!registry.unregister(second));
        let ids: Vec<SubscriberId> = registry.handles().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![first, third]);
    }
}
