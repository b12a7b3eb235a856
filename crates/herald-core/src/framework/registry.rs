//! The subscription registry.
//!
//! Maps each [`EventTypeId`] to an ordered list of [`SubscriptionEntry`]s.
//! Lists are copy-on-write: readers clone an `Arc` under a short read lock
//! and iterate the snapshot without holding any lock, while writers clone the
//! list only when a snapshot of it is still alive.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use super::subscription::{
    HandlerKey, Removal, Subscriber, SubscriptionEntry, SubscriptionHandle, SubscriptionId,
};
use crate::foundation::event::EventTypeId;

/// An immutable view of the entries registered for one event type.
pub type EntrySnapshot = Arc<Vec<SubscriptionEntry>>;

/// Registry of subscriptions keyed by event type.
///
/// # Thread Safety
///
/// All operations take `&self` and are safe to call concurrently. Snapshots
/// returned by [`entries_for`](Self::entries_for) are never affected by later
/// mutations.
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<EventTypeId, EntrySnapshot>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Appends `subscriber` to the list for `event_type`.
    ///
    /// The same subscriber may be added several times; each call creates an
    /// independent entry.
    pub fn subscribe(
        self: &Arc<Self>,
        event_type: EventTypeId,
        subscriber: Subscriber,
    ) -> SubscriptionHandle {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let label = subscriber.label().to_string();
        {
            let mut map = self.entries.write();
            let list = map.entry(event_type).or_default();
            Arc::make_mut(list).push(SubscriptionEntry::new(id, subscriber));
        }
        debug!(event = %event_type, subscription = %id, handler = %label, "Subscribed");
        SubscriptionHandle::new(Arc::downgrade(self), event_type, id)
    }

    /// Removes entries for `event_type` whose subscriber matches `key`.
    ///
    /// Returns the number of removed entries; zero is not an error.
    pub fn unsubscribe(&self, event_type: EventTypeId, key: HandlerKey, removal: Removal) -> usize {
        let removed = self.retain(event_type, |list| match removal {
            Removal::First => match list.iter().position(|e| e.subscriber().key() == key) {
                Some(pos) => {
                    list.remove(pos);
                    1
                }
                None => 0,
            },
            Removal::All => {
                let before = list.len();
                list.retain(|e| e.subscriber().key() != key);
                before - list.len()
            }
        });
        if removed > 0 {
            debug!(event = %event_type, ?key, removed, "Unsubscribed");
        }
        removed
    }

    /// Removes the entry with the given identifier.
    pub fn remove(&self, event_type: EventTypeId, id: SubscriptionId) -> bool {
        let removed = self.retain(event_type, |list| {
            match list.iter().position(|e| e.id() == id) {
                Some(pos) => {
                    list.remove(pos);
                    1
                }
                None => 0,
            }
        });
        if removed > 0 {
            debug!(event = %event_type, subscription = %id, "Subscription disposed");
        }
        removed > 0
    }

    /// Clears every entry for `event_type`, returning how many were removed.
    pub fn unsubscribe_all(&self, event_type: EventTypeId) -> usize {
        let removed = self
            .entries
            .write()
            .remove(&event_type)
            .map_or(0, |list| list.len());
        debug!(event = %event_type, removed, "Unsubscribed all");
        removed
    }

    /// Returns a snapshot of the entries for `event_type`, in registration order.
    pub fn entries_for(&self, event_type: EventTypeId) -> EntrySnapshot {
        self.entries
            .read()
            .get(&event_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of entries for `event_type`.
    pub fn handler_count(&self, event_type: EventTypeId) -> usize {
        self.entries
            .read()
            .get(&event_type)
            .map_or(0, |list| list.len())
    }

    /// Returns every event type that currently has entries.
    pub fn event_types(&self) -> Vec<EventTypeId> {
        self.entries.read().keys().copied().collect()
    }

    /// Returns `true` if no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Applies `f` to the list for `event_type` under the write lock and drops
    /// the list once it is empty.
    fn retain<F>(&self, event_type: EventTypeId, f: F) -> usize
    where
        F: FnOnce(&mut Vec<SubscriptionEntry>) -> usize,
    {
        let mut map = self.entries.write();
        let Some(list) = map.get_mut(&event_type) else {
            return 0;
        };
        let removed = f(Arc::make_mut(list));
        if list.is_empty() {
            map.remove(&event_type);
        }
        removed
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let map = self.entries.read();
        f.debug_struct("SubscriptionRegistry")
            .field("event_types", &map.len())
            .field("entries", &map.values().map(|l| l.len()).sum::<usize>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::{BoxedEvent, Event};
    use crate::framework::handler::{Callback, EventHandler};
    use async_trait::async_trait;
    use std::any::Any;

    struct OrderCreated;

    impl Event for OrderCreated {
        fn event_name(&self) -> &'static str {
            "order.created"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    struct OrderShipped;

    impl Event for OrderShipped {
        fn event_name(&self) -> &'static str {
            "order.shipped"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    struct Noop;

    #[async_trait]
    impl EventHandler<OrderCreated> for Noop {
        async fn handle_event(&self, _event: &OrderCreated) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn created() -> EventTypeId {
        EventTypeId::of::<OrderCreated>()
    }

    fn callback() -> Callback<OrderCreated> {
        Callback::new(|_: Arc<OrderCreated>| async { Ok(()) })
    }

    fn ids(registry: &SubscriptionRegistry, event_type: EventTypeId) -> Vec<SubscriptionId> {
        registry.entries_for(event_type).iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_subscribe_appends_at_tail() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let first = registry.subscribe(created(), Subscriber::callback(&callback()));
        let cb = callback();
        let second = registry.subscribe(created(), Subscriber::callback(&cb));

        let entries = registry.entries_for(created());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), first.id());
        assert_eq!(entries[1].id(), second.id());
        assert_eq!(
            entries
                .iter()
                .filter(|e| e.subscriber().key() == Subscriber::callback(&cb).key())
                .count(),
            1
        );
    }

    #[test]
    fn test_duplicate_callback_creates_two_entries() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let cb = callback();
        let _ = registry.subscribe(created(), Subscriber::callback(&cb));
        let _ = registry.subscribe(created(), Subscriber::callback(&cb));
        assert_eq!(registry.handler_count(created()), 2);

        let key = Subscriber::callback(&cb).key();
        assert_eq!(registry.unsubscribe(created(), key, Removal::First), 1);
        assert_eq!(registry.handler_count(created()), 1);
    }

    #[test]
    fn test_unsubscribe_all_matching() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let cb = callback();
        let other = callback();
        let _ = registry.subscribe(created(), Subscriber::callback(&cb));
        let keep = registry.subscribe(created(), Subscriber::callback(&other));
        let _ = registry.subscribe(created(), Subscriber::callback(&cb.clone()));

        let key = Subscriber::callback(&cb).key();
        assert_eq!(registry.unsubscribe(created(), key, Removal::All), 2);
        assert_eq!(ids(&registry, created()), vec![keep.id()]);
    }

    #[test]
    fn test_unsubscribe_first_removes_earliest() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let handler = Arc::new(Noop);
        let first = registry.subscribe(created(), Subscriber::instance::<OrderCreated, _>(&handler));
        let second = registry.subscribe(created(), Subscriber::instance::<OrderCreated, _>(&handler));

        let key = Subscriber::instance::<OrderCreated, _>(&handler).key();
        assert_eq!(registry.unsubscribe(created(), key, Removal::First), 1);
        assert_eq!(ids(&registry, created()), vec![second.id()]);
        assert!(!first.dispose());
    }

    #[test]
    fn test_unsubscribe_without_match_is_noop() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let _ = registry.subscribe(created(), Subscriber::callback(&callback()));
        let key = Subscriber::callback(&callback()).key();

        assert_eq!(registry.unsubscribe(created(), key, Removal::All), 0);
        assert_eq!(
            registry.unsubscribe(EventTypeId::of::<OrderShipped>(), key, Removal::First),
            0
        );
        assert_eq!(registry.handler_count(created()), 1);
    }

    #[test]
    fn test_instances_compare_by_reference() {
        let a = Arc::new(Noop);
        let b = Arc::new(Noop);
        assert_eq!(
            Subscriber::instance::<OrderCreated, _>(&a).key(),
            Subscriber::instance::<OrderCreated, _>(&Arc::clone(&a)).key()
        );
        assert_ne!(
            Subscriber::instance::<OrderCreated, _>(&a).key(),
            Subscriber::instance::<OrderCreated, _>(&b).key()
        );
    }

    #[test]
    fn test_unsubscribe_all_clears_event_type() {
        let registry = Arc::new(SubscriptionRegistry::new());
        for _ in 0..3 {
            let _ = registry.subscribe(created(), Subscriber::callback(&callback()));
        }
        let _ = registry.subscribe(
            EventTypeId::of::<OrderShipped>(),
            Subscriber::callback(&Callback::new(|_: Arc<OrderShipped>| async { Ok(()) })),
        );

        assert_eq!(registry.unsubscribe_all(created()), 3);
        assert!(registry.entries_for(created()).is_empty());
        assert_eq!(registry.event_types(), vec![EventTypeId::of::<OrderShipped>()]);
        assert_eq!(registry.unsubscribe_all(created()), 0);
    }

    #[test]
    fn test_handle_dispose_removes_exact_entry() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let cb = callback();
        let first = registry.subscribe(created(), Subscriber::callback(&cb));
        let second = registry.subscribe(created(), Subscriber::callback(&cb));
        let second_id = second.id();

        assert!(second.dispose());
        assert_eq!(ids(&registry, created()), vec![first.id()]);
        assert!(!registry.remove(created(), second_id));
    }

    #[test]
    fn test_guard_disposes_on_drop() {
        let registry = Arc::new(SubscriptionRegistry::new());
        {
            let _guard = registry
                .subscribe(created(), Subscriber::callback(&callback()))
                .guard();
            assert_eq!(registry.handler_count(created()), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handle_outliving_registry_is_noop() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let handle = registry.subscribe(created(), Subscriber::callback(&callback()));
        drop(registry);
        assert!(!handle.dispose());
    }

    #[tokio::test]
    async fn test_snapshot_isolated_from_mutation() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let _ = registry.subscribe(created(), Subscriber::callback(&callback()));
        let snapshot = registry.entries_for(created());

        let _ = registry.subscribe(created(), Subscriber::callback(&callback()));
        registry.unsubscribe_all(created());

        assert_eq!(snapshot.len(), 1);
        if let crate::framework::subscription::SubscriberKind::Callback(f) =
            snapshot[0].subscriber().kind()
        {
            f(BoxedEvent::new(OrderCreated)).await.unwrap();
        } else {
            panic!("expected a callback entry");
        }
    }

    #[test]
    fn test_concurrent_subscribe_and_read() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let handle =
                            registry.subscribe(created(), Subscriber::callback(&callback()));
                        let _ = registry.entries_for(created()).len();
                        handle.dispose();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
