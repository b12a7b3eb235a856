//! End-to-end behaviour of the two bus faces.

use std::sync::Arc;

use herald::core::{HandlerKey, ResolveResult};
use herald::framework::{DistributedBusOptions, HandlerScope, Instance};
use herald::prelude::*;
use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq, Event)]
#[event(name = "order.created")]
struct OrderCreated {
    order_id: u64,
}

#[derive(Clone, Debug, Event)]
struct OrderCancelled {
    order_id: u64,
}

type Log = Arc<Mutex<Vec<String>>>;

fn logging_callback(log: &Log, label: &'static str) -> Callback<OrderCreated> {
    let log = Arc::clone(log);
    Callback::new(move |event: Arc<OrderCreated>| {
        let log = Arc::clone(&log);
        async move {
            log.lock().push(format!("{label}:{}", event.order_id));
            Ok(())
        }
    })
    .named(label)
}

#[tokio::test]
async fn test_callback_invoked_once_then_unsubscribed() {
    let bus = LocalBus::new();
    let log: Log = Arc::default();
    let c = logging_callback(&log, "C");

    let _ = bus.subscribe_callback(&c);
    bus.publish(OrderCreated { order_id: 1 }).await.unwrap();
    assert_eq!(*log.lock(), vec!["C:1"]);

    assert!(bus.unsubscribe_callback(&c));
    bus.publish(OrderCreated { order_id: 2 }).await.unwrap();
    assert_eq!(*log.lock(), vec!["C:1"]);
}

#[tokio::test]
async fn test_subscribe_appends_at_tail() {
    let bus = LocalBus::new();
    let log: Log = Arc::default();
    let event_type = EventTypeId::of::<OrderCreated>();

    let _ = bus.subscribe_callback(&logging_callback(&log, "first"));
    let handle = bus.subscribe_callback(&logging_callback(&log, "last"));

    let entries = bus.registry().entries_for(event_type);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].id(), handle.id());
    assert_eq!(
        entries.iter().filter(|e| e.id() == handle.id()).count(),
        1
    );
}

#[tokio::test]
async fn test_double_subscribe_first_and_all_removal() {
    let bus = LocalBus::new();
    let log: Log = Arc::default();
    let c = logging_callback(&log, "C");
    let event_type = EventTypeId::of::<OrderCreated>();

    let _ = bus.subscribe_callback(&c);
    let _ = bus.subscribe_callback(&c.clone());
    assert_eq!(bus.registry().handler_count(event_type), 2);

    assert_eq!(
        bus.unsubscribe_with(event_type, HandlerKey::of_callback(&c), Removal::First),
        1
    );
    assert_eq!(bus.registry().handler_count(event_type), 1);

    let _ = bus.subscribe_callback(&c);
    assert_eq!(
        bus.unsubscribe_with(event_type, HandlerKey::of_callback(&c), Removal::All),
        2
    );
    assert_eq!(
        bus.unsubscribe_with(event_type, HandlerKey::of_callback(&c), Removal::All),
        0
    );
}

#[tokio::test]
async fn test_unsubscribe_all_empties_the_list() {
    let bus = LocalBus::new();
    let log: Log = Arc::default();
    for _ in 0..5 {
        let _ = bus.subscribe_callback(&logging_callback(&log, "C"));
    }

    assert_eq!(bus.unsubscribe_all_of::<OrderCreated>(), 5);
    assert!(
        bus.registry()
            .entries_for(EventTypeId::of::<OrderCreated>())
            .is_empty()
    );
    assert_eq!(bus.unsubscribe_all_of::<OrderCreated>(), 0);
}

#[tokio::test]
async fn test_failure_in_middle_handler_is_aggregated() {
    let bus = LocalBus::new();
    let log: Log = Arc::default();

    let _ = bus.subscribe_callback(&logging_callback(&log, "H1"));
    let failing = Arc::clone(&log);
    let _ = bus.subscribe_callback(
        &Callback::new(move |event: Arc<OrderCreated>| {
            let log = Arc::clone(&failing);
            async move {
                log.lock().push(format!("H2:{}", event.order_id));
                Err::<(), _>(anyhow::anyhow!("payment gateway timed out"))
            }
        })
        .named("H2"),
    );
    let _ = bus.subscribe_callback(&logging_callback(&log, "H3"));

    let err = bus.publish(OrderCreated { order_id: 4 }).await.unwrap_err();
    assert_eq!(*log.lock(), vec!["H1:4", "H2:4", "H3:4"]);
    assert_eq!(err.failed_handlers(), vec!["H2"]);
    assert_eq!(err.succeeded(), 2);
    assert!(err.to_string().contains("1 of 3"));
    assert!(err.failures[0].to_string().contains("payment gateway timed out"));
}

struct NotifyOnOrderCreated {
    log: Log,
}

#[async_trait]
impl EventHandler<OrderCreated> for NotifyOnOrderCreated {
    async fn handle_event(&self, event: &OrderCreated) -> anyhow::Result<()> {
        self.log.lock().push(format!("notify:{}", event.order_id));
        Ok(())
    }
}

#[async_trait]
impl EventHandler<OrderCancelled> for NotifyOnOrderCreated {
    async fn handle_event(&self, event: &OrderCancelled) -> anyhow::Result<()> {
        self.log.lock().push(format!("cancel:{}", event.order_id));
        Ok(())
    }
}

/// Declares only `OrderCreated`, as the scanner would see it.
fn notify_created_only() -> HandlerType {
    HandlerType::new::<NotifyOnOrderCreated>()
        .handles::<OrderCreated>()
        .build()
}

struct RecordingContainer {
    log: Log,
}

struct RecordingScope {
    log: Log,
}

impl HandlerContainer for RecordingContainer {
    fn create_scope(&self) -> Box<dyn HandlerScope> {
        Box::new(RecordingScope {
            log: Arc::clone(&self.log),
        })
    }
}

#[async_trait]
impl HandlerScope for RecordingScope {
    async fn resolve(&self, handler: &HandlerType) -> ResolveResult<Instance> {
        self.log.lock().push(format!("resolve:{}", handler.name()));
        Ok(Arc::new(NotifyOnOrderCreated {
            log: Arc::clone(&self.log),
        }) as Instance)
    }
}

impl Drop for RecordingScope {
    fn drop(&mut self) {
        self.log.lock().push("release".into());
    }
}

#[tokio::test]
async fn test_scanned_handler_resolved_then_released_per_publish() {
    let log: Log = Arc::default();
    let local = Arc::new(LocalBus::new());
    let bus = LocalDistributedBus::new(
        local.clone(),
        Arc::new(RecordingContainer {
            log: Arc::clone(&log),
        }),
        &DistributedBusOptions::new().handler_type(notify_created_only()),
    );

    bus.publish(OrderCreated { order_id: 8 }).await.unwrap();
    assert_eq!(
        *log.lock(),
        vec!["resolve:NotifyOnOrderCreated", "notify:8", "release"]
    );

    // Not declared, so not registered.
    bus.publish(OrderCancelled { order_id: 8 }).await.unwrap();
    assert_eq!(log.lock().len(), 3);
}

#[tokio::test]
async fn test_multi_event_handler_discoverable_under_both_types() {
    let log: Log = Arc::default();
    let local = Arc::new(LocalBus::new());
    let both = HandlerType::new::<NotifyOnOrderCreated>()
        .handles::<OrderCreated>()
        .handles::<OrderCancelled>()
        .build();
    let bus = LocalDistributedBus::new(
        local.clone(),
        Arc::new(RecordingContainer {
            log: Arc::clone(&log),
        }),
        &DistributedBusOptions::new().handler_type(both),
    );

    assert!(local.has_subscribers(EventTypeId::of::<OrderCreated>()));
    assert!(local.has_subscribers(EventTypeId::of::<OrderCancelled>()));
    assert_eq!(bus.scan_report().registered.len(), 2);

    bus.publish(OrderCancelled { order_id: 2 }).await.unwrap();
    assert_eq!(
        *log.lock(),
        vec!["resolve:NotifyOnOrderCreated", "cancel:2", "release"]
    );
}

#[tokio::test]
async fn test_handler_type_without_events_is_skipped() {
    let local = Arc::new(LocalBus::new());
    let empty = HandlerType::new::<NotifyOnOrderCreated>().build();
    let bus = LocalDistributedBus::new(
        local.clone(),
        Arc::new(ServiceContainer::new()),
        &DistributedBusOptions::new().handler_type(empty),
    );

    assert_eq!(bus.scan_report().skipped, vec!["NotifyOnOrderCreated"]);
    assert!(local.registry().is_empty());
}

#[tokio::test]
async fn test_distributed_face_behind_its_own_contract() {
    async fn publish_integration_event(bus: &dyn DistributedEventBus) -> PublishResult {
        bus.publish(OrderCreated { order_id: 21 }).await
    }

    let log: Log = Arc::default();
    let local: Arc<dyn LocalEventBus> = Arc::new(LocalBus::new());
    let distributed = LocalDistributedBus::new(
        Arc::clone(&local),
        Arc::new(ServiceContainer::new()),
        &DistributedBusOptions::default(),
    );

    // Subscribed through the local face, delivered through the distributed one.
    let guard = local
        .subscribe_callback(&logging_callback(&log, "C"))
        .guard();
    publish_integration_event(&distributed).await.unwrap();
    assert_eq!(*log.lock(), vec!["C:21"]);

    drop(guard);
    publish_integration_event(&distributed).await.unwrap();
    assert_eq!(*log.lock(), vec!["C:21"]);
}
