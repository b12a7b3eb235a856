//! `#[register_handler]`, the handler catalog and runtime bootstrap.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use herald::framework::{catalog, find_handler};
use herald::prelude::*;
use herald::runtime::{ConfigError, RuntimeError};

#[derive(Clone, Debug, Event)]
#[event(name = "invoice.issued")]
struct InvoiceIssued {
    invoice_id: u64,
}

#[derive(Clone, Debug, Event)]
#[event(name = "invoice.paid")]
struct InvoicePaid {
    invoice_id: u64,
}

static ISSUED: AtomicUsize = AtomicUsize::new(0);
static PAID: AtomicUsize = AtomicUsize::new(0);

// Tests publishing invoice events compare the counters above.
static SERIAL: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Handles both invoice events; built with `Default` when not registered.
#[register_handler(InvoiceIssued, InvoicePaid, name = "invoice-mailer", constructible)]
#[derive(Default)]
struct InvoiceMailer;

#[async_trait]
impl EventHandler<InvoiceIssued> for InvoiceMailer {
    async fn handle_event(&self, event: &InvoiceIssued) -> anyhow::Result<()> {
        assert!(event.invoice_id > 0);
        ISSUED.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl EventHandler<InvoicePaid> for InvoiceMailer {
    async fn handle_event(&self, event: &InvoicePaid) -> anyhow::Result<()> {
        assert!(event.invoice_id > 0);
        PAID.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Needs a container registration: it has no `Default`.
#[register_handler(InvoicePaid)]
struct LedgerWriter {
    entries: Arc<AtomicUsize>,
}

#[async_trait]
impl EventHandler<InvoicePaid> for LedgerWriter {
    async fn handle_event(&self, _event: &InvoicePaid) -> anyhow::Result<()> {
        self.entries.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_declaration_lists_every_event() {
    let handler = InvoiceMailer::handler_type();
    assert_eq!(handler.name(), "invoice-mailer");
    assert!(handler.handles_event(EventTypeId::of::<InvoiceIssued>()));
    assert!(handler.handles_event(EventTypeId::of::<InvoicePaid>()));
    assert!(handler.constructor().is_some());

    let ledger = LedgerWriter::handler_type();
    assert_eq!(ledger.name(), "LedgerWriter");
    assert!(ledger.constructor().is_none());
}

#[test]
fn test_catalog_contains_registered_handlers() {
    let names: Vec<_> = catalog().iter().map(|d| d.name).collect();
    assert!(names.contains(&"invoice-mailer"));
    assert!(names.contains(&"LedgerWriter"));

    let descriptor = find_handler("invoice-mailer").unwrap();
    assert!(descriptor.handler_type().is::<InvoiceMailer>());
}

#[tokio::test]
async fn test_runtime_registers_configured_handlers_by_name() {
    let _serial = SERIAL.lock().await;
    let entries = Arc::new(AtomicUsize::new(0));
    let container = ServiceContainer::new();
    let shared = Arc::clone(&entries);
    container.register(move || {
        Ok(LedgerWriter {
            entries: Arc::clone(&shared),
        })
    });

    let mut config = HeraldConfig::default();
    config.distributed.handlers = vec!["LedgerWriter".into(), "invoice-mailer".into()];

    let runtime = HeraldRuntime::builder()
        .config(config)
        .container(container)
        .without_logging()
        .build()
        .unwrap();

    let report = runtime.scan_report();
    assert_eq!(report.registered.len(), 3);
    assert_eq!(report.registered[0].handler, "LedgerWriter");
    assert_eq!(
        report.event_types_of("invoice-mailer"),
        vec![
            EventTypeId::of::<InvoiceIssued>(),
            EventTypeId::of::<InvoicePaid>()
        ]
    );

    let paid_before = PAID.load(Ordering::SeqCst);
    runtime
        .distributed()
        .publish(InvoicePaid { invoice_id: 11 })
        .await
        .unwrap();
    assert_eq!(entries.load(Ordering::SeqCst), 1);
    assert_eq!(PAID.load(Ordering::SeqCst), paid_before + 1);

    let issued_before = ISSUED.load(Ordering::SeqCst);
    runtime
        .local()
        .publish(InvoiceIssued { invoice_id: 12 })
        .await
        .unwrap();
    assert_eq!(ISSUED.load(Ordering::SeqCst), issued_before + 1);
}

#[tokio::test]
async fn test_auto_discover_without_registration_fails_only_that_handler() {
    let _serial = SERIAL.lock().await;
    let mut config = HeraldConfig::default();
    config.distributed.auto_discover = true;

    let runtime = HeraldRuntime::builder()
        .config(config)
        .without_logging()
        .build()
        .unwrap();
    assert!(!runtime.scan_report().event_types_of("LedgerWriter").is_empty());

    let paid_before = PAID.load(Ordering::SeqCst);
    let err = runtime
        .distributed()
        .publish(InvoicePaid { invoice_id: 1 })
        .await
        .unwrap_err();
    assert_eq!(err.failed_handlers(), vec!["LedgerWriter"]);
    assert!(err.failures[0].is_resolution());
    assert_eq!(PAID.load(Ordering::SeqCst), paid_before + 1);
}

#[test]
fn test_duplicate_configured_handler_rejected() {
    let mut config = HeraldConfig::default();
    config.distributed.handlers = vec!["invoice-mailer".into(), "invoice-mailer".into()];

    let err = HeraldRuntime::from_config(&config).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Config(ConfigError::DuplicateHandler(_))
    ));
}
