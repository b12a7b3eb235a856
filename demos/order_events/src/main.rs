//! Order Events Demo
//!
//! An order workflow on the Herald bus:
//!
//! - `ReserveInventory` and `NotifyCustomer` are `#[register_handler]` types,
//!   enabled by name in `herald.toml` and resolved from a `ServiceContainer`
//!   for every event
//! - An audit trail subscribes a plain closure to the parent `OrderEvent`
//!   on the local face and sees every order event through `publish_hierarchy`
//!
//! ```text
//! OrderEvent { order_id, customer }
//! ├── OrderPlaced  { items, total_cents }
//! └── OrderShipped { carrier }
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package order_events -- --orders 4
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use herald::prelude::*;
use parking_lot::Mutex;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(about = "Publish a few orders through the Herald distributed bus")]
struct Args {
    /// Configuration file.
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/herald.toml"))]
    config: PathBuf,

    /// Number of orders to place.
    #[arg(long, default_value_t = 3)]
    orders: u64,
}

// ============================================================================
// Events
// ============================================================================

#[derive(Clone, Debug, Event)]
#[event(name = "order")]
pub struct OrderEvent {
    pub order_id: u64,
    pub customer: String,
}

#[derive(Clone, Debug, Event)]
#[event(name = "order.placed")]
pub struct OrderPlaced {
    #[event(parent)]
    pub order: OrderEvent,
    pub items: Vec<(String, u32)>,
    pub total_cents: u64,
}

#[derive(Clone, Debug, Event)]
#[event(name = "order.shipped")]
pub struct OrderShipped {
    #[event(parent)]
    pub order: OrderEvent,
    pub carrier: String,
}

// ============================================================================
// Services
// ============================================================================

/// Stock levels shared by every `ReserveInventory` instance.
#[derive(Debug)]
pub struct InventoryService {
    stock: Mutex<HashMap<String, u32>>,
}

impl InventoryService {
    fn with_stock(stock: &[(&str, u32)]) -> Self {
        Self {
            stock: Mutex::new(stock.iter().map(|(s, n)| (s.to_string(), *n)).collect()),
        }
    }

    /// Takes every item or nothing.
    fn reserve(&self, items: &[(String, u32)]) -> Result<()> {
        let mut stock = self.stock.lock();
        for (sku, qty) in items {
            let available = stock.get(sku).copied().unwrap_or(0);
            if available < *qty {
                anyhow::bail!("only {available} of {sku} left, {qty} requested");
            }
        }
        for (sku, qty) in items {
            if let Some(level) = stock.get_mut(sku) {
                *level -= qty;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[register_handler(OrderPlaced, name = "reserve-inventory")]
pub struct ReserveInventory {
    inventory: Arc<InventoryService>,
}

#[async_trait]
impl EventHandler<OrderPlaced> for ReserveInventory {
    async fn handle_event(&self, event: &OrderPlaced) -> Result<()> {
        self.inventory.reserve(&event.items)?;
        info!(order = event.order_id, items = event.items.len(), "Inventory reserved");
        Ok(())
    }
}

#[register_handler(OrderPlaced, OrderShipped, name = "notify-customer", constructible)]
#[derive(Default)]
pub struct NotifyCustomer;

#[async_trait]
impl EventHandler<OrderPlaced> for NotifyCustomer {
    async fn handle_event(&self, event: &OrderPlaced) -> Result<()> {
        info!(
            customer = %event.customer,
            total = %format!("{}.{:02}", event.total_cents / 100, event.total_cents % 100),
            "Order confirmation sent"
        );
        Ok(())
    }
}

#[async_trait]
impl EventHandler<OrderShipped> for NotifyCustomer {
    async fn handle_event(&self, event: &OrderShipped) -> Result<()> {
        info!(customer = %event.customer, carrier = %event.carrier, "Shipping notice sent");
        Ok(())
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let inventory = Arc::new(InventoryService::with_stock(&[("widget", 5), ("gadget", 2)]));
    let container = ServiceContainer::new();
    container.register(move || {
        Ok(ReserveInventory {
            inventory: Arc::clone(&inventory),
        })
    });

    let runtime = HeraldRuntime::builder()
        .config_file(&args.config)
        .container(container)
        .build()?;

    for registration in &runtime.scan_report().registered {
        info!(
            handler = registration.handler,
            event = %registration.event_type,
            "Handler registered"
        );
    }

    let audit = runtime.local().subscribe_fn(|event: Arc<OrderEvent>| async move {
        info!(order = event.order_id, customer = %event.customer, "Audit");
        Ok(())
    });

    let bus = runtime.distributed();
    for order_id in 1..=args.orders {
        let order = OrderEvent {
            order_id,
            customer: format!("customer-{order_id}"),
        };
        let placed = OrderPlaced {
            order: order.clone(),
            items: vec![("widget".into(), 2), ("gadget".into(), 1)],
            total_cents: 2 * 1250 + 4999,
        };

        // Running out of stock fails `reserve-inventory` only; everyone
        // else still hears about the order.
        if let Err(err) = bus.publish_hierarchy(placed).await {
            for failure in &err.failures {
                error!(
                    order = order_id,
                    handler = failure.handler(),
                    error = %failure,
                    "Order handling failed"
                );
            }
            continue;
        }

        bus.publish_hierarchy(OrderShipped {
            order,
            carrier: "Parcelforce".into(),
        })
        .await?;
    }

    audit.dispose();
    Ok(())
}
