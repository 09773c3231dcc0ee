//! Order event subscribers run by the server.
//!
//! Every committed change to an order is published on the engine's event bus. The server logs each one, naming the
//! parties whose views are now stale. Session gateways that hold push channels to clients tail this log to send
//! refresh hints.
use std::{future::Future, pin::Pin};

use log::*;
use order_engine::events::{EventHandlers, EventHooks, OrderChange, OrderUpdatedEvent};

pub fn create_event_handlers(buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_updated(|ev| {
        let summary = describe(&ev);
        let parties = ev.interested_parties().iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
        Box::pin(async move {
            info!("📬️ {summary}. Refresh: [{parties}]");
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    EventHandlers::new(buffer_size, hooks)
}

fn describe(ev: &OrderUpdatedEvent) -> String {
    let id = ev.order.id.short();
    match &ev.change {
        OrderChange::Placed => format!("Order {id} placed"),
        OrderChange::Status { from, to } => format!("Order {id} moved from {from} to {to}"),
        OrderChange::PartnerAssigned { partner } => format!("Order {id} assigned to {partner}"),
        OrderChange::Delivery { status } => format!("Order {id} delivery is {status}"),
        OrderChange::ProofCaptured => format!("Proof of delivery captured for order {id}"),
        OrderChange::PaymentSettled => format!("Cash payment settled for order {id}"),
    }
}
