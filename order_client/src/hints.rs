//! Push hints.
//!
//! A hint tells a coordinator that something it shows may be stale. It carries no data: the coordinator reacts by
//! polling early. Missing a hint is harmless because the interval poll catches up.
use std::{future::Future, pin::Pin};

use log::*;
use order_engine::{
    db_types::{OrderId, UserId},
    events::{EventHooks, OrderUpdatedEvent},
};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushHint {
    /// The order that changed, if known. `None` asks for a full refresh.
    pub order_id: Option<OrderId>,
}

impl PushHint {
    pub fn refresh_all() -> Self {
        Self { order_id: None }
    }

    pub fn for_order(order_id: OrderId) -> Self {
        Self { order_id: Some(order_id) }
    }
}

impl From<&OrderUpdatedEvent> for PushHint {
    fn from(ev: &OrderUpdatedEvent) -> Self {
        Self::for_order(ev.order.id.clone())
    }
}

/// Event hooks that forward a hint to `sender` for every order change that concerns `user_id`.
pub fn push_hint_hooks(user_id: UserId, sender: mpsc::Sender<PushHint>) -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_updates_for(user_id, move |ev| {
        let sender = sender.clone();
        Box::pin(async move {
            if sender.send(PushHint::from(&ev)).await.is_err() {
                trace!("🧭️ Coordinator has gone away. Dropping push hint for order {}", ev.order.id);
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}
