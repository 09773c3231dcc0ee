//! Order event hooks.
//!
//! Every hook is registered together with an [`EventFilter`] and runs on its own channel, so a slow hook never holds
//! up another. Filtering happens when an event is published: a hook is only handed the changes it asked for.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::{
    db_types::UserId,
    events::{ChangeKind, EventHandler, EventProducer, Handler, OrderUpdatedEvent},
};

/// Selects the order events a hook receives. The default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    kinds: Option<Vec<ChangeKind>>,
    party: Option<UserId>,
}

impl EventFilter {
    /// Only changes of the given kinds.
    pub fn changes(mut self, kinds: &[ChangeKind]) -> Self {
        self.kinds = Some(kinds.to_vec());
        self
    }

    /// Only changes to orders that `party` has an interest in.
    pub fn for_party(mut self, party: UserId) -> Self {
        self.party = Some(party);
        self
    }

    pub fn matches(&self, event: &OrderUpdatedEvent) -> bool {
        let kind_ok = self.kinds.as_ref().map_or(true, |kinds| kinds.contains(&event.change.kind()));
        let party_ok = self.party.as_ref().map_or(true, |party| event.interested_parties().contains(party));
        kind_ok && party_ok
    }
}

#[derive(Default, Clone)]
pub struct EventProducers {
    subscribers: Vec<(EventFilter, EventProducer<OrderUpdatedEvent>)>,
}

impl EventProducers {
    /// Hands `event` to every subscriber whose filter matches it.
    pub async fn publish_order_updated(&self, event: OrderUpdatedEvent) {
        for (filter, producer) in &self.subscribers {
            if filter.matches(&event) {
                producer.publish_event(event.clone()).await;
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

pub struct EventHandlers {
    handlers: Vec<(EventFilter, EventHandler<OrderUpdatedEvent>)>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let handlers =
            hooks.hooks.into_iter().map(|(filter, f)| (filter, EventHandler::new(buffer_size, f))).collect();
        Self { handlers }
    }

    pub fn producers(&self) -> EventProducers {
        let subscribers = self.handlers.iter().map(|(filter, handler)| (filter.clone(), handler.subscribe())).collect();
        EventProducers { subscribers }
    }

    pub async fn start_handlers(self) {
        debug!("📬️ Starting {} order event hooks", self.handlers.len());
        for (_, handler) in self.handlers {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    hooks: Vec<(EventFilter, Handler<OrderUpdatedEvent>)>,
}

impl EventHooks {
    /// Called for every change to every order.
    pub fn on_order_updated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderUpdatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_filtered(EventFilter::default(), f)
    }

    /// Called only for changes of the given kinds.
    pub fn on_change<F>(&mut self, kinds: &[ChangeKind], f: F) -> &mut Self
    where F: (Fn(OrderUpdatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_filtered(EventFilter::default().changes(kinds), f)
    }

    /// Called only for changes to orders `party` is a party to.
    pub fn on_updates_for<F>(&mut self, party: UserId, f: F) -> &mut Self
    where F: (Fn(OrderUpdatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_filtered(EventFilter::default().for_party(party), f)
    }

    pub fn on_filtered<F>(&mut self, filter: EventFilter, f: F) -> &mut Self
    where F: (Fn(OrderUpdatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.hooks.push((filter, Arc::new(f)));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::{
        db_types::{Order, OrderId, OrderStatusType, Paise, PaymentMethod, PaymentStatus},
        events::OrderChange,
    };

    fn event(change: OrderChange, partner: Option<&str>) -> OrderUpdatedEvent {
        let now = Utc::now();
        let order = Order {
            id: OrderId::from("order-1"),
            retailer_id: "ravi".into(),
            wholesaler_id: "wasim".into(),
            delivery_partner_id: partner.map(UserId::from),
            reference_number: None,
            total_amount: Paise::from_rupees(500),
            status: OrderStatusType::Dispatched,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        OrderUpdatedEvent::new(order, change)
    }

    #[test]
    fn filters() {
        let placed = event(OrderChange::Placed, None);
        let assigned = event(OrderChange::PartnerAssigned { partner: "priya".into() }, Some("priya"));
        assert!(EventFilter::default().matches(&placed));

        let deliveries = EventFilter::default().changes(&[ChangeKind::PartnerAssigned, ChangeKind::Delivery]);
        assert!(!deliveries.matches(&placed));
        assert!(deliveries.matches(&assigned));

        let priya = EventFilter::default().for_party("priya".into());
        assert!(!priya.matches(&placed));
        assert!(priya.matches(&assigned));
        assert!(EventFilter::default().for_party("ravi".into()).matches(&placed));
        assert!(!priya.clone().changes(&[ChangeKind::Placed]).matches(&assigned));
    }

    #[test]
    fn one_subscriber_per_hook() {
        let mut hooks = EventHooks::default();
        hooks
            .on_order_updated(|_| Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>)
            .on_change(&[ChangeKind::PaymentSettled], |_| Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>);
        assert_eq!(hooks.len(), 2);
        let handlers = EventHandlers::new(5, hooks);
        assert_eq!(handlers.producers().subscriber_count(), 2);
        assert_eq!(EventProducers::default().subscriber_count(), 0);
    }
}
