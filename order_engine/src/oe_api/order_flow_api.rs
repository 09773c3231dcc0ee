use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Actor, NewOrder, Order, OrderId, OrderStatusType, Role},
    events::{EventProducers, OrderChange, OrderUpdatedEvent},
    oe_api::{
        errors::OrderFlowError,
        notification_api::{default_audience, fan_out_order_status},
        order_objects::{
            Audience,
            NewOrderRequest,
            OrderDetail,
            PlacedOrder,
            StatusChangeRequest,
            StatusKind,
            TransitionResult,
        },
        state_machine::check_status_change,
    },
    traits::{
        DeliveryManagement,
        LedgerManagement,
        NotificationManagement,
        OrderManagement,
        OrderQueryFilter,
        StatusUpdate,
        StoreError,
    },
};

/// Fetches the order, mapping a missing order to [`OrderFlowError::OrderNotFound`].
pub(crate) async fn require_order<B: OrderManagement>(db: &B, order_id: &OrderId) -> Result<Order, OrderFlowError> {
    db.fetch_order(order_id).await?.ok_or_else(|| {
        debug!("🔄️ Order {order_id} does not exist");
        OrderFlowError::OrderNotFound(order_id.clone())
    })
}

/// Fetches the order and checks that `actor` is allowed to see it.
pub(crate) async fn require_visible_order<B: OrderManagement>(
    db: &B,
    actor: &Actor,
    order_id: &OrderId,
) -> Result<Order, OrderFlowError> {
    let order = require_order(db, order_id).await?;
    if order.is_visible_to(actor) {
        Ok(order)
    } else {
        Err(OrderFlowError::unauthorized(format!("Order {} is not one of yours.", order_id.short())))
    }
}

/// Collects everything recorded against `order` into a read-only snapshot.
pub async fn load_order_detail<B>(db: &B, order: Order) -> Result<OrderDetail, StoreError>
where B: OrderManagement + DeliveryManagement + LedgerManagement {
    let items = db.fetch_order_items(&order.id).await?;
    let timeline = db.fetch_delivery_timeline(&order.id).await?;
    let proof = db.fetch_delivery_proof(&order.id).await?;
    let ledger_entry = db.fetch_ledger_entry(&order.id).await?;
    Ok(OrderDetail { order, items, timeline, proof, ledger_entry })
}

/// `OrderFlowApi` owns the order state machine: placing orders and moving them between states in response to
/// wholesaler actions.
///
/// Every successful change is followed by a notification fan-out, which completes before the call returns, and an
/// [`OrderUpdatedEvent`] on the event bus.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + DeliveryManagement + LedgerManagement + NotificationManagement
{
    /// Places a new order on behalf of a retailer.
    ///
    /// The total is computed from the line items and frozen at this point. The wholesaler is notified.
    pub async fn place_order(&self, actor: &Actor, request: NewOrderRequest) -> Result<PlacedOrder, OrderFlowError> {
        if actor.role != Role::Retailer {
            return Err(OrderFlowError::unauthorized("Only retailers can place orders."));
        }
        validate_new_order(&request)?;
        if request.reference_number.is_some() && !self.db.supports_reference_numbers().await? {
            return Err(OrderFlowError::InvalidRequest("This store does not accept order reference numbers.".into()));
        }
        let mut order =
            NewOrder::new(actor.user_id.clone(), request.wholesaler_id, request.items, request.payment_method);
        order.notes = request.notes;
        order.reference_number = request.reference_number;
        let (order, items) = self.db.insert_order(order).await?;
        info!(
            "🔄️ Order {} for {} placed by {} with {}",
            order.id,
            order.total_amount,
            order.retailer_id,
            order.wholesaler_id
        );
        let kind = StatusKind::Order(order.status);
        let fan_out = fan_out_order_status(&self.db, &order, kind, default_audience(kind)).await;
        self.publish(&order, OrderChange::Placed).await;
        Ok(PlacedOrder { order, items, fan_out })
    }

    /// Applies a direct state machine transition.
    ///
    /// Checks run in a fixed order: the order exists, the source state is not terminal, the actor may make the
    /// change, and the edge is allowed. The write is a compare-and-swap on the status that was checked, so a
    /// concurrent change by someone else yields [`OrderFlowError::Conflict`].
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        request: StatusChangeRequest,
    ) -> Result<TransitionResult, OrderFlowError> {
        let order = require_order(&self.db, order_id).await?;
        let from = order.status;
        let to = request.status;
        check_status_change(&order, actor, to)?;
        if request.delivery_partner_id.is_some() && to != OrderStatusType::Dispatched {
            return Err(OrderFlowError::InvalidRequest(
                "A delivery partner can only be given when dispatching an order.".into(),
            ));
        }
        let update = StatusUpdate::new(to, actor.user_id.clone())
            .with_notes(request.notes)
            .with_delivery_partner(request.delivery_partner_id);
        let updated = self.db.update_order_status(order_id, from, update).await?.ok_or_else(|| {
            warn!("🔄️ Order {order_id} changed underneath {actor} while moving it from {from} to {to}");
            OrderFlowError::Conflict(order_id.clone())
        })?;
        info!("🔄️ Order {order_id} moved from {from} to {to} by {actor}");
        let kind = StatusKind::Order(to);
        let fan_out = fan_out_order_status(&self.db, &updated, kind, default_audience(kind)).await;
        self.publish(&updated, OrderChange::Status { from, to }).await;
        Ok(TransitionResult { order: updated, fan_out })
    }

    /// The orders visible to `actor` that match `filter`, most recent first.
    pub async fn fetch_orders(&self, actor: &Actor, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let filter = filter.scoped_to(actor);
        let orders = self.db.search_orders(filter).await?;
        trace!("🔄️ {} orders found for {actor}", orders.len());
        Ok(orders)
    }

    pub async fn fetch_order_detail(&self, actor: &Actor, order_id: &OrderId) -> Result<OrderDetail, OrderFlowError> {
        let order = require_visible_order(&self.db, actor, order_id).await?;
        let detail = load_order_detail(&self.db, order).await?;
        Ok(detail)
    }

    /// Notifies an explicit audience about the order's current status, independently of any transition.
    pub async fn renotify(&self, order_id: &OrderId, audience: Audience) -> Result<TransitionResult, OrderFlowError> {
        let order = require_order(&self.db, order_id).await?;
        let fan_out = fan_out_order_status(&self.db, &order, StatusKind::Order(order.status), audience).await;
        Ok(TransitionResult { order, fan_out })
    }

    async fn publish(&self, order: &Order, change: OrderChange) {
        trace!("🔄️ Publishing {change:?} for order {}", order.id);
        self.producers.publish_order_updated(OrderUpdatedEvent::new(order.clone(), change)).await;
    }
}

fn validate_new_order(request: &NewOrderRequest) -> Result<(), OrderFlowError> {
    if request.wholesaler_id.as_str().trim().is_empty() {
        return Err(OrderFlowError::InvalidRequest("An order needs a wholesaler.".into()));
    }
    if request.items.is_empty() {
        return Err(OrderFlowError::InvalidRequest("An order needs at least one item.".into()));
    }
    if let Some(item) = request.items.iter().find(|i| i.quantity <= 0) {
        return Err(OrderFlowError::InvalidRequest(format!(
            "Quantity for {} must be positive, not {}.",
            item.product_id, item.quantity
        )));
    }
    if let Some(item) = request.items.iter().find(|i| i.unit_price.is_negative()) {
        return Err(OrderFlowError::InvalidRequest(format!("Price for {} cannot be negative.", item.product_id)));
    }
    if NewOrder::total_of(&request.items).is_none() {
        return Err(OrderFlowError::InvalidRequest("The order total is too large to be recorded.".into()));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::{NewOrderItem, Paise, PaymentMethod};

    fn request(items: Vec<NewOrderItem>) -> NewOrderRequest {
        NewOrderRequest {
            wholesaler_id: "wholesaler".into(),
            items,
            payment_method: PaymentMethod::CashOnDelivery,
            notes: None,
            reference_number: None,
        }
    }

    #[test]
    fn new_orders_are_validated() {
        assert!(validate_new_order(&request(vec![NewOrderItem::new("rice", 2, Paise::from_rupees(250))])).is_ok());
        assert!(validate_new_order(&request(vec![NewOrderItem::new("free-sample", 1, Paise::from(0))])).is_ok());
        let err = validate_new_order(&request(vec![])).unwrap_err();
        assert!(matches!(err, OrderFlowError::InvalidRequest(_)));
        let err = validate_new_order(&request(vec![NewOrderItem::new("rice", 0, Paise::from(100))])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid request. Quantity for rice must be positive, not 0.");
        let err = validate_new_order(&request(vec![NewOrderItem::new("rice", 1, Paise::from(-1))])).unwrap_err();
        assert!(matches!(err, OrderFlowError::InvalidRequest(_)));
        let mut no_wholesaler = request(vec![NewOrderItem::new("rice", 1, Paise::from(100))]);
        no_wholesaler.wholesaler_id = " ".into();
        assert!(validate_new_order(&no_wholesaler).is_err());
    }

    #[test]
    fn oversized_totals_are_rejected() {
        let huge = vec![NewOrderItem::new("rice", i64::MAX / 2, Paise::from(4))];
        let err = validate_new_order(&request(huge)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidRequest);
        let items = vec![
            NewOrderItem::new("rice", 1, Paise::from(i64::MAX - 10)),
            NewOrderItem::new("dal", 1, Paise::from(11)),
        ];
        assert!(matches!(validate_new_order(&request(items)), Err(OrderFlowError::InvalidRequest(_))));
    }
}
