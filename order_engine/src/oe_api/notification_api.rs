//! Notification fan-out.
//!
//! Every committed change to an order produces one notification per interested party. Each recipient's notification
//! is an independent write: a failure for one recipient is recorded in the [`FanOutReport`] and logged, and never
//! undoes the change that triggered it or blocks the other recipients.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        Actor,
        DeliveryStatus,
        NewNotification,
        Notification,
        NotificationCategory,
        Order,
        OrderId,
        OrderStatusType,
        RelatedEntity,
        UserId,
    },
    oe_api::{
        errors::OrderFlowError,
        order_objects::{Audience, FailedNotification, FanOutReport, PaymentNotice, StatusKind},
    },
    traits::{NotificationManagement, OrderManagement, StoreError},
};

/// The category shown alongside a status notification.
pub fn category_for(kind: StatusKind) -> NotificationCategory {
    match kind {
        StatusKind::Order(OrderStatusType::Confirmed | OrderStatusType::Delivered) => NotificationCategory::Success,
        StatusKind::Delivery(DeliveryStatus::Delivered) => NotificationCategory::Success,
        StatusKind::Order(OrderStatusType::Placed | OrderStatusType::Dispatched) => NotificationCategory::Info,
        StatusKind::Order(OrderStatusType::Rejected) => NotificationCategory::Error,
        _ => NotificationCategory::Info,
    }
}

/// Who is told about each kind of change when the engine fans out on its own behalf.
pub fn default_audience(kind: StatusKind) -> Audience {
    match kind {
        StatusKind::Order(OrderStatusType::Placed) => Audience::Wholesaler,
        StatusKind::Order(OrderStatusType::Confirmed | OrderStatusType::Rejected) => Audience::Retailer,
        _ => Audience::All,
    }
}

/// The recipients for `audience` on `order`. The delivery partner is skipped when none is assigned.
pub fn recipients(order: &Order, audience: Audience) -> Vec<UserId> {
    let partner = order.delivery_partner_id.iter().cloned();
    let mut result: Vec<UserId> = match audience {
        Audience::Retailer => vec![order.retailer_id.clone()],
        Audience::Wholesaler => vec![order.wholesaler_id.clone()],
        Audience::DeliveryPartner => partner.collect(),
        Audience::All => [order.retailer_id.clone(), order.wholesaler_id.clone()].into_iter().chain(partner).collect(),
    };
    // One notification per person, even if they play two roles on the order
    let mut seen = Vec::with_capacity(result.len());
    result.retain(|u| {
        if seen.contains(u) {
            false
        } else {
            seen.push(u.clone());
            true
        }
    });
    result
}

fn status_copy(order: &Order, kind: StatusKind) -> (String, String) {
    let id = order.id.short();
    let (title, message) = match kind {
        StatusKind::Order(OrderStatusType::Placed) => (
            "New order received".to_string(),
            format!("Order {id} for {} has been placed by {}.", order.total_amount, order.retailer_id),
        ),
        StatusKind::Order(OrderStatusType::Confirmed) => {
            ("Order confirmed".to_string(), format!("Order {id} has been confirmed by the wholesaler."))
        },
        StatusKind::Order(OrderStatusType::Rejected) => {
            ("Order rejected".to_string(), format!("Order {id} has been rejected by the wholesaler."))
        },
        StatusKind::Order(OrderStatusType::Dispatched) => {
            ("Order dispatched".to_string(), format!("Order {id} has been dispatched and is on its way."))
        },
        StatusKind::Order(OrderStatusType::Delivered) | StatusKind::Delivery(DeliveryStatus::Delivered) => {
            ("Order delivered".to_string(), format!("Order {id} has been delivered."))
        },
        StatusKind::Delivery(DeliveryStatus::PickedUp) => {
            ("Order picked up".to_string(), format!("Order {id} has been picked up by the delivery partner."))
        },
        StatusKind::Delivery(DeliveryStatus::InTransit) => {
            ("Order in transit".to_string(), format!("Order {id} is in transit."))
        },
        StatusKind::Delivery(DeliveryStatus::Failed) => (
            "Delivery attempt failed".to_string(),
            format!("The delivery attempt for order {id} did not succeed. The partner will try again."),
        ),
        StatusKind::Delivery(DeliveryStatus::Assigned) | StatusKind::PartnerAssigned => {
            let partner = order.delivery_partner_id.as_ref().map(|p| p.as_str()).unwrap_or("A delivery partner");
            ("Delivery partner assigned".to_string(), format!("{partner} will deliver order {id}."))
        },
        StatusKind::ProofCaptured => {
            ("Proof of delivery recorded".to_string(), format!("Proof of delivery has been recorded for order {id}."))
        },
    };
    (title, message)
}

fn payment_copy(order_id: &OrderId, outcome: PaymentNotice) -> (&'static str, String, NotificationCategory) {
    let id = order_id.short();
    match outcome {
        PaymentNotice::Success => {
            ("Payment received", format!("Payment for order {id} has been received."), NotificationCategory::Success)
        },
        PaymentNotice::Failed => (
            "Payment failed",
            format!("We could not record the payment for order {id}. Please try again."),
            NotificationCategory::Error,
        ),
        PaymentNotice::Pending => (
            "Payment pending",
            format!("Payment for order {id} is awaiting confirmation."),
            NotificationCategory::Info,
        ),
    }
}

/// Writes one notification per recipient in `audience`. Never fails as a whole.
pub async fn fan_out_order_status<B: NotificationManagement>(
    db: &B,
    order: &Order,
    kind: StatusKind,
    audience: Audience,
) -> FanOutReport {
    let (title, message) = status_copy(order, kind);
    let category = category_for(kind);
    let mut report = FanOutReport::default();
    for user_id in recipients(order, audience) {
        let notification = NewNotification::new(user_id.clone(), title.clone(), message.clone(), category)
            .related_to(RelatedEntity::Order, &order.id);
        match db.insert_notification(notification).await {
            Ok(_) => report.notified.push(user_id),
            Err(e) => {
                warn!("🔔️ Could not notify {user_id} about {kind} on order {}. {e}", order.id);
                report.failed.push(FailedNotification { user_id, reason: e.to_string() });
            },
        }
    }
    if report.is_complete() {
        debug!("🔔️ {} notified about {kind} on order {}", report.notified.len(), order.id);
    } else {
        warn!(
            "🔔️ Partial fan-out for {kind} on order {}: {} notified, {} failed",
            order.id,
            report.notified.len(),
            report.failed.len()
        );
    }
    report
}

pub async fn send_payment_notice<B: NotificationManagement>(
    db: &B,
    order_id: &OrderId,
    outcome: PaymentNotice,
    user_id: &UserId,
) -> Result<Notification, StoreError> {
    let (title, message, category) = payment_copy(order_id, outcome);
    let notification =
        NewNotification::new(user_id.clone(), title, message, category).related_to(RelatedEntity::Payment, order_id);
    db.insert_notification(notification).await
}

/// Public face of the notification fan-out and the notification inbox.
pub struct NotificationApi<B> {
    db: B,
}

impl<B> Debug for NotificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B> NotificationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> NotificationApi<B>
where B: OrderManagement + NotificationManagement
{
    /// Notifies `audience` that `order_id` has reached `kind`.
    pub async fn notify_order_status(
        &self,
        order_id: &OrderId,
        kind: StatusKind,
        audience: Audience,
    ) -> Result<FanOutReport, OrderFlowError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        Ok(fan_out_order_status(&self.db, &order, kind, audience).await)
    }

    pub async fn notify_payment(
        &self,
        order_id: &OrderId,
        outcome: PaymentNotice,
        user_id: &UserId,
    ) -> Result<Notification, OrderFlowError> {
        let notification = send_payment_notice(&self.db, order_id, outcome, user_id).await?;
        Ok(notification)
    }

    pub async fn unread_notifications(&self, actor: &Actor) -> Result<Vec<Notification>, OrderFlowError> {
        let result = self.db.fetch_unread_notifications(&actor.user_id).await?;
        trace!("🔔️ {} unread notifications for {}", result.len(), actor.user_id);
        Ok(result)
    }

    pub async fn mark_read(&self, actor: &Actor, notification_id: &str) -> Result<(), OrderFlowError> {
        if self.db.mark_notification_read(notification_id, &actor.user_id).await? {
            Ok(())
        } else {
            Err(OrderFlowError::NotFound(format!("Notification {notification_id} does not exist")))
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{Paise, PaymentMethod, PaymentStatus};

    fn order(partner: Option<&str>) -> Order {
        Order {
            id: OrderId::from("5d41402a-bc4b-4a76-b971-9d911017c592"),
            retailer_id: "retailer".into(),
            wholesaler_id: "wholesaler".into(),
            delivery_partner_id: partner.map(UserId::from),
            reference_number: None,
            total_amount: Paise::from_rupees(500),
            status: OrderStatusType::Dispatched,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn categories() {
        use NotificationCategory::*;
        assert_eq!(category_for(StatusKind::Order(OrderStatusType::Confirmed)), Success);
        assert_eq!(category_for(StatusKind::Order(OrderStatusType::Delivered)), Success);
        assert_eq!(category_for(StatusKind::Order(OrderStatusType::Placed)), Info);
        assert_eq!(category_for(StatusKind::Order(OrderStatusType::Dispatched)), Info);
        assert_eq!(category_for(StatusKind::Order(OrderStatusType::Rejected)), Error);
        assert_eq!(category_for(StatusKind::Delivery(DeliveryStatus::InTransit)), Info);
        assert_eq!(category_for(StatusKind::ProofCaptured), Info);
    }

    #[test]
    fn partner_is_skipped_when_unassigned() {
        let o = order(None);
        assert!(recipients(&o, Audience::DeliveryPartner).is_empty());
        assert_eq!(recipients(&o, Audience::All), vec![UserId::from("retailer"), UserId::from("wholesaler")]);
        let o = order(Some("partner"));
        assert_eq!(recipients(&o, Audience::All).len(), 3);
        assert_eq!(recipients(&o, Audience::Retailer), vec![UserId::from("retailer")]);
    }

    #[test]
    fn copy_uses_short_ids() {
        let (title, message) = status_copy(&order(Some("partner")), StatusKind::Order(OrderStatusType::Placed));
        assert_eq!(title, "New order received");
        assert_eq!(message, "Order 5d41402a for ₹500.00 has been placed by retailer.");
        let (_, message, category) = payment_copy(&OrderId::from("5d41402a-bc4b"), PaymentNotice::Success);
        assert_eq!(message, "Payment for order 5d41402a has been received.");
        assert_eq!(category, NotificationCategory::Success);
    }
}
