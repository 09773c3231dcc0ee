//! Pure transition rules for orders and the delivery pipeline.
//!
//! ```text
//!   placed ──► confirmed ──► dispatched ══► delivered
//!     │            │
//!     └──► rejected ◄┘
//! ```
//!
//! `dispatched → delivered` (the double arrow) is never written directly. It happens when the assigned delivery
//! partner posts `delivered` on the delivery pipeline:
//!
//! ```text
//!   assigned ──► picked_up ──► in_transit ──► delivered
//!                  ▲  │            │
//!                  │  ▼            ▼
//!                  └─ failed ◄─────┘
//! ```
//!
//! Checks are applied in a fixed order: terminal source state, then the actor's role, then the edge itself.
use crate::{
    db_types::{Actor, DeliveryStatus, DeliveryStatus as D, Order, OrderStatusType, OrderStatusType as S, Role},
    oe_api::errors::OrderFlowError,
};

/// Edges that may be written directly through a status change.
pub fn is_direct_edge(from: OrderStatusType, to: OrderStatusType) -> bool {
    matches!(
        (from, to),
        (S::Placed, S::Confirmed) | (S::Placed, S::Rejected) | (S::Confirmed, S::Rejected) | (S::Confirmed, S::Dispatched)
    )
}

/// Whether `next` may follow `latest` on an order's delivery timeline. `assigned` entries are only ever written by
/// partner assignment.
pub fn is_valid_delivery_step(latest: Option<DeliveryStatus>, next: DeliveryStatus) -> bool {
    matches!(
        (latest, next),
        (Some(D::Assigned), D::PickedUp) |
            (Some(D::Failed), D::PickedUp) |
            (Some(D::PickedUp), D::InTransit) |
            (Some(D::InTransit), D::Delivered) |
            (Some(D::PickedUp), D::Failed) |
            (Some(D::InTransit), D::Failed)
    )
}

pub fn is_owning_wholesaler(order: &Order, actor: &Actor) -> bool {
    actor.role == Role::Wholesaler && order.wholesaler_id == actor.user_id
}

pub fn is_assigned_partner(order: &Order, actor: &Actor) -> bool {
    actor.role == Role::DeliveryPartner && order.is_assigned_to(&actor.user_id)
}

/// Validates a direct status change of `order` to `to` by `actor`.
pub fn check_status_change(order: &Order, actor: &Actor, to: OrderStatusType) -> Result<(), OrderFlowError> {
    if order.status.is_terminal() {
        return Err(OrderFlowError::invalid_transition(&order.id, order.status, to));
    }
    match to {
        S::Confirmed | S::Rejected | S::Dispatched if !is_owning_wholesaler(order, actor) => {
            return Err(OrderFlowError::unauthorized(format!(
                "Only the wholesaler for order {} can mark it {to}.",
                order.id.short()
            )));
        },
        S::Delivered if !(is_assigned_partner(order, actor) || actor.is_operator()) => {
            return Err(OrderFlowError::unauthorized(format!(
                "Only the delivery partner assigned to order {} can mark it delivered.",
                order.id.short()
            )));
        },
        S::Placed if actor.role != Role::Retailer => {
            return Err(OrderFlowError::unauthorized("Only retailers place orders."));
        },
        _ => {},
    }
    if !is_direct_edge(order.status, to) {
        return Err(OrderFlowError::invalid_transition(&order.id, order.status, to));
    }
    Ok(())
}

/// Validates that `actor` may write to the delivery pipeline of `order`. Operators may act on a partner's behalf.
pub fn check_delivery_actor(order: &Order, actor: &Actor) -> Result<(), OrderFlowError> {
    if is_assigned_partner(order, actor) || actor.is_operator() {
        Ok(())
    } else {
        Err(OrderFlowError::unauthorized(format!(
            "Only the delivery partner assigned to order {} can update its delivery.",
            order.id.short()
        )))
    }
}

/// Validates that `actor` may assign a delivery partner to `order`.
pub fn check_assignment_actor(order: &Order, actor: &Actor) -> Result<(), OrderFlowError> {
    if is_owning_wholesaler(order, actor) || actor.is_operator() {
        Ok(())
    } else {
        Err(OrderFlowError::unauthorized(format!(
            "Only the wholesaler for order {} can assign a delivery partner.",
            order.id.short()
        )))
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::{
        db_types::{OrderId, Paise, PaymentMethod, PaymentStatus},
        oe_api::errors::ErrorKind,
    };

    fn order(status: OrderStatusType) -> Order {
        Order {
            id: OrderId::from("0f3c9a1e-0000-4000-8000-000000000001"),
            retailer_id: "retailer".into(),
            wholesaler_id: "wholesaler".into(),
            delivery_partner_id: Some("partner".into()),
            reference_number: None,
            total_amount: Paise::from_rupees(500),
            status,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn kind(r: Result<(), OrderFlowError>) -> Option<ErrorKind> {
        r.err().map(|e| e.kind())
    }

    #[test]
    fn wholesaler_edges() {
        let w = Actor::wholesaler("wholesaler");
        assert!(check_status_change(&order(S::Placed), &w, S::Confirmed).is_ok());
        assert!(check_status_change(&order(S::Placed), &w, S::Rejected).is_ok());
        assert!(check_status_change(&order(S::Confirmed), &w, S::Rejected).is_ok());
        assert!(check_status_change(&order(S::Confirmed), &w, S::Dispatched).is_ok());
        assert_eq!(kind(check_status_change(&order(S::Placed), &w, S::Dispatched)), Some(ErrorKind::InvalidTransition));
        assert_eq!(kind(check_status_change(&order(S::Dispatched), &w, S::Rejected)), Some(ErrorKind::InvalidTransition));
    }

    #[test]
    fn terminal_states_are_checked_before_roles() {
        let stranger = Actor::retailer("someone");
        for status in [S::Delivered, S::Rejected] {
            let r = check_status_change(&order(status), &stranger, S::Rejected);
            assert_eq!(kind(r), Some(ErrorKind::InvalidTransition));
        }
    }

    #[test]
    fn roles_are_checked_before_edges() {
        let retailer = Actor::retailer("retailer");
        let other_wholesaler = Actor::wholesaler("another-wholesaler");
        assert_eq!(kind(check_status_change(&order(S::Placed), &retailer, S::Confirmed)), Some(ErrorKind::Unauthorized));
        assert_eq!(
            kind(check_status_change(&order(S::Placed), &other_wholesaler, S::Confirmed)),
            Some(ErrorKind::Unauthorized)
        );
        // Not a valid edge, but the role mismatch is reported first
        assert_eq!(kind(check_status_change(&order(S::Placed), &retailer, S::Dispatched)), Some(ErrorKind::Unauthorized));
    }

    #[test]
    fn delivered_is_pipeline_only() {
        let w = Actor::wholesaler("wholesaler");
        let p = Actor::delivery_partner("partner");
        assert_eq!(kind(check_status_change(&order(S::Dispatched), &w, S::Delivered)), Some(ErrorKind::Unauthorized));
        assert_eq!(kind(check_status_change(&order(S::Dispatched), &p, S::Delivered)), Some(ErrorKind::InvalidTransition));
    }

    #[test]
    fn delivery_pipeline() {
        assert!(is_valid_delivery_step(Some(D::Assigned), D::PickedUp));
        assert!(is_valid_delivery_step(Some(D::PickedUp), D::InTransit));
        assert!(is_valid_delivery_step(Some(D::InTransit), D::Delivered));
        assert!(is_valid_delivery_step(Some(D::InTransit), D::Failed));
        assert!(is_valid_delivery_step(Some(D::Failed), D::PickedUp));
        assert!(!is_valid_delivery_step(None, D::PickedUp));
        assert!(!is_valid_delivery_step(Some(D::Assigned), D::Delivered));
        assert!(!is_valid_delivery_step(Some(D::PickedUp), D::Delivered));
        assert!(!is_valid_delivery_step(Some(D::InTransit), D::Assigned));
        assert!(!is_valid_delivery_step(Some(D::Delivered), D::Failed));
    }

    #[test]
    fn delivery_actors() {
        let o = order(S::Dispatched);
        assert!(check_delivery_actor(&o, &Actor::delivery_partner("partner")).is_ok());
        assert!(check_delivery_actor(&o, &Actor::operator("ops")).is_ok());
        assert_eq!(kind(check_delivery_actor(&o, &Actor::delivery_partner("other"))), Some(ErrorKind::Unauthorized));
        assert_eq!(kind(check_delivery_actor(&o, &Actor::wholesaler("wholesaler"))), Some(ErrorKind::Unauthorized));
        assert!(check_assignment_actor(&o, &Actor::wholesaler("wholesaler")).is_ok());
        assert_eq!(kind(check_assignment_actor(&o, &Actor::retailer("retailer"))), Some(ErrorKind::Unauthorized));
    }
}
