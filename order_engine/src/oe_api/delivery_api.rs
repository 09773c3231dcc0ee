//! Delivery partner assignment, the delivery status pipeline and proof of delivery.
//!
//! The delivery timeline is an append-only log. The order's own status stays authoritative: the only point at which
//! the pipeline touches it is `delivered`, which moves the order from `dispatched` to `delivered` in the same store
//! transaction as the timeline entry.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        Actor,
        DeliveryProof,
        DeliveryStatus,
        DeliveryStatusUpdate,
        NewDeliveryProof,
        NewDeliveryUpdate,
        Order,
        OrderId,
        OrderStatusType,
        UserId,
    },
    events::{EventProducers, OrderChange, OrderUpdatedEvent},
    oe_api::{
        errors::OrderFlowError,
        notification_api::{default_audience, fan_out_order_status},
        order_flow_api::{require_order, require_visible_order},
        order_objects::{
            AssignPartnerRequest,
            DeliveryProofRequest,
            DeliveryUpdateRequest,
            DeliveryUpdateResult,
            ProofResult,
            StatusKind,
        },
        state_machine::{check_assignment_actor, check_delivery_actor, is_valid_delivery_step},
    },
    traits::{DeliveryManagement, NotificationManagement, OrderManagement, StoreError},
};

pub struct DeliveryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for DeliveryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeliveryApi")
    }
}

impl<B> DeliveryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> DeliveryApi<B>
where B: OrderManagement + DeliveryManagement + NotificationManagement
{
    /// Assigns (or re-assigns) the delivery partner for an order that is `confirmed` or `dispatched`.
    ///
    /// An `assigned` entry is appended to the delivery timeline in the same transaction, and everyone on the order,
    /// including the new partner, is notified.
    pub async fn assign_delivery_partner(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        request: AssignPartnerRequest,
    ) -> Result<DeliveryUpdateResult, OrderFlowError> {
        let order = require_order(&self.db, order_id).await?;
        if order.status.is_terminal() {
            return Err(OrderFlowError::invalid_transition(order_id, order.status, "partner assignment"));
        }
        check_assignment_actor(&order, actor)?;
        if !matches!(order.status, OrderStatusType::Confirmed | OrderStatusType::Dispatched) {
            return Err(OrderFlowError::invalid_transition(order_id, order.status, "partner assignment"));
        }
        let partner = request.delivery_partner_id;
        if partner.as_str().trim().is_empty() {
            return Err(OrderFlowError::InvalidRequest("A delivery partner id is required.".into()));
        }
        if let Some(previous) = order.delivery_partner_id.as_ref().filter(|p| **p != partner) {
            info!("🚚️ Order {order_id} is being re-assigned from {previous} to {partner}");
        }
        let (order, update) =
            self.db.assign_delivery_partner(order_id, &partner, &actor.user_id).await?.ok_or_else(|| {
                warn!("🚚️ Order {order_id} left an assignable state before {partner} could be assigned");
                OrderFlowError::Conflict(order_id.clone())
            })?;
        info!("🚚️ {partner} assigned to order {order_id} by {actor}");
        let kind = StatusKind::PartnerAssigned;
        let fan_out = fan_out_order_status(&self.db, &order, kind, default_audience(kind)).await;
        self.publish(&order, OrderChange::PartnerAssigned { partner }).await;
        Ok(DeliveryUpdateResult { order, update, fan_out })
    }

    /// Appends the next step of the delivery pipeline.
    ///
    /// Posting `delivered` completes the order. The order status and the timeline entry are written together, so
    /// the two never disagree.
    pub async fn post_delivery_update(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        request: DeliveryUpdateRequest,
    ) -> Result<DeliveryUpdateResult, OrderFlowError> {
        let next = request.status;
        if next == DeliveryStatus::Assigned {
            return Err(OrderFlowError::InvalidRequest(
                "Partner assignments are recorded by assigning a delivery partner.".into(),
            ));
        }
        let location = validate_location(request.latitude, request.longitude)?;
        let order = require_order(&self.db, order_id).await?;
        if order.status.is_terminal() {
            return Err(OrderFlowError::invalid_transition(order_id, order.status, format!("delivery {next}")));
        }
        check_delivery_actor(&order, actor)?;
        if order.status != OrderStatusType::Dispatched {
            return Err(OrderFlowError::invalid_transition(order_id, order.status, format!("delivery {next}")));
        }
        let latest = self.db.fetch_latest_delivery_update(order_id).await?.map(|u| u.status);
        if !is_valid_delivery_step(latest, next) {
            let current = latest.map(|s| s.to_string()).unwrap_or_else(|| "unassigned".to_string());
            return Err(OrderFlowError::PreconditionFailed(format!(
                "Delivery of order {} is {current} and cannot move to {next}.",
                order_id.short()
            )));
        }
        let mut update = NewDeliveryUpdate::new(order_id.clone(), next, actor.user_id.clone());
        if let Some((lat, lng)) = location {
            update = update.with_location(lat, lng);
        }
        update.note = request.note;

        let (order, entry, change) = if next == DeliveryStatus::Delivered {
            let (order, entry) = self.db.complete_delivery(update).await?.ok_or_else(|| {
                warn!("🚚️ Order {order_id} was no longer dispatched when {actor} tried to complete it");
                OrderFlowError::Conflict(order_id.clone())
            })?;
            info!("🚚️ Order {order_id} delivered by {actor}");
            let change = OrderChange::Status { from: OrderStatusType::Dispatched, to: OrderStatusType::Delivered };
            (order, entry, change)
        } else {
            let entry = self.db.append_delivery_update(update).await?;
            debug!("🚚️ Order {order_id} delivery is now {next}");
            (order, entry, OrderChange::Delivery { status: next })
        };
        let kind = StatusKind::Delivery(next);
        let fan_out = fan_out_order_status(&self.db, &order, kind, default_audience(kind)).await;
        self.publish(&order, change).await;
        Ok(DeliveryUpdateResult { order, update: entry, fan_out })
    }

    /// Records the proof of delivery. An order has at most one proof, and it cannot be replaced.
    pub async fn submit_delivery_proof(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        request: DeliveryProofRequest,
    ) -> Result<ProofResult, OrderFlowError> {
        let order = require_order(&self.db, order_id).await?;
        check_delivery_actor(&order, actor)?;
        if !matches!(order.status, OrderStatusType::Dispatched | OrderStatusType::Delivered) {
            return Err(OrderFlowError::invalid_transition(order_id, order.status, "proof of delivery"));
        }
        let receiver_name = request.receiver_name.trim().to_string();
        if receiver_name.is_empty() {
            return Err(OrderFlowError::InvalidRequest("The receiver's name is required.".into()));
        }
        if self.db.fetch_delivery_proof(order_id).await?.is_some() {
            return Err(proof_exists(order_id));
        }
        let proof = NewDeliveryProof {
            order_id: order_id.clone(),
            receiver_name,
            photo_ref: request.photo_ref,
            signature_ref: request.signature_ref,
            notes: request.notes,
            created_by: actor.user_id.clone(),
        };
        let proof = match self.db.insert_delivery_proof(proof).await {
            Ok(p) => p,
            Err(StoreError::UniqueViolation(_)) => return Err(proof_exists(order_id)),
            Err(e) => return Err(e.into()),
        };
        info!("🚚️ Proof of delivery for order {order_id} received from {} by {actor}", proof.receiver_name);
        let kind = StatusKind::ProofCaptured;
        let fan_out = fan_out_order_status(&self.db, &order, kind, default_audience(kind)).await;
        self.publish_change(order_id, OrderChange::ProofCaptured).await;
        Ok(ProofResult { proof, fan_out })
    }

    pub async fn fetch_delivery_timeline(
        &self,
        actor: &Actor,
        order_id: &OrderId,
    ) -> Result<Vec<DeliveryStatusUpdate>, OrderFlowError> {
        require_visible_order(&self.db, actor, order_id).await?;
        let timeline = self.db.fetch_delivery_timeline(order_id).await?;
        Ok(timeline)
    }

    pub async fn fetch_delivery_proof(
        &self,
        actor: &Actor,
        order_id: &OrderId,
    ) -> Result<Option<DeliveryProof>, OrderFlowError> {
        require_visible_order(&self.db, actor, order_id).await?;
        let proof = self.db.fetch_delivery_proof(order_id).await?;
        Ok(proof)
    }

    /// The partner currently assigned to the order, if any.
    pub async fn assigned_partner(&self, actor: &Actor, order_id: &OrderId) -> Result<Option<UserId>, OrderFlowError> {
        let order = require_visible_order(&self.db, actor, order_id).await?;
        Ok(order.delivery_partner_id)
    }

    async fn publish(&self, order: &Order, change: OrderChange) {
        self.producers.publish_order_updated(OrderUpdatedEvent::new(order.clone(), change)).await;
    }

    // The order may have changed since it was checked, so publish the current copy
    async fn publish_change(&self, order_id: &OrderId, change: OrderChange) {
        match self.db.fetch_order(order_id).await {
            Ok(Some(order)) => self.publish(&order, change).await,
            Ok(None) => error!("🚚️ Order {order_id} disappeared after a proof of delivery was recorded"),
            Err(e) => warn!("🚚️ Could not publish {change:?} for order {order_id}. {e}"),
        }
    }
}

fn proof_exists(order_id: &OrderId) -> OrderFlowError {
    OrderFlowError::AlreadyExists(format!("Order {} already has a proof of delivery.", order_id.short()))
}

/// Coordinates are optional, but must be given as a pair and be in range.
fn validate_location(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<(f64, f64)>, OrderFlowError> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(lat), Some(lng)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) => {
            Ok(Some((lat, lng)))
        },
        (Some(_), Some(_)) => Err(OrderFlowError::InvalidRequest("Coordinates are out of range.".into())),
        _ => Err(OrderFlowError::InvalidRequest("Latitude and longitude must be given together.".into())),
    }
}
