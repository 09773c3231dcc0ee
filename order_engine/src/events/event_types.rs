use serde::{Deserialize, Serialize};

use crate::db_types::{DeliveryStatus, Order, OrderStatusType, UserId};

/// What happened to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderChange {
    Placed,
    Status { from: OrderStatusType, to: OrderStatusType },
    PartnerAssigned { partner: UserId },
    Delivery { status: DeliveryStatus },
    ProofCaptured,
    PaymentSettled,
}

impl OrderChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Placed => ChangeKind::Placed,
            Self::Status { .. } => ChangeKind::Status,
            Self::PartnerAssigned { .. } => ChangeKind::PartnerAssigned,
            Self::Delivery { .. } => ChangeKind::Delivery,
            Self::ProofCaptured => ChangeKind::ProofCaptured,
            Self::PaymentSettled => ChangeKind::PaymentSettled,
        }
    }
}

/// The kind of an [`OrderChange`], without its data. Used to subscribe to some changes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Placed,
    Status,
    PartnerAssigned,
    Delivery,
    ProofCaptured,
    PaymentSettled,
}

/// Emitted after every committed change to an order. Carries the order as it was after the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdatedEvent {
    pub order: Order,
    pub change: OrderChange,
}

impl OrderUpdatedEvent {
    pub fn new(order: Order, change: OrderChange) -> Self {
        Self { order, change }
    }

    /// Everyone with an interest in this order. These are the parties whose views should be refreshed.
    pub fn interested_parties(&self) -> Vec<UserId> {
        let mut parties = vec![self.order.retailer_id.clone(), self.order.wholesaler_id.clone()];
        if let Some(partner) = &self.order.delivery_partner_id {
            parties.push(partner.clone());
        }
        parties
    }
}
