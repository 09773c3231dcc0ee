use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{
    DeliveryProof,
    DeliveryStatus,
    DeliveryStatusUpdate,
    LedgerEntry,
    NewOrderItem,
    Order,
    OrderItem,
    OrderStatusType,
    PaymentMethod,
    UserId,
};

//--------------------------------------        Requests       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub wholesaler_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: OrderStatusType,
    #[serde(default)]
    pub notes: Option<String>,
    /// Only accepted on `confirmed → dispatched`.
    #[serde(default)]
    pub delivery_partner_id: Option<UserId>,
}

impl StatusChangeRequest {
    pub fn new(status: OrderStatusType) -> Self {
        Self { status, notes: None, delivery_partner_id: None }
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_delivery_partner<U: Into<UserId>>(mut self, partner: U) -> Self {
        self.delivery_partner_id = Some(partner.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignPartnerRequest {
    pub delivery_partner_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryUpdateRequest {
    pub status: DeliveryStatus,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl DeliveryUpdateRequest {
    pub fn new(status: DeliveryStatus) -> Self {
        Self { status, latitude: None, longitude: None, note: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryProofRequest {
    pub receiver_name: String,
    #[serde(default)]
    pub photo_ref: Option<String>,
    #[serde(default)]
    pub signature_ref: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DeliveryProofRequest {
    pub fn new<S: Into<String>>(receiver_name: S) -> Self {
        Self { receiver_name: receiver_name.into(), ..Default::default() }
    }
}

//--------------------------------------     Notifications     ---------------------------------------------------------
/// Who should hear about a change to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Retailer,
    Wholesaler,
    DeliveryPartner,
    All,
}

/// The event a status notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum StatusKind {
    Order(OrderStatusType),
    Delivery(DeliveryStatus),
    PartnerAssigned,
    ProofCaptured,
}

impl Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Order(s) => write!(f, "{s}"),
            Self::Delivery(s) => write!(f, "delivery {s}"),
            Self::PartnerAssigned => write!(f, "partner assigned"),
            Self::ProofCaptured => write!(f, "proof captured"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentNotice {
    Success,
    Failed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedNotification {
    pub user_id: UserId,
    pub reason: String,
}

/// The result of notifying each recipient. Each recipient is an independent write, so some may fail while others
/// succeed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutReport {
    pub notified: Vec<UserId>,
    pub failed: Vec<FailedNotification>,
}

impl FanOutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: FanOutReport) {
        self.notified.extend(other.notified);
        self.failed.extend(other.failed);
    }
}

//--------------------------------------        Results        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub order: Order,
    pub fan_out: FanOutReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub fan_out: FanOutReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryUpdateResult {
    pub order: Order,
    pub update: DeliveryStatusUpdate,
    pub fan_out: FanOutReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofResult {
    pub proof: DeliveryProof,
    pub fan_out: FanOutReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// The ledger entry was written and the order is now paid.
    Settled,
    /// A ledger entry already existed. The order is (now) marked paid.
    AlreadySettled,
    /// The ledger entry exists but the order could not be flagged as paid. Retrying completes the settlement.
    PartiallySettled { reason: String },
}

impl PaymentOutcome {
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartiallySettled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub outcome: PaymentOutcome,
    pub order: Order,
    pub entry: LedgerEntry,
    pub fan_out: FanOutReport,
}

/// Read-only snapshot of an order and everything recorded against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub timeline: Vec<DeliveryStatusUpdate>,
    pub proof: Option<DeliveryProof>,
    pub ledger_entry: Option<LedgerEntry>,
}

//--------------------------------------       Resolution      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    ExactId,
    TruncatedId,
    NotificationReference,
    ReferenceNumber,
    Substring,
}

impl Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ExactId => "exact id",
            Self::TruncatedId => "truncated id",
            Self::NotificationReference => "notification reference",
            Self::ReferenceNumber => "reference number",
            Self::Substring => "substring",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOrder {
    pub strategy: ResolutionStrategy,
    pub detail: OrderDetail,
}
