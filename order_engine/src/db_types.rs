//! Record types persisted by the order store, along with the small newtypes and enums they are built from.
use std::{fmt::Display, str::FromStr};

pub use b2b_common::Paise;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(&'static str, String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh, random (v4 UUID) order identifier.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The truncated form of the id that is shown to users in notifications and receipts.
    pub fn short(&self) -> &str {
        b2b_common::helpers::short_id(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------         UserId        ---------------------------------------------------------
/// The identity of a marketplace participant, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&String> for UserId {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------          Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Retailer,
    Wholesaler,
    DeliveryPartner,
    /// Marketplace staff. May act on behalf of wholesalers and delivery partners.
    Operator,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Retailer => write!(f, "retailer"),
            Role::Wholesaler => write!(f, "wholesaler"),
            Role::DeliveryPartner => write!(f, "delivery_partner"),
            Role::Operator => write!(f, "operator"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retailer" => Ok(Self::Retailer),
            "wholesaler" => Ok(Self::Wholesaler),
            "delivery_partner" | "delivery-partner" => Ok(Self::DeliveryPartner),
            "operator" => Ok(Self::Operator),
            _ => Err(ConversionError("role", s.to_string())),
        }
    }
}

//--------------------------------------         Actor         ---------------------------------------------------------
/// The caller of an operation, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new<U: Into<UserId>>(user_id: U, role: Role) -> Self {
        Self { user_id: user_id.into(), role }
    }

    pub fn retailer<U: Into<UserId>>(user_id: U) -> Self {
        Self::new(user_id, Role::Retailer)
    }

    pub fn wholesaler<U: Into<UserId>>(user_id: U) -> Self {
        Self::new(user_id, Role::Wholesaler)
    }

    pub fn delivery_partner<U: Into<UserId>>(user_id: U) -> Self {
        Self::new(user_id, Role::DeliveryPartner)
    }

    pub fn operator<U: Into<UserId>>(user_id: U) -> Self {
        Self::new(user_id, Role::Operator)
    }

    pub fn is_operator(&self) -> bool {
        self.role == Role::Operator
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.user_id, self.role)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The retailer has placed the order and it is awaiting the wholesaler.
    Placed,
    /// The wholesaler has accepted the order.
    Confirmed,
    /// The goods have left the wholesaler and are with a delivery partner.
    Dispatched,
    /// Terminal. The goods have been handed over to the retailer.
    Delivered,
    /// Terminal. The wholesaler declined the order.
    Rejected,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Rejected)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed => write!(f, "placed"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Dispatched => write!(f, "dispatched"),
            Self::Delivered => write!(f, "delivered"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placed" => Ok(Self::Placed),
            "confirmed" => Ok(Self::Confirmed),
            "dispatched" => Ok(Self::Dispatched),
            "delivered" => Ok(Self::Delivered),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ConversionError("order status", s.to_string())),
        }
    }
}

//--------------------------------------  Payment method/status ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Electronic,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashOnDelivery => write!(f, "cash_on_delivery"),
            Self::Electronic => write!(f, "electronic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
        }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub retailer_id: UserId,
    pub wholesaler_id: UserId,
    pub delivery_partner_id: Option<UserId>,
    /// Only present on stores whose schema carries the reference number column.
    #[sqlx(default)]
    pub reference_number: Option<String>,
    pub total_amount: Paise,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_cash_on_delivery(&self) -> bool {
        self.payment_method == PaymentMethod::CashOnDelivery
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn is_assigned_to(&self, partner: &UserId) -> bool {
        self.delivery_partner_id.as_ref() == Some(partner)
    }

    /// Retailers and wholesalers see their own orders, delivery partners see the orders assigned to them, and
    /// operators see everything.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        match actor.role {
            Role::Retailer => self.retailer_id == actor.user_id,
            Role::Wholesaler => self.wholesaler_id == actor.user_id,
            Role::DeliveryPartner => self.is_assigned_to(&actor.user_id),
            Role::Operator => true,
        }
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Paise,
}

impl OrderItem {
    /// `None` if the line total overflows.
    pub fn line_total(&self) -> Option<Paise> {
        self.unit_price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Paise,
}

impl NewOrderItem {
    pub fn new<S: Into<String>>(product_id: S, quantity: i64, unit_price: Paise) -> Self {
        Self { product_id: product_id.into(), quantity, unit_price }
    }

    /// `None` if the line total overflows.
    pub fn line_total(&self) -> Option<Paise> {
        self.unit_price.checked_mul(self.quantity)
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub id: OrderId,
    pub retailer_id: UserId,
    pub wholesaler_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub reference_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(retailer_id: UserId, wholesaler_id: UserId, items: Vec<NewOrderItem>, method: PaymentMethod) -> Self {
        Self {
            id: OrderId::random(),
            retailer_id,
            wholesaler_id,
            items,
            payment_method: method,
            notes: None,
            reference_number: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_reference_number<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference_number = Some(reference.into());
        self
    }

    /// The order total. This is computed once, at placement, and frozen on the order record. `None` if it cannot be
    /// represented.
    pub fn total_amount(&self) -> Option<Paise> {
        Self::total_of(&self.items)
    }

    pub fn total_of(items: &[NewOrderItem]) -> Option<Paise> {
        items.iter().try_fold(Paise::default(), |total, item| total.checked_add(item.line_total()?))
    }
}

//--------------------------------------    DeliveryStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assigned => write!(f, "assigned"),
            Self::PickedUp => write!(f, "picked_up"),
            Self::InTransit => write!(f, "in_transit"),
            Self::Delivered => write!(f, "delivered"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assigned" => Ok(Self::Assigned),
            "picked_up" => Ok(Self::PickedUp),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            _ => Err(ConversionError("delivery status", s.to_string())),
        }
    }
}

//--------------------------------------  DeliveryStatusUpdate  ---------------------------------------------------------
/// One entry in the append-only delivery timeline of an order.
///
/// `id` is a monotonically increasing sequence and breaks ties between entries with identical timestamps.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DeliveryStatusUpdate {
    pub id: i64,
    pub order_id: OrderId,
    pub status: DeliveryStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub note: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeliveryUpdate {
    pub order_id: OrderId,
    pub status: DeliveryStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub note: Option<String>,
    pub created_by: UserId,
}

impl NewDeliveryUpdate {
    pub fn new(order_id: OrderId, status: DeliveryStatus, created_by: UserId) -> Self {
        Self { order_id, status, latitude: None, longitude: None, note: None, created_by }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }
}

//--------------------------------------     DeliveryProof     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DeliveryProof {
    pub id: i64,
    pub order_id: OrderId,
    pub receiver_name: String,
    pub photo_ref: Option<String>,
    pub signature_ref: Option<String>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeliveryProof {
    pub order_id: OrderId,
    pub receiver_name: String,
    pub photo_ref: Option<String>,
    pub signature_ref: Option<String>,
    pub notes: Option<String>,
    pub created_by: UserId,
}

//--------------------------------------      LedgerEntry      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
}

/// A settled payment. At most one exists per order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Paise,
    pub fee: Paise,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub recorded_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub order_id: OrderId,
    pub amount: Paise,
    pub fee: Paise,
    pub payment_method: PaymentMethod,
    pub recorded_by: UserId,
}

//--------------------------------------     Notification      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RelatedEntity {
    Order,
    Payment,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub related_type: Option<RelatedEntity>,
    pub related_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// The order this notification refers to, if any. Payment notifications also refer to their order.
    pub fn related_order(&self) -> Option<OrderId> {
        match self.related_type {
            Some(RelatedEntity::Order) | Some(RelatedEntity::Payment) => self.related_id.clone().map(OrderId::from),
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub id: String,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub related_type: Option<RelatedEntity>,
    pub related_id: Option<String>,
}

impl NewNotification {
    pub fn new<T: Into<String>, M: Into<String>>(
        user_id: UserId,
        title: T,
        message: M,
        category: NotificationCategory,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            title: title.into(),
            message: message.into(),
            category,
            related_type: None,
            related_id: None,
        }
    }

    pub fn related_to(mut self, entity: RelatedEntity, id: &OrderId) -> Self {
        self.related_type = Some(entity);
        self.related_id = Some(id.as_str().to_string());
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn order(status: OrderStatusType) -> Order {
        Order {
            id: OrderId::from("a1b2c3d4-5e6f-4a0b-8c9d-0e1f2a3b4c5d"),
            retailer_id: "ret".into(),
            wholesaler_id: "whl".into(),
            delivery_partner_id: Some("dp".into()),
            reference_number: None,
            total_amount: Paise::from_rupees(10),
            status,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn total_is_sum_of_lines() {
        let items = vec![
            NewOrderItem::new("rice-25kg", 2, Paise::from_rupees(150)),
            NewOrderItem::new("dal-5kg", 1, Paise::from_rupees(200)),
        ];
        let order = NewOrder::new("ret".into(), "whl".into(), items, PaymentMethod::CashOnDelivery);
        assert_eq!(order.total_amount(), Some(Paise::from_rupees(500)));

        let huge = vec![NewOrderItem::new("rice", i64::MAX / 2, Paise::from(4))];
        assert_eq!(NewOrder::total_of(&huge), None);
        let lines = vec![
            NewOrderItem::new("rice", 1, Paise::from(i64::MAX - 10)),
            NewOrderItem::new("dal", 1, Paise::from(11)),
        ];
        assert_eq!(NewOrder::total_of(&lines), None);
    }

    #[test]
    fn visibility() {
        let o = order(OrderStatusType::Dispatched);
        assert!(o.is_visible_to(&Actor::retailer("ret")));
        assert!(!o.is_visible_to(&Actor::retailer("whl")));
        assert!(o.is_visible_to(&Actor::wholesaler("whl")));
        assert!(o.is_visible_to(&Actor::delivery_partner("dp")));
        assert!(!o.is_visible_to(&Actor::delivery_partner("dp2")));
        assert!(o.is_visible_to(&Actor::operator("ops")));
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatusType::Delivered.is_terminal());
        assert!(OrderStatusType::Rejected.is_terminal());
        assert!(!OrderStatusType::Dispatched.is_terminal());
    }

    #[test]
    fn parse_roles_and_statuses() {
        assert_eq!("Delivery_Partner".parse::<Role>().unwrap(), Role::DeliveryPartner);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!("in_transit".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::InTransit);
        assert_eq!("confirmed".parse::<OrderStatusType>().unwrap(), OrderStatusType::Confirmed);
    }

    #[test]
    fn short_ids() {
        assert_eq!(order(OrderStatusType::Placed).id.short(), "a1b2c3d4");
    }
}
