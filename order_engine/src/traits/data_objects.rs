use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{Actor, OrderId, OrderStatusType, Role, UserId};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A uniqueness constraint was violated. {0}")]
    UniqueViolation(String),
    #[error("A required table does not exist. The database migrations have not been run. {0}")]
    SchemaMissing(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Query error: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(err) if err.is_unique_violation() => Self::UniqueViolation(err.message().to_string()),
            sqlx::Error::Database(err) if err.message().contains("no such table") => {
                Self::SchemaMissing(err.message().to_string())
            },
            _ => Self::DatabaseError(e.to_string()),
        }
    }
}

/// The fields written by a compare-and-swap order status update.
///
/// `notes` and `delivery_partner_id` are written in the same statement as the new status, so readers never observe
/// the status change without them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatusType,
    pub notes: Option<String>,
    pub delivery_partner_id: Option<UserId>,
    /// Who made the change. Used as the author of the timeline entry when a partner is assigned.
    pub updated_by: UserId,
}

impl StatusUpdate {
    pub fn new(status: OrderStatusType, updated_by: UserId) -> Self {
        Self { status, notes: None, delivery_partner_id: None, updated_by }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_delivery_partner(mut self, partner: Option<UserId>) -> Self {
        self.delivery_partner_id = partner;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub retailer_id: Option<UserId>,
    pub wholesaler_id: Option<UserId>,
    pub delivery_partner_id: Option<UserId>,
    pub status: Option<Vec<OrderStatusType>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl OrderQueryFilter {
    /// Restricts the filter to the orders the given actor is allowed to see. Any conflicting party filter supplied by
    /// the caller is overwritten.
    pub fn scoped_to(mut self, actor: &Actor) -> Self {
        match actor.role {
            Role::Retailer => self.retailer_id = Some(actor.user_id.clone()),
            Role::Wholesaler => self.wholesaler_id = Some(actor.user_id.clone()),
            Role::DeliveryPartner => self.delivery_partner_id = Some(actor.user_id.clone()),
            Role::Operator => {},
        }
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.retailer_id.is_none() &&
            self.wholesaler_id.is_none() &&
            self.delivery_partner_id.is_none() &&
            self.status.as_ref().map_or(true, |s| s.is_empty()) &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scoping_overrides_party_filters() {
        let filter = OrderQueryFilter { retailer_id: Some("someone-else".into()), ..Default::default() };
        let scoped = filter.scoped_to(&Actor::retailer("me"));
        assert_eq!(scoped.retailer_id, Some(UserId::from("me")));

        let scoped = OrderQueryFilter::default().scoped_to(&Actor::operator("ops"));
        assert!(scoped.is_empty());

        let scoped = OrderQueryFilter::default().scoped_to(&Actor::delivery_partner("dp"));
        assert_eq!(scoped.delivery_partner_id, Some(UserId::from("dp")));
    }

    #[test]
    fn status_filter() {
        let filter = OrderQueryFilter::default().with_status(OrderStatusType::Placed);
        assert!(!filter.is_empty());
        assert_eq!(filter.status, Some(vec![OrderStatusType::Placed]));
    }
}
