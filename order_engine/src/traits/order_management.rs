use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType},
    traits::{OrderQueryFilter, StatusUpdate, StoreError},
};

/// Storage of orders and their line items.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores the order and its line items in a single atomic transaction. The order total is computed from the
    /// items at this point and never changes afterwards.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), StoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, StoreError>;

    /// Fetches orders according to the criteria in `query`, most recent first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;

    /// The `limit` most recently created orders, most recent first.
    async fn fetch_recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError>;

    /// Whether the store's schema carries the optional `reference_number` column on orders.
    ///
    /// An absent column is not an error, and must be reported as `Ok(false)`.
    async fn supports_reference_numbers(&self) -> Result<bool, StoreError>;

    async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError>;

    /// Compare-and-swap status update.
    ///
    /// The update is only applied if the order's current status is `expected`. Returns the updated order, or `None`
    /// if the status did not match (or the order does not exist). If the update carries a delivery partner, an
    /// `assigned` entry is appended to the delivery timeline in the same transaction.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatusType,
        update: StatusUpdate,
    ) -> Result<Option<Order>, StoreError>;
}
