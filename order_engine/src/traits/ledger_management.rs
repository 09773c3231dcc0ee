use crate::{
    db_types::{LedgerEntry, NewLedgerEntry, Order, OrderId},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    async fn fetch_ledger_entry(&self, order_id: &OrderId) -> Result<Option<LedgerEntry>, StoreError>;

    /// Records a settled payment. The store enforces at most one entry per order, and a second insert for the same
    /// order fails with [`StoreError::UniqueViolation`].
    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    /// Sets the order's payment status to `paid`. Calling this on an order that is already paid is a no-op. Orders
    /// that have not been delivered are never flagged, and are reported as [`StoreError::OrderNotFound`].
    async fn mark_order_paid(&self, order_id: &OrderId) -> Result<Order, StoreError>;
}
