use crate::{
    db_types::{DeliveryProof, DeliveryStatusUpdate, NewDeliveryProof, NewDeliveryUpdate, Order, OrderId, UserId},
    traits::StoreError,
};

/// The delivery side of an order: partner assignment, the append-only delivery timeline and delivery proofs.
#[allow(async_fn_in_trait)]
pub trait DeliveryManagement {
    /// Appends an entry to the order's delivery timeline. Entries are never modified or removed.
    async fn append_delivery_update(&self, update: NewDeliveryUpdate) -> Result<DeliveryStatusUpdate, StoreError>;

    /// Sets the delivery partner on the order, provided it is `confirmed` or `dispatched`, and appends an `assigned`
    /// timeline entry, atomically. Returns `None` if the order was not in an assignable state at write time.
    async fn assign_delivery_partner(
        &self,
        order_id: &OrderId,
        partner: &UserId,
        assigned_by: &UserId,
    ) -> Result<Option<(Order, DeliveryStatusUpdate)>, StoreError>;

    /// Atomically moves the order from `dispatched` to `delivered` and appends the `delivered` timeline entry.
    ///
    /// Returns `None` (and writes nothing) if the order was not `dispatched` at write time.
    async fn complete_delivery(
        &self,
        update: NewDeliveryUpdate,
    ) -> Result<Option<(Order, DeliveryStatusUpdate)>, StoreError>;

    /// The full delivery timeline for the order, ordered by creation time and then by insertion sequence.
    async fn fetch_delivery_timeline(&self, order_id: &OrderId) -> Result<Vec<DeliveryStatusUpdate>, StoreError>;

    async fn fetch_latest_delivery_update(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<DeliveryStatusUpdate>, StoreError>;

    /// Stores the proof of delivery. Fails with [`StoreError::UniqueViolation`] if the order already has one.
    async fn insert_delivery_proof(&self, proof: NewDeliveryProof) -> Result<DeliveryProof, StoreError>;

    async fn fetch_delivery_proof(&self, order_id: &OrderId) -> Result<Option<DeliveryProof>, StoreError>;
}
