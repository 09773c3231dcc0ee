//! `SqliteDatabase` is a concrete implementation of an order store backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Multi-statement operations (order placement, compare-and-swap transitions that carry a timeline entry,
//! delivery completion) each run inside a single SQLite transaction.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};

use super::db::{db_url, delivery, ledger, new_pool, notifications, orders, MIGRATOR};
use crate::{
    db_types::{
        DeliveryProof,
        DeliveryStatus,
        DeliveryStatusUpdate,
        LedgerEntry,
        NewDeliveryProof,
        NewDeliveryUpdate,
        NewLedgerEntry,
        NewNotification,
        NewOrder,
        Notification,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        UserId,
    },
    traits::{
        DeliveryManagement,
        LedgerManagement,
        NotificationManagement,
        OrderDatabase,
        OrderManagement,
        OrderQueryFilter,
        StatusUpdate,
        StoreError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl OrderDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB", result.0.id);
        Ok(result)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::search_orders(query, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_recent_orders(limit, &mut conn).await?;
        Ok(result)
    }

    async fn supports_reference_numbers(&self) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let supported = orders::has_reference_number_column(&mut conn).await?;
        trace!("🗃️ Reference number column present: {supported}");
        Ok(supported)
    }

    async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_reference(reference, &mut conn).await?;
        Ok(order)
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatusType,
        update: StatusUpdate,
    ) -> Result<Option<Order>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::update_order_status(order_id, expected, update, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

impl DeliveryManagement for SqliteDatabase {
    async fn append_delivery_update(&self, update: NewDeliveryUpdate) -> Result<DeliveryStatusUpdate, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let row = delivery::insert_delivery_update(update, &mut conn).await?;
        Ok(row)
    }

    async fn assign_delivery_partner(
        &self,
        order_id: &OrderId,
        partner: &UserId,
        assigned_by: &UserId,
    ) -> Result<Option<(Order, DeliveryStatusUpdate)>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = delivery::set_delivery_partner(order_id, partner, &mut tx).await? else {
            debug!("🗃️ Order {order_id} is not in an assignable state. Partner {partner} was not assigned.");
            return Ok(None);
        };
        let event = NewDeliveryUpdate::new(order_id.clone(), DeliveryStatus::Assigned, assigned_by.clone())
            .with_note(format!("Assigned to {partner}"));
        let row = delivery::insert_delivery_update(event, &mut tx).await?;
        tx.commit().await?;
        Ok(Some((order, row)))
    }

    async fn complete_delivery(
        &self,
        update: NewDeliveryUpdate,
    ) -> Result<Option<(Order, DeliveryStatusUpdate)>, StoreError> {
        let mut tx = self.pool.begin().await?;
        // The status write comes first, so the transaction holds the write lock before anything else is read.
        let Some(order) = delivery::mark_delivered(&update.order_id, &mut tx).await? else {
            debug!("🗃️ Order {} is no longer dispatched. Delivery not recorded.", update.order_id);
            return Ok(None);
        };
        let row = delivery::insert_delivery_update(update, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} delivered", order.id);
        Ok(Some((order, row)))
    }

    async fn fetch_delivery_timeline(&self, order_id: &OrderId) -> Result<Vec<DeliveryStatusUpdate>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = delivery::fetch_timeline(order_id, &mut conn).await?;
        Ok(rows)
    }

    async fn fetch_latest_delivery_update(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<DeliveryStatusUpdate>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let row = delivery::fetch_latest_update(order_id, &mut conn).await?;
        Ok(row)
    }

    async fn insert_delivery_proof(&self, proof: NewDeliveryProof) -> Result<DeliveryProof, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let row = delivery::insert_proof(proof, &mut conn).await?;
        Ok(row)
    }

    async fn fetch_delivery_proof(&self, order_id: &OrderId) -> Result<Option<DeliveryProof>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let row = delivery::fetch_proof(order_id, &mut conn).await?;
        Ok(row)
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_ledger_entry(&self, order_id: &OrderId) -> Result<Option<LedgerEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let entry = ledger::fetch_entry(order_id, &mut conn).await?;
        Ok(entry)
    }

    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        let mut conn = self.pool.acquire().await?;
        ledger::insert_entry(entry, &mut conn).await
    }

    async fn mark_order_paid(&self, order_id: &OrderId) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_order_paid(order_id, &mut conn).await?;
        order.ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))
    }
}

impl NotificationManagement for SqliteDatabase {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let row = notifications::insert_notification(notification, &mut conn).await?;
        Ok(row)
    }

    async fn fetch_notification(&self, id: &str) -> Result<Option<Notification>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let row = notifications::fetch_notification(id, &mut conn).await?;
        Ok(row)
    }

    async fn fetch_unread_notifications(&self, user_id: &UserId) -> Result<Vec<Notification>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = notifications::fetch_unread(user_id, &mut conn).await?;
        Ok(rows)
    }

    async fn fetch_notifications_for_order(&self, order_id: &OrderId) -> Result<Vec<Notification>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = notifications::fetch_for_order(order_id, &mut conn).await?;
        Ok(rows)
    }

    async fn mark_notification_read(&self, id: &str, user_id: &UserId) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let updated = notifications::mark_read(id, user_id, &mut conn).await?;
        Ok(updated)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Creates an empty database at `url` unless one already exists. Returns `true` if a database was created.
    pub async fn create_if_missing(url: &str) -> Result<bool, StoreError> {
        if Sqlite::database_exists(url).await? {
            return Ok(false);
        }
        Sqlite::create_database(url).await?;
        info!("🗃️ Created new database at {url}");
        Ok(true)
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await.map_err(|e| StoreError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}
