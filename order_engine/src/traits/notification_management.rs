use crate::{
    db_types::{NewNotification, Notification, OrderId, UserId},
    traits::StoreError,
};

/// The per-recipient notification inbox.
#[allow(async_fn_in_trait)]
pub trait NotificationManagement {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, StoreError>;

    async fn fetch_notification(&self, id: &str) -> Result<Option<Notification>, StoreError>;

    /// Unread notifications for the user, most recent first.
    async fn fetch_unread_notifications(&self, user_id: &UserId) -> Result<Vec<Notification>, StoreError>;

    async fn fetch_notifications_for_order(&self, order_id: &OrderId) -> Result<Vec<Notification>, StoreError>;

    /// Marks the notification as read, if it belongs to `user_id`. Returns `false` if no such notification exists.
    async fn mark_notification_read(&self, id: &str, user_id: &UserId) -> Result<bool, StoreError>;
}
