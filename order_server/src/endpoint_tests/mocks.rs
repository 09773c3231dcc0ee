use mockall::mock;
use order_engine::{
    db_types::{NewNotification, NewOrder, Notification, Order, OrderId, OrderItem, OrderStatusType, UserId},
    traits::{NotificationManagement, OrderManagement, OrderQueryFilter, StatusUpdate, StoreError},
};

mock! {
    pub NotificationStore {}
    impl OrderManagement for NotificationStore {
        async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), StoreError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;
        async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, StoreError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;
        async fn fetch_recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError>;
        async fn supports_reference_numbers(&self) -> Result<bool, StoreError>;
        async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError>;
        async fn update_order_status(&self, order_id: &OrderId, expected: OrderStatusType, update: StatusUpdate) -> Result<Option<Order>, StoreError>;
    }
    impl NotificationManagement for NotificationStore {
        async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, StoreError>;
        async fn fetch_notification(&self, id: &str) -> Result<Option<Notification>, StoreError>;
        async fn fetch_unread_notifications(&self, user_id: &UserId) -> Result<Vec<Notification>, StoreError>;
        async fn fetch_notifications_for_order(&self, order_id: &OrderId) -> Result<Vec<Notification>, StoreError>;
        async fn mark_notification_read(&self, id: &str, user_id: &UserId) -> Result<bool, StoreError>;
    }
}
