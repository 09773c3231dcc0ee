use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewNotification, Notification, OrderId, UserId};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<Notification, sqlx::Error> {
    let row: Notification = sqlx::query_as(
        r#"
        INSERT INTO notifications (id, user_id, title, message, category, related_type, related_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *;
        "#,
    )
    .bind(notification.id)
    .bind(notification.user_id.as_str())
    .bind(notification.title)
    .bind(notification.message)
    .bind(notification.category)
    .bind(notification.related_type)
    .bind(notification.related_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("🔔️ Notification {} stored for {}", row.id, row.user_id);
    Ok(row)
}

pub async fn fetch_notification(id: &str, conn: &mut SqliteConnection) -> Result<Option<Notification>, sqlx::Error> {
    let row = sqlx::query_as("SELECT * FROM notifications WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row)
}

pub async fn fetch_unread(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query_as(
        "SELECT * FROM notifications WHERE user_id = $1 AND is_read = 0 ORDER BY created_at DESC, rowid DESC",
    )
    .bind(user_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn fetch_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM notifications WHERE related_id = $1 ORDER BY created_at ASC, rowid ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn mark_read(id: &str, user_id: &UserId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
