use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{DeliveryProof, DeliveryStatusUpdate, NewDeliveryProof, NewDeliveryUpdate, Order, OrderId, UserId};

pub async fn insert_delivery_update(
    update: NewDeliveryUpdate,
    conn: &mut SqliteConnection,
) -> Result<DeliveryStatusUpdate, sqlx::Error> {
    let row: DeliveryStatusUpdate = sqlx::query_as(
        r#"
        INSERT INTO delivery_status_updates (order_id, status, latitude, longitude, note, created_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *;
        "#,
    )
    .bind(update.order_id.as_str())
    .bind(update.status.to_string())
    .bind(update.latitude)
    .bind(update.longitude)
    .bind(update.note)
    .bind(update.created_by.as_str())
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🚚️ Delivery update #{} ({}) recorded for order {}", row.id, row.status, row.order_id);
    Ok(row)
}

/// Sets the delivery partner if the order is confirmed or dispatched. Not atomic on its own.
pub async fn set_delivery_partner(
    order_id: &OrderId,
    partner: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET delivery_partner_id = $1, updated_at = $2
        WHERE id = $3 AND status IN ('confirmed', 'dispatched')
        RETURNING *;
        "#,
    )
    .bind(partner.as_str())
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// The `dispatched → delivered` compare-and-swap. Not atomic on its own.
pub async fn mark_delivered(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET status = 'delivered', updated_at = $1 WHERE id = $2 AND status = 'dispatched' RETURNING *",
    )
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_timeline(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<DeliveryStatusUpdate>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM delivery_status_updates WHERE order_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn fetch_latest_update(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryStatusUpdate>, sqlx::Error> {
    let row = sqlx::query_as(
        "SELECT * FROM delivery_status_updates WHERE order_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn insert_proof(proof: NewDeliveryProof, conn: &mut SqliteConnection) -> Result<DeliveryProof, sqlx::Error> {
    let row: DeliveryProof = sqlx::query_as(
        r#"
        INSERT INTO delivery_proofs (order_id, receiver_name, photo_ref, signature_ref, notes, created_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *;
        "#,
    )
    .bind(proof.order_id.as_str())
    .bind(proof.receiver_name)
    .bind(proof.photo_ref)
    .bind(proof.signature_ref)
    .bind(proof.notes)
    .bind(proof.created_by.as_str())
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🚚️ Proof of delivery stored for order {}", row.order_id);
    Ok(row)
}

pub async fn fetch_proof(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<DeliveryProof>, sqlx::Error> {
    let row = sqlx::query_as("SELECT * FROM delivery_proofs WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(row)
}
