use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{LedgerEntry, NewLedgerEntry, OrderId},
    traits::StoreError,
};

/// Writes the ledger entry. The unique index on `order_id` turns a duplicate into [`StoreError::UniqueViolation`].
pub async fn insert_entry(entry: NewLedgerEntry, conn: &mut SqliteConnection) -> Result<LedgerEntry, StoreError> {
    let order_id = entry.order_id.clone();
    let row: LedgerEntry = sqlx::query_as(
        r#"
        INSERT INTO transactions (order_id, amount, fee, payment_method, status, recorded_by, created_at)
        VALUES ($1, $2, $3, $4, 'completed', $5, $6)
        RETURNING *;
        "#,
    )
    .bind(entry.order_id.as_str())
    .bind(entry.amount.value())
    .bind(entry.fee.value())
    .bind(entry.payment_method.to_string())
    .bind(entry.recorded_by.as_str())
    .bind(Utc::now())
    .fetch_one(conn)
    .await
    .map_err(|e| match StoreError::from(e) {
        StoreError::UniqueViolation(_) => {
            StoreError::UniqueViolation(format!("A ledger entry already exists for order {order_id}"))
        },
        other => other,
    })?;
    debug!("💰️ Ledger entry #{} for {} (fee {}) recorded against order {}", row.id, row.amount, row.fee, row.order_id);
    Ok(row)
}

pub async fn fetch_entry(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<LedgerEntry>, sqlx::Error> {
    let row = sqlx::query_as("SELECT * FROM transactions WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(row)
}
