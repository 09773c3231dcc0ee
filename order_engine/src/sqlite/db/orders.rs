use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use super::delivery;
use crate::{
    db_types::{DeliveryStatus, NewDeliveryUpdate, NewOrder, Order, OrderId, OrderItem, OrderStatusType},
    traits::{OrderQueryFilter, StatusUpdate, StoreError},
};

/// Inserts a new order and its line items using the given connection. This is not atomic. Embed this call inside a
/// transaction and pass `&mut tx` as the connection argument.
///
/// The total is computed from the line items here, and is never written again.
pub async fn insert_order(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, Vec<OrderItem>), StoreError> {
    let total = order
        .total_amount()
        .ok_or_else(|| StoreError::QueryError(format!("The total for order {} does not fit in the ledger.", order.id)))?;
    let mut builder = QueryBuilder::new(
        "INSERT INTO orders (id, retailer_id, wholesaler_id, total_amount, status, payment_method, payment_status, \
         notes, created_at, updated_at",
    );
    // Only reference the optional column when there is something to put in it
    if order.reference_number.is_some() {
        builder.push(", reference_number");
    }
    builder.push(") VALUES (");
    let mut values = builder.separated(", ");
    values.push_bind(order.id.as_str().to_string());
    values.push_bind(order.retailer_id.as_str().to_string());
    values.push_bind(order.wholesaler_id.as_str().to_string());
    values.push_bind(total.value());
    values.push_bind(OrderStatusType::Placed.to_string());
    values.push_bind(order.payment_method.to_string());
    values.push_bind("pending");
    values.push_bind(order.notes.clone());
    values.push_bind(order.created_at);
    values.push_bind(order.created_at);
    if let Some(reference) = order.reference_number.clone() {
        values.push_bind(reference);
    }
    builder.push(") RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let inserted: Order = builder.build_query_as().fetch_one(&mut *conn).await?;

    let mut items = Vec::with_capacity(order.items.len());
    for item in order.items {
        let row: OrderItem = sqlx::query_as(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
            "#,
        )
        .bind(inserted.id.as_str())
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price.value())
        .fetch_one(&mut *conn)
        .await?;
        items.push(row);
    }
    debug!("📝️ Order [{}] inserted with {} line items for {}", inserted.id, items.len(), inserted.total_amount);
    Ok((inserted, items))
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Returns the `limit` most recently created orders. Orders created in the same instant are ordered by insertion.
pub async fn fetch_recent_orders(limit: u32, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, rowid DESC LIMIT $1")
        .bind(i64::from(limit))
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Probes the schema for the optional `reference_number` column on the orders table.
pub async fn has_reference_number_column(conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info('orders') WHERE name = 'reference_number'")
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}

pub async fn fetch_order_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE reference_number = $1 ORDER BY created_at DESC LIMIT 1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in descending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(retailer) = query.retailer_id {
        where_clause.push("retailer_id = ");
        where_clause.push_bind_unseparated(retailer.0);
    }
    if let Some(wholesaler) = query.wholesaler_id {
        where_clause.push("wholesaler_id = ");
        where_clause.push_bind_unseparated(wholesaler.0);
    }
    if let Some(partner) = query.delivery_partner_id {
        where_clause.push("delivery_partner_id = ");
        where_clause.push_bind_unseparated(partner.0);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        let status_clause = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC, rowid DESC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(limit));
    }

    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Compare-and-swap on the order status. The notes and delivery partner in `update` are written by the same
/// statement, and an `assigned` timeline entry is appended when a partner is supplied.
///
/// Not atomic on its own. Run it inside a transaction.
pub async fn update_order_status(
    order_id: &OrderId,
    expected: OrderStatusType,
    update: StatusUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let now = Utc::now();
    let partner = update.delivery_partner_id.clone();
    let result: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders SET
            status = $1,
            notes = COALESCE($2, notes),
            delivery_partner_id = COALESCE($3, delivery_partner_id),
            updated_at = $4
        WHERE id = $5 AND status = $6
        RETURNING *;
        "#,
    )
    .bind(update.status.to_string())
    .bind(update.notes)
    .bind(partner.as_ref().map(|p| p.as_str().to_string()))
    .bind(now)
    .bind(order_id.as_str())
    .bind(expected.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    let Some(order) = result else {
        trace!("📝️ Status of order {order_id} was not {expected}. No update made.");
        return Ok(None);
    };
    if let Some(partner) = partner {
        let event = NewDeliveryUpdate::new(order_id.clone(), DeliveryStatus::Assigned, update.updated_by)
            .with_note(format!("Assigned to {partner}"));
        delivery::insert_delivery_update(event, &mut *conn).await?;
    }
    debug!("📝️ Order {order_id} moved from {expected} to {}", order.status);
    Ok(Some(order))
}

/// Sets the payment status to paid. Returns `None` if the order does not exist or has not been delivered.
pub async fn mark_order_paid(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET payment_status = 'paid', updated_at = $1 WHERE id = $2 AND status = 'delivered' RETURNING *",
    )
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
