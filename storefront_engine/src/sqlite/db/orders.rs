use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderStatus},
    order_objects::OrderQueryFilter,
    traits::{OrderFlowError, PaymentStateUpdate},
};

/// Inserts a new order and its line items using the given connection. This is not atomic on its own. Embed the call
/// inside a transaction and pass `&mut *tx` as the connection argument to get atomicity; the storage impl does so.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let stored: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                user_id,
                address_id,
                subtotal,
                shipping,
                tax,
                total,
                status,
                payment_method,
                payment_status,
                payment_ref
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.address_id)
    .bind(order.subtotal)
    .bind(order.shipping)
    .bind(order.tax)
    .bind(order.total)
    .bind(order.status)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(order.payment_ref)
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query("INSERT INTO order_items (order_id, product_id, quantity) VALUES ($1, $2, $3)")
            .bind(stored.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?;
    }
    debug!("🧾️ Order #{} inserted with {} line items", stored.id, order.items.len());
    Ok(stored)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in descending order.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders");
    if !query.is_empty() {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(status) = query.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status);
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("🧾️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🧾️ Result of search_orders: {} rows", orders.len());
    Ok(orders)
}

pub async fn update_order_status(
    id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(OrderFlowError::OrderNotFound(id))
}

pub async fn update_payment_state(
    id: i64,
    update: PaymentStateUpdate,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    if update.is_empty() {
        debug!("🧾️ No payment fields to update for order {id}. Returning the order as-is.");
        return fetch_order(id, conn).await?.ok_or(OrderFlowError::OrderNotFound(id));
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(payment_status) = update.payment_status {
        set_clause.push("payment_status = ");
        set_clause.push_bind_unseparated(payment_status);
    }
    if let Some(payment_method) = update.payment_method {
        set_clause.push("payment_method = ");
        set_clause.push_bind_unseparated(payment_method);
    }
    if let Some(payment_ref) = update.payment_ref {
        set_clause.push("payment_ref = ");
        set_clause.push_bind_unseparated(payment_ref);
    }
    if let Some(order_status) = update.order_status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(order_status);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🧾️ Executing query: {}", builder.sql());
    let res = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    res.ok_or(OrderFlowError::OrderNotFound(id))
}
