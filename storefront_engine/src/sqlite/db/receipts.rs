use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{Row, SqliteConnection};

use crate::{
    db_types::{NewReceipt, Receipt, ReceiptItem},
    traits::ReceiptError,
};

pub async fn fetch_receipt(id: i64, conn: &mut SqliteConnection) -> Result<Option<Receipt>, sqlx::Error> {
    let receipt = sqlx::query_as("SELECT * FROM receipts WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(receipt)
}

pub async fn fetch_receipt_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Receipt>, sqlx::Error> {
    let receipt =
        sqlx::query_as("SELECT * FROM receipts WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(receipt)
}

pub async fn fetch_receipt_items(
    receipt_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ReceiptItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM receipt_items WHERE receipt_id = $1 ORDER BY id")
        .bind(receipt_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_receipts_for_user(
    user_id: &str,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<Receipt>, sqlx::Error> {
    let receipts = sqlx::query_as("SELECT * FROM receipts WHERE user_id = $1 ORDER BY generated_at DESC LIMIT $2")
        .bind(user_id)
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(receipts)
}

/// The next receipt number for the given generation instant: `RCP-YYYYMMDD-NNNN`, where NNNN counts receipts
/// generated on that calendar day. Must run inside the same transaction as the insert so the sequence cannot skip.
async fn next_receipt_number(
    generated_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<String, sqlx::Error> {
    let count: i64 = sqlx::query("SELECT COUNT(*) as total FROM receipts WHERE date(generated_at) = date($1)")
        .bind(generated_at)
        .fetch_one(conn)
        .await?
        .get("total");
    Ok(format!("RCP-{}-{:04}", generated_at.format("%Y%m%d"), count + 1))
}

/// Inserts a receipt snapshot and its line items. Not atomic on its own; the storage impl wraps it in a transaction.
pub async fn insert_receipt(
    receipt: NewReceipt,
    generated_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Receipt, ReceiptError> {
    let receipt_number = next_receipt_number(generated_at, &mut *conn).await?;
    let stored: Receipt = sqlx::query_as(
        r#"
            INSERT INTO receipts (
                order_id, user_id, receipt_number,
                customer_name, customer_email,
                bill_to_name, street_address, city, state, postal_code, phone_number,
                payment_method, payment_status, payment_ref,
                subtotal, shipping, tax, total, generated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *;
        "#,
    )
    .bind(receipt.order_id)
    .bind(receipt.user_id)
    .bind(receipt_number)
    .bind(receipt.customer_name)
    .bind(receipt.customer_email)
    .bind(receipt.bill_to_name)
    .bind(receipt.street_address)
    .bind(receipt.city)
    .bind(receipt.state)
    .bind(receipt.postal_code)
    .bind(receipt.phone_number)
    .bind(receipt.payment_method)
    .bind(receipt.payment_status)
    .bind(receipt.payment_ref)
    .bind(receipt.subtotal)
    .bind(receipt.shipping)
    .bind(receipt.tax)
    .bind(receipt.total)
    .bind(generated_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| ReceiptError::DatabaseError(e.to_string()))?;
    for item in &receipt.items {
        sqlx::query(
            r#"
                INSERT INTO receipt_items (receipt_id, product_id, product_name, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(stored.id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.line_total)
        .execute(&mut *conn)
        .await
        .map_err(|e| ReceiptError::DatabaseError(e.to_string()))?;
    }
    debug!("🧾️ Receipt {} stored for order #{}", stored.receipt_number, stored.order_id);
    Ok(stored)
}

/// Detects the UNIQUE(order_id) violation raised when two callers race to create the first receipt for an order.
pub fn is_duplicate_receipt(e: &ReceiptError) -> bool {
    matches!(e, ReceiptError::DatabaseError(msg) if msg.contains("UNIQUE constraint failed: receipts.order_id"))
}
