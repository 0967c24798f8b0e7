use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{LineItem, NewUser, User};

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

/// Inserts or refreshes the mirrored identity-provider record.
pub async fn upsert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let user = sqlx::query_as(
        r#"
            INSERT INTO users (id, name, email, avatar_url) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = excluded.name,
                email = excluded.email,
                avatar_url = excluded.avatar_url,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(user.id)
    .bind(user.name)
    .bind(user.email)
    .bind(user.avatar_url)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

pub async fn delete_user(user_id: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let res = sqlx::query("DELETE FROM users WHERE id = $1").bind(user_id).execute(conn).await?;
    debug!("👤️ Deleted {} user record(s) for {user_id}", res.rows_affected());
    Ok(())
}

pub async fn fetch_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, sqlx::Error> {
    let items =
        sqlx::query_as("SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY product_id")
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    Ok(items)
}

/// Replaces the cart wholesale. Call inside a transaction for atomicity; the storage impl does so.
pub async fn replace_cart(user_id: &str, items: &[LineItem], conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(&mut *conn).await?;
    for item in items {
        sqlx::query("INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn clear_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let res = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(conn).await?;
    debug!("👤️ Cleared {} cart line(s) for {user_id}", res.rows_affected());
    Ok(())
}
