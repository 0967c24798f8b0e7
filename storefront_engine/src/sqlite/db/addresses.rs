use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Address, NewAddress};

pub async fn fetch_address(id: i64, conn: &mut SqliteConnection) -> Result<Option<Address>, sqlx::Error> {
    let address = sqlx::query_as("SELECT * FROM addresses WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(address)
}

pub async fn fetch_addresses(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Address>, sqlx::Error> {
    let addresses =
        sqlx::query_as("SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC")
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    Ok(addresses)
}

/// Unsets the default flag on every address of the user, optionally sparing one. Used to hold the
/// at-most-one-default invariant whenever an address is saved with `is_default = true`.
pub async fn unset_defaults(
    user_id: &str,
    except: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let res = match except {
        Some(id) => {
            sqlx::query("UPDATE addresses SET is_default = 0, updated_at = CURRENT_TIMESTAMP WHERE user_id = $1 AND id != $2")
                .bind(user_id)
                .bind(id)
                .execute(conn)
                .await?
        },
        None => {
            sqlx::query("UPDATE addresses SET is_default = 0, updated_at = CURRENT_TIMESTAMP WHERE user_id = $1")
                .bind(user_id)
                .execute(conn)
                .await?
        },
    };
    trace!("🏠️ Unset default flag on {} address(es) for {user_id}", res.rows_affected());
    Ok(())
}

pub async fn insert_address(
    user_id: &str,
    address: NewAddress,
    conn: &mut SqliteConnection,
) -> Result<Address, sqlx::Error> {
    let address = sqlx::query_as(
        r#"
            INSERT INTO addresses (user_id, full_name, phone_number, street_address, city, state, postal_code, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(address.full_name)
    .bind(address.phone_number)
    .bind(address.street_address)
    .bind(address.city)
    .bind(address.state)
    .bind(address.postal_code)
    .bind(address.is_default)
    .fetch_one(conn)
    .await?;
    Ok(address)
}

/// Replaces an address, but only if it belongs to `user_id`. Returns `None` otherwise.
pub async fn update_address(
    id: i64,
    user_id: &str,
    address: NewAddress,
    conn: &mut SqliteConnection,
) -> Result<Option<Address>, sqlx::Error> {
    let address = sqlx::query_as(
        r#"
            UPDATE addresses
            SET full_name = $1,
                phone_number = $2,
                street_address = $3,
                city = $4,
                state = $5,
                postal_code = $6,
                is_default = $7,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $8 AND user_id = $9
            RETURNING *;
        "#,
    )
    .bind(address.full_name)
    .bind(address.phone_number)
    .bind(address.street_address)
    .bind(address.city)
    .bind(address.state)
    .bind(address.postal_code)
    .bind(address.is_default)
    .bind(id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(address)
}

/// Deletes an address, but only if it belongs to `user_id`. Returns whether a row was removed.
pub async fn delete_address(id: i64, user_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() > 0)
}
