use thiserror::Error;

use crate::db_types::{Address, LineItem, NewAddress, NewUser, User};

#[derive(Debug, Clone, Error)]
pub enum AccountError {
    #[error("Account not found for user {0}")]
    UserNotFound(String),
    #[error("Address {0} could not be found")]
    AddressNotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AccountError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Storage contract for customer records, delivery addresses and the active cart.
///
/// Ownership is enforced here rather than above: every address mutation carries the caller's user id and only touches
/// rows belonging to that user, so a handler cannot accidentally reach across accounts.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, AccountError>;

    /// Insert or update the mirrored identity-provider record for this user.
    async fn upsert_user(&self, user: NewUser) -> Result<User, AccountError>;

    async fn delete_user(&self, user_id: &str) -> Result<(), AccountError>;

    async fn fetch_addresses(&self, user_id: &str) -> Result<Vec<Address>, AccountError>;

    async fn fetch_address(&self, id: i64) -> Result<Option<Address>, AccountError>;

    /// Add an address. If `is_default` is set, every other address for the user is un-defaulted in the same
    /// transaction, preserving the at-most-one-default invariant.
    async fn insert_address(&self, user_id: &str, address: NewAddress) -> Result<Address, AccountError>;

    /// Replace an address owned by `user_id`. `AddressNotFound` if it does not exist or belongs to someone else.
    async fn update_address(&self, id: i64, user_id: &str, address: NewAddress) -> Result<Address, AccountError>;

    /// Delete an address owned by `user_id`. `AddressNotFound` if it does not exist or belongs to someone else.
    async fn delete_address(&self, id: i64, user_id: &str) -> Result<(), AccountError>;

    async fn fetch_cart(&self, user_id: &str) -> Result<Vec<LineItem>, AccountError>;

    /// Replace the user's cart wholesale with the given lines.
    async fn replace_cart(&self, user_id: &str, items: &[LineItem]) -> Result<(), AccountError>;

    async fn clear_cart(&self, user_id: &str) -> Result<(), AccountError>;
}
