use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewReceipt, Receipt, ReceiptItem};

#[derive(Debug, Clone, Error)]
pub enum ReceiptError {
    #[error("Receipt {0} could not be found")]
    ReceiptNotFound(i64),
    #[error("Order {0} could not be found")]
    OrderNotFound(i64),
    #[error("The receipt belongs to another customer")]
    OwnershipViolation,
    #[error("Account not found for user {0}")]
    UserNotFound(String),
    #[error("Address {0} could not be found")]
    AddressNotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for ReceiptError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Storage contract for immutable receipt snapshots.
#[allow(async_fn_in_trait)]
pub trait ReceiptManagement {
    async fn fetch_receipt(&self, id: i64) -> Result<Option<Receipt>, ReceiptError>;

    async fn fetch_receipt_for_order(&self, order_id: i64) -> Result<Option<Receipt>, ReceiptError>;

    async fn fetch_receipt_items(&self, receipt_id: i64) -> Result<Vec<ReceiptItem>, ReceiptError>;

    /// The user's receipts, newest first, capped at `limit`.
    async fn fetch_receipts_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<Receipt>, ReceiptError>;

    /// Persist a receipt snapshot and its line items in one transaction. The receipt number is assigned inside the
    /// transaction from `generated_at`'s calendar day and a per-day sequence. If a receipt already exists for the
    /// order (the UNIQUE constraint), the existing record is returned instead of a duplicate.
    async fn insert_receipt(
        &self,
        receipt: NewReceipt,
        generated_at: DateTime<Utc>,
    ) -> Result<Receipt, ReceiptError>;
}
