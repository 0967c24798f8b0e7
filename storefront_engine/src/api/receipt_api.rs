use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewReceipt, NewReceiptItem, Receipt},
    order_objects::ReceiptDetails,
    traits::{AccountManagement, CatalogManagement, ReceiptError, ReceiptManagement, StorefrontDatabase},
};

/// `ReceiptApi` produces and serves the immutable financial snapshots of orders.
///
/// A receipt is generated lazily, the first time it is requested for an order, and at most once: a second request
/// returns the stored record untouched. The snapshot reads product names and prices *at generation time*, so a
/// product repriced or deleted after generation has no effect, while one deleted before generation renders as
/// "Unknown Product" with a zero price.
pub struct ReceiptApi<B> {
    db: B,
}

impl<B> ReceiptApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ReceiptApi<B>
where B: ReceiptManagement + StorefrontDatabase
{
    /// Fetch-or-create the receipt for an order, on behalf of the customer who owns it.
    pub async fn receipt_for_order(&self, order_id: i64, user_id: &str) -> Result<ReceiptDetails, ReceiptError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await
            .map_err(|e| ReceiptError::DatabaseError(e.to_string()))?
            .ok_or(ReceiptError::OrderNotFound(order_id))?;
        if order.user_id != user_id {
            debug!("🧾️ {user_id} may not fetch a receipt for order #{order_id}");
            return Err(ReceiptError::OwnershipViolation);
        }
        if let Some(existing) = self.db.fetch_receipt_for_order(order_id).await? {
            trace!("🧾️ Receipt {} already exists for order #{order_id}", existing.receipt_number);
            return self.with_items(existing).await;
        }

        let user = self
            .db
            .fetch_user(&order.user_id)
            .await
            .map_err(|e| ReceiptError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ReceiptError::UserNotFound(order.user_id.clone()))?;
        let address = self
            .db
            .fetch_address(order.address_id)
            .await
            .map_err(|e| ReceiptError::DatabaseError(e.to_string()))?
            .ok_or(ReceiptError::AddressNotFound(order.address_id))?;

        let order_items =
            self.db.fetch_order_items(order_id).await.map_err(|e| ReceiptError::DatabaseError(e.to_string()))?;
        let mut items = Vec::with_capacity(order_items.len());
        for item in &order_items {
            let product = self
                .db
                .fetch_product(item.product_id)
                .await
                .map_err(|e| ReceiptError::DatabaseError(e.to_string()))?;
            // A product removed since the order was delivered renders as a placeholder line.
            let (product_name, unit_price) = match &product {
                Some(p) => (p.name.clone(), p.effective_price()),
                None => ("Unknown Product".to_string(), Default::default()),
            };
            items.push(NewReceiptItem {
                product_id: item.product_id,
                product_name,
                quantity: item.quantity,
                unit_price,
                line_total: unit_price * item.quantity,
            });
        }

        let receipt = NewReceipt {
            order_id,
            user_id: order.user_id.clone(),
            customer_name: user.name,
            customer_email: user.email,
            bill_to_name: address.full_name,
            street_address: address.street_address,
            city: address.city,
            state: address.state,
            postal_code: address.postal_code,
            phone_number: address.phone_number,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            payment_ref: order.payment_ref.clone(),
            subtotal: order.subtotal,
            shipping: order.shipping,
            tax: order.tax,
            total: order.total,
            items,
        };
        let stored = self.db.insert_receipt(receipt, Utc::now()).await?;
        info!("🧾️ Receipt {} generated for order #{order_id}", stored.receipt_number);
        self.with_items(stored).await
    }

    /// Fetch the receipt for an order if one has already been generated; never generates one.
    pub async fn existing_receipt_for_order(
        &self,
        order_id: i64,
        user_id: &str,
    ) -> Result<ReceiptDetails, ReceiptError> {
        let receipt =
            self.db.fetch_receipt_for_order(order_id).await?.ok_or(ReceiptError::OrderNotFound(order_id))?;
        if receipt.user_id != user_id {
            return Err(ReceiptError::OwnershipViolation);
        }
        self.with_items(receipt).await
    }

    /// Fetch a receipt by its own id, on behalf of its owner.
    pub async fn receipt(&self, receipt_id: i64, user_id: &str) -> Result<ReceiptDetails, ReceiptError> {
        let receipt = self.db.fetch_receipt(receipt_id).await?.ok_or(ReceiptError::ReceiptNotFound(receipt_id))?;
        if receipt.user_id != user_id {
            return Err(ReceiptError::OwnershipViolation);
        }
        self.with_items(receipt).await
    }

    /// The caller's receipts, newest first, capped at `limit`.
    pub async fn receipts_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<Receipt>, ReceiptError> {
        self.db.fetch_receipts_for_user(user_id, limit).await
    }

    async fn with_items(&self, receipt: Receipt) -> Result<ReceiptDetails, ReceiptError> {
        let items = self.db.fetch_receipt_items(receipt.id).await?;
        Ok(ReceiptDetails { receipt, items })
    }
}
