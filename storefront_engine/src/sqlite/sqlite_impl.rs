//! `SqliteDatabase` is the concrete storage backend for the storefront.
//!
//! It implements every trait in the [`crate::traits`] module on top of a shared `SqlitePool`. Multi-row writes that
//! must land together (an order and its items, a receipt and its lines, a cart replacement) run inside a single
//! transaction. Stock adjustments do not: each one is its own atomic statement, mirroring the
//! per-document semantics described in the crate docs.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{addresses, customers, orders, products, receipts};
use crate::{
    db_types::{
        Address,
        LineItem,
        NewAddress,
        NewOrder,
        NewProduct,
        NewReceipt,
        NewUser,
        Order,
        OrderItem,
        OrderStatus,
        Product,
        ProductUpdate,
        Receipt,
        ReceiptItem,
        User,
    },
    order_objects::{OrderQueryFilter, ProductQueryFilter},
    traits::{
        AccountError,
        AccountManagement,
        CatalogError,
        CatalogManagement,
        OrderFlowError,
        PaymentStateUpdate,
        ReceiptError,
        ReceiptManagement,
        StorefrontDatabase,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database instance, connecting to the given URL with a pool of `max_connections` connections.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = super::db::new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(id, &mut conn).await?)
    }

    async fn search_products(&self, filter: ProductQueryFilter) -> Result<(Vec<Product>, i64), CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::search_products(filter, &mut conn).await?)
    }

    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_all_products(&mut conn).await?)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        debug!("🗃️ Product \"{}\" saved with id {}", product.name, product.id);
        Ok(product)
    }

    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        products::update_product(id, update, &mut conn).await?.ok_or(CatalogError::ProductNotFound(id))
    }

    async fn delete_product(&self, id: i64) -> Result<Product, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let product = products::fetch_product(id, &mut tx).await?.ok_or(CatalogError::ProductNotFound(id))?;
        if let Some(order_id) = products::open_order_reference(id, &mut tx).await? {
            debug!("🗃️ Refusing to delete product {id}; referenced by open order #{order_id}");
            return Err(CatalogError::ProductInOpenOrder(product.name));
        }
        let deleted = products::delete_product(id, &mut tx).await?.ok_or(CatalogError::ProductNotFound(id))?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn adjust_stock(&self, product_id: i64, delta: i64) -> Result<i64, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let stock = products::adjust_stock(product_id, delta, &mut conn)
            .await?
            .ok_or(CatalogError::ProductNotFound(product_id))?;
        trace!("🗃️ Stock for product {product_id} adjusted by {delta} to {stock}");
        Ok(stock)
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::fetch_user(user_id, &mut conn).await?)
    }

    async fn upsert_user(&self, user: NewUser) -> Result<User, AccountError> {
        let mut conn = self.pool.acquire().await?;
        let user = customers::upsert_user(user, &mut conn).await?;
        debug!("🗃️ User record for {} refreshed", user.id);
        Ok(user)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AccountError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::delete_user(user_id, &mut conn).await?)
    }

    async fn fetch_addresses(&self, user_id: &str) -> Result<Vec<Address>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        Ok(addresses::fetch_addresses(user_id, &mut conn).await?)
    }

    async fn fetch_address(&self, id: i64) -> Result<Option<Address>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        Ok(addresses::fetch_address(id, &mut conn).await?)
    }

    async fn insert_address(&self, user_id: &str, address: NewAddress) -> Result<Address, AccountError> {
        let mut tx = self.pool.begin().await?;
        if address.is_default {
            addresses::unset_defaults(user_id, None, &mut tx).await?;
        }
        let address = addresses::insert_address(user_id, address, &mut tx).await?;
        tx.commit().await?;
        Ok(address)
    }

    async fn update_address(&self, id: i64, user_id: &str, address: NewAddress) -> Result<Address, AccountError> {
        let mut tx = self.pool.begin().await?;
        if address.is_default {
            addresses::unset_defaults(user_id, Some(id), &mut tx).await?;
        }
        let updated = addresses::update_address(id, user_id, address, &mut tx)
            .await?
            .ok_or(AccountError::AddressNotFound(id))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_address(&self, id: i64, user_id: &str) -> Result<(), AccountError> {
        let mut conn = self.pool.acquire().await?;
        if addresses::delete_address(id, user_id, &mut conn).await? {
            Ok(())
        } else {
            Err(AccountError::AddressNotFound(id))
        }
    }

    async fn fetch_cart(&self, user_id: &str) -> Result<Vec<LineItem>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::fetch_cart(user_id, &mut conn).await?)
    }

    async fn replace_cart(&self, user_id: &str, items: &[LineItem]) -> Result<(), AccountError> {
        let mut tx = self.pool.begin().await?;
        customers::replace_cart(user_id, items, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: &str) -> Result<(), AccountError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::clear_cart(user_id, &mut conn).await?)
    }
}

impl StorefrontDatabase for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} has been saved in the DB", order.id);
        Ok(order)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(filter, &mut conn).await?)
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(id, status, &mut conn).await
    }

    async fn update_payment_state(&self, id: i64, update: PaymentStateUpdate) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_payment_state(id, update, &mut conn).await
    }
}

impl ReceiptManagement for SqliteDatabase {
    async fn fetch_receipt(&self, id: i64) -> Result<Option<Receipt>, ReceiptError> {
        let mut conn = self.pool.acquire().await?;
        Ok(receipts::fetch_receipt(id, &mut conn).await?)
    }

    async fn fetch_receipt_for_order(&self, order_id: i64) -> Result<Option<Receipt>, ReceiptError> {
        let mut conn = self.pool.acquire().await?;
        Ok(receipts::fetch_receipt_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_receipt_items(&self, receipt_id: i64) -> Result<Vec<ReceiptItem>, ReceiptError> {
        let mut conn = self.pool.acquire().await?;
        Ok(receipts::fetch_receipt_items(receipt_id, &mut conn).await?)
    }

    async fn fetch_receipts_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<Receipt>, ReceiptError> {
        let mut conn = self.pool.acquire().await?;
        Ok(receipts::fetch_receipts_for_user(user_id, limit, &mut conn).await?)
    }

    async fn insert_receipt(
        &self,
        receipt: NewReceipt,
        generated_at: DateTime<Utc>,
    ) -> Result<Receipt, ReceiptError> {
        let order_id = receipt.order_id;
        let mut tx = self.pool.begin().await.map_err(|e| ReceiptError::DatabaseError(e.to_string()))?;
        match receipts::insert_receipt(receipt, generated_at, &mut tx).await {
            Ok(stored) => {
                tx.commit().await.map_err(|e| ReceiptError::DatabaseError(e.to_string()))?;
                Ok(stored)
            },
            Err(e) if receipts::is_duplicate_receipt(&e) => {
                // Lost the race to create the first receipt; hand back the winner's record.
                drop(tx);
                info!("🗃️ Receipt for order #{order_id} already exists. Returning the stored one.");
                let mut conn = self.pool.acquire().await.map_err(|e| ReceiptError::DatabaseError(e.to_string()))?;
                receipts::fetch_receipt_for_order(order_id, &mut conn)
                    .await?
                    .ok_or(ReceiptError::OrderNotFound(order_id))
            },
            Err(e) => Err(e),
        }
    }
}

impl SqliteDatabase {
    /// Convenience constructor reading the database URL from the environment.
    pub async fn new_from_env(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = super::db::db_url();
        Self::new_with_url(&url, max_connections).await
    }
}
