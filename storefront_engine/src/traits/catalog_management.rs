use thiserror::Error;

use crate::{
    db_types::{NewProduct, Product, ProductUpdate},
    order_objects::ProductQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Product {0} could not be found")]
    ProductNotFound(i64),
    #[error(
        "Cannot delete \"{0}\" because it is part of an active order. Wait until the order is delivered or cancelled."
    )]
    ProductInOpenOrder(String),
    #[error("Invalid product data: {0}")]
    InvalidProduct(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Storage contract for the product catalog, including the stock ledger.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Fetch a single product by id.
    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError>;

    /// Fetch one page of the public listing plus the total number of matches for the filter.
    async fn search_products(&self, filter: ProductQueryFilter) -> Result<(Vec<Product>, i64), CatalogError>;

    /// Fetch every product, newest first. Seller/admin listing.
    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    /// Apply a partial edit. Returns the updated product, or `ProductNotFound`.
    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogError>;

    /// Delete a product, unless it is referenced by any order that is not in a terminal state, in which case
    /// `ProductInOpenOrder` is returned and nothing changes.
    async fn delete_product(&self, id: i64) -> Result<Product, CatalogError>;

    /// Atomically add `delta` (which may be negative) to a product's stock in a single statement, returning the new
    /// stock level. This is the only stock mutation the order flow performs; the check-then-adjust sequence across
    /// several products is not transactional.
    async fn adjust_stock(&self, product_id: i64, delta: i64) -> Result<i64, CatalogError>;
}
