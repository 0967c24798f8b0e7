use log::*;

use crate::{
    db_types::{NewProduct, Product, ProductUpdate},
    order_objects::{ProductPage, ProductQueryFilter},
    traits::{CatalogError, CatalogManagement},
};

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

/// `CatalogApi` exposes the product catalog: the public listing plus the seller-side CRUD. Input validation happens
/// here, before anything touches storage.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    /// The public product listing: paginated, optionally filtered by a search term (matched against name,
    /// description and brand) and/or an exact brand.
    pub async fn list_products(&self, mut filter: ProductQueryFilter) -> Result<ProductPage, CatalogError> {
        if filter.page == 0 {
            filter.page = 1;
        }
        if filter.limit == 0 || filter.limit > MAX_PAGE_SIZE {
            filter.limit = DEFAULT_PAGE_SIZE;
        }
        let (page, limit) = (filter.page, filter.limit);
        let (products, total) = self.db.search_products(filter).await?;
        let pages = (total + i64::from(limit) - 1) / i64::from(limit);
        Ok(ProductPage { products, page, limit, total, pages })
    }

    pub async fn product(&self, id: i64) -> Result<Product, CatalogError> {
        self.db.fetch_product(id).await?.ok_or(CatalogError::ProductNotFound(id))
    }

    /// Every product, for the seller dashboard listing.
    pub async fn all_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.db.fetch_all_products().await
    }

    pub async fn add_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        validate_new_product(&product)?;
        let product = self.db.insert_product(product).await?;
        info!("📦️ Product \"{}\" added by {}", product.name, product.user_id);
        Ok(product)
    }

    pub async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogError> {
        validate_product_update(&update)?;
        let product = self.db.update_product(id, update).await?;
        debug!("📦️ Product {} updated", product.id);
        Ok(product)
    }

    /// Deletes a product unless an order that is not delivered or cancelled still references it.
    pub async fn delete_product(&self, id: i64) -> Result<Product, CatalogError> {
        let product = self.db.delete_product(id).await?;
        info!("📦️ Product \"{}\" deleted", product.name);
        Ok(product)
    }
}

/// The stock ledger invariant (stock ≥ 0 at rest) is enforced on seller input; the schema itself stays
/// unconstrained so the order flow's racing adjustments can be observed.
fn validate_new_product(product: &NewProduct) -> Result<(), CatalogError> {
    if product.name.trim().is_empty() || product.description.trim().is_empty() || product.brand.trim().is_empty() {
        return Err(CatalogError::InvalidProduct("Fill in all required product information".to_string()));
    }
    if !product.price.is_positive() {
        return Err(CatalogError::InvalidProduct("Price must be positive".to_string()));
    }
    if let Some(offer) = product.offer_price {
        if !offer.is_positive() {
            return Err(CatalogError::InvalidProduct("Offer price must be positive".to_string()));
        }
    }
    if product.stock < 0 {
        return Err(CatalogError::InvalidProduct("Stock cannot be negative".to_string()));
    }
    if product.images.is_empty() {
        return Err(CatalogError::InvalidProduct("Upload at least one product image".to_string()));
    }
    Ok(())
}

fn validate_product_update(update: &ProductUpdate) -> Result<(), CatalogError> {
    if let Some(price) = update.price {
        if !price.is_positive() {
            return Err(CatalogError::InvalidProduct("Price must be positive".to_string()));
        }
    }
    if let Some(Some(offer)) = update.offer_price {
        if !offer.is_positive() {
            return Err(CatalogError::InvalidProduct("Offer price must be positive".to_string()));
        }
    }
    if let Some(stock) = update.stock {
        if stock < 0 {
            return Err(CatalogError::InvalidProduct("Stock cannot be negative".to_string()));
        }
    }
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(CatalogError::InvalidProduct("Product name cannot be empty".to_string()));
        }
    }
    Ok(())
}
