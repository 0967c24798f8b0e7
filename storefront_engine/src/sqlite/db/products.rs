use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product, ProductUpdate},
    order_objects::ProductQueryFilter,
    traits::CatalogError,
};

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

fn push_listing_filters(builder: &mut QueryBuilder<'_, sqlx::Sqlite>, filter: &ProductQueryFilter) {
    if filter.search.is_none() && filter.brand.is_none() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        where_clause.push("(name LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" OR description LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" OR brand LIKE ");
        where_clause.push_bind_unseparated(pattern);
        where_clause.push_unseparated(")");
    }
    if let Some(brand) = &filter.brand {
        where_clause.push("brand = ");
        where_clause.push_bind_unseparated(brand.clone());
    }
}

/// Fetches one page of the public catalog listing, newest first, along with the total match count for the filter.
pub async fn search_products(
    filter: ProductQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<(Vec<Product>, i64), sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM products");
    push_listing_filters(&mut builder, &filter);
    builder.push(" ORDER BY created_at DESC LIMIT ");
    builder.push_bind(filter.limit);
    builder.push(" OFFSET ");
    builder.push_bind(filter.offset());
    trace!("📦️ Executing query: {}", builder.sql());
    let products = builder.build_query_as::<Product>().fetch_all(&mut *conn).await?;

    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) as total FROM products");
    push_listing_filters(&mut count_builder, &filter);
    let total: i64 = count_builder.build().fetch_one(conn).await?.get("total");
    Ok((products, total))
}

pub async fn fetch_all_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products ORDER BY created_at DESC").fetch_all(conn).await?;
    Ok(products)
}

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (user_id, name, description, brand, price, offer_price, stock, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(product.user_id)
    .bind(product.name)
    .bind(product.description)
    .bind(product.brand)
    .bind(product.price)
    .bind(product.offer_price)
    .bind(product.stock)
    .bind(sqlx::types::Json(product.images))
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn update_product(
    id: i64,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, CatalogError> {
    if update.is_empty() {
        debug!("📦️ No fields to update for product {id}. Update request skipped.");
        return Ok(fetch_product(id, conn).await?);
    }
    let mut builder = QueryBuilder::new("UPDATE products SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(brand) = update.brand {
        set_clause.push("brand = ");
        set_clause.push_bind_unseparated(brand);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(offer_price) = update.offer_price {
        set_clause.push("offer_price = ");
        set_clause.push_bind_unseparated(offer_price);
    }
    if let Some(stock) = update.stock {
        set_clause.push("stock = ");
        set_clause.push_bind_unseparated(stock);
    }
    if let Some(images) = update.images {
        set_clause.push("images = ");
        set_clause.push_bind_unseparated(sqlx::types::Json(images));
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📦️ Executing query: {}", builder.sql());
    let res = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Product::from_row(&row)).transpose()?;
    Ok(res)
}

pub async fn delete_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("DELETE FROM products WHERE id = $1 RETURNING *").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

/// Returns the id of any order that references the product and is not in a terminal state. Such a reference blocks
/// product deletion.
pub async fn open_order_reference(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query(
        r#"
            SELECT orders.id as id FROM orders
            JOIN order_items ON order_items.order_id = orders.id
            WHERE order_items.product_id = $1 AND orders.status NOT IN ('delivered', 'cancelled')
            LIMIT 1
        "#,
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r: SqliteRow| r.get("id")))
}

/// Adds `delta` to the product's stock in a single atomic statement and returns the new level. This is the only way
/// the order flow touches stock; there is no cross-product transaction around a batch of adjustments.
pub async fn adjust_stock(product_id: i64, delta: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query(
        "UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING stock",
    )
    .bind(delta)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r: SqliteRow| r.get("stock")))
}
