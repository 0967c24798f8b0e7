use chrono::{DateTime, Utc};
use mockall::mock;
use storefront_engine::{
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

mock! {
    pub StoreDb {}

    impl CatalogManagement for StoreDb {
        async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError>;
        async fn search_products(&self, filter: ProductQueryFilter) -> Result<(Vec<Product>, i64), CatalogError>;
        async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError>;
        async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;
        async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogError>;
        async fn delete_product(&self, id: i64) -> Result<Product, CatalogError>;
        async fn adjust_stock(&self, product_id: i64, delta: i64) -> Result<i64, CatalogError>;
    }

    impl AccountManagement for StoreDb {
        async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, AccountError>;
        async fn upsert_user(&self, user: NewUser) -> Result<User, AccountError>;
        async fn delete_user(&self, user_id: &str) -> Result<(), AccountError>;
        async fn fetch_addresses(&self, user_id: &str) -> Result<Vec<Address>, AccountError>;
        async fn fetch_address(&self, id: i64) -> Result<Option<Address>, AccountError>;
        async fn insert_address(&self, user_id: &str, address: NewAddress) -> Result<Address, AccountError>;
        async fn update_address(&self, id: i64, user_id: &str, address: NewAddress) -> Result<Address, AccountError>;
        async fn delete_address(&self, id: i64, user_id: &str) -> Result<(), AccountError>;
        async fn fetch_cart(&self, user_id: &str) -> Result<Vec<LineItem>, AccountError>;
        async fn replace_cart(&self, user_id: &str, items: &[LineItem]) -> Result<(), AccountError>;
        async fn clear_cart(&self, user_id: &str) -> Result<(), AccountError>;
    }

    impl StorefrontDatabase for StoreDb {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderFlowError>;
        async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
        async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderFlowError>;
        async fn update_payment_state(&self, id: i64, update: PaymentStateUpdate) -> Result<Order, OrderFlowError>;
    }

    impl ReceiptManagement for StoreDb {
        async fn fetch_receipt(&self, id: i64) -> Result<Option<Receipt>, ReceiptError>;
        async fn fetch_receipt_for_order(&self, order_id: i64) -> Result<Option<Receipt>, ReceiptError>;
        async fn fetch_receipt_items(&self, receipt_id: i64) -> Result<Vec<ReceiptItem>, ReceiptError>;
        async fn fetch_receipts_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<Receipt>, ReceiptError>;
        async fn insert_receipt(&self, receipt: NewReceipt, generated_at: DateTime<Utc>) -> Result<Receipt, ReceiptError>;
    }
}
