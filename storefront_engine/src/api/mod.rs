//! The public-facing API of the storefront engine.
//!
//! Each API struct wraps a storage backend (anything implementing the relevant [`crate::traits`] contracts) and adds
//! the flow logic on top: admission checks, pricing, ownership enforcement, snapshotting. The HTTP layer talks only
//! to these APIs.

mod account_api;
mod catalog_api;
mod order_flow_api;
mod receipt_api;

pub use account_api::AccountApi;
pub use catalog_api::CatalogApi;
pub use order_flow_api::OrderFlowApi;
pub use receipt_api::ReceiptApi;
