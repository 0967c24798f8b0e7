//! Storefront Engine
//!
//! The core of the phone storefront: record types, the order/stock/payment flow, and persistent storage. The engine
//! is HTTP-agnostic; the server crate wires its APIs to routes.
//!
//! The crate is divided into three layers:
//! 1. Storage traits ([`traits`]) and their SQLite implementation ([`SqliteDatabase`]). You should never need to
//!    access the database directly; the data types it stores are defined in [`db_types`] and are public.
//! 2. The public API layer ([`api`]): [`OrderFlowApi`] (checkout, cancellation, status changes, payment
//!    reconciliation), [`CatalogApi`] (products and the stock ledger), [`AccountApi`] (users, addresses, carts) and
//!    [`ReceiptApi`] (immutable receipt snapshots).
//! 3. Request/response shapes in [`order_objects`].
//!
//! ## A note on stock and concurrency
//!
//! Stock lives as a plain integer column on the product row. Every adjustment is a single atomic statement, but the
//! admission check at checkout (read stock, compare, then decrement) is not wrapped in a cross-product
//! transaction: two concurrent checkouts competing for the last unit can both pass admission and both decrement,
//! driving stock negative. This mirrors the per-document atomicity the design is built around; the behavior is
//! pinned by an integration test rather than silently "fixed".

pub mod api;
pub mod db_types;
pub mod order_objects;
mod sqlite;
pub mod traits;

pub use api::{AccountApi, CatalogApi, OrderFlowApi, ReceiptApi};
pub use sqlite::SqliteDatabase;
