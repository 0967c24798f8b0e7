//! Endpoint tests run the real handlers against [`mockall`] mocks of the storage traits, so they cover the HTTP
//! surface (auth, status codes, serialization) without a database.

mod helpers;
mod mocks;
mod orders;
mod products;
mod receipts;
mod webhooks;
