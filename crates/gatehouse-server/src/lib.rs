//! HTTP surface for the Gatehouse authorization server.
//!
//! This crate provides:
//! - The `/connect/authorize`, `/connect/token` and `/connect/consent` endpoints
//! - `SQLite` storage implementing the engine's storage contract
//! - Session-token authentication of the end user
//! - Development data seeding

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod middleware;
pub mod routes;
pub mod seed;
pub mod storage;

pub use error::{Result, ServerError};
pub use routes::{create_router, AppState};
pub use storage::SqliteStorage;
