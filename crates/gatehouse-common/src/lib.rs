//! Common types and utilities for the Gatehouse authorization server.
//!
//! This crate provides shared functionality used across the Gatehouse crates:
//! - Cryptography utilities (CSPRNG tokens, SHA-256, constant-time comparison)
//! - JWT utilities (HS256)
//! - Common error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
pub mod error;
pub mod jwt;

pub use error::{Error, Result};

/// Returns the current Unix time in seconds.
#[must_use]
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
