//! Common error types for the Gatehouse crates.

use thiserror::Error;

/// Result type alias using the common `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// Common errors that can occur across Gatehouse crates.
#[derive(Debug, Error)]
pub enum Error {
    /// JWT signing or verification error.
    #[error("JWT error: {0}")]
    Jwt(String),
}
