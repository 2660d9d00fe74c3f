//! OAuth 2.0 authorization and token protocol engine for Gatehouse.
//!
//! This crate implements:
//! - The authorization code flow with consent (RFC 6749 §4.1)
//! - RFC 7636 PKCE (`plain` and `S256`)
//! - Refresh token rotation (RFC 6749 §6)
//! - The client credentials grant (RFC 6749 §4.4)
//!
//! Persistence is reached only through [`OAuthStorage`]; [`MemoryStorage`]
//! is a complete in-memory implementation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authorize;
pub mod client;
pub mod code;
pub mod consent;
pub mod error;
mod exchange;
pub mod memory;
pub mod pkce;
pub mod protocol;
pub mod provider;
pub mod scope;
pub mod storage;
pub mod tokens;

pub use authorize::{AuthorizationRequest, AuthorizeOutcome, AuthorizeRejection};
pub use client::Client;
pub use error::{ErrorCode, OAuthError, Result};
pub use exchange::TokenRequest;
pub use memory::MemoryStorage;
pub use protocol::{CodeChallengeMethod, GrantType, ResponseType};
pub use provider::OAuthProvider;
pub use scope::Scope;
pub use storage::{OAuthStorage, User};
pub use tokens::{Hs256Signer, TokenConfig, TokenResponse, TokenSigner};
