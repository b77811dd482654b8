//! # nimbus-auth
//!
//! Client credentials for the nimbus server.
//!
//! Two kinds of bearer credential exist side by side:
//!
//! - **API keys**: opaque strings handed out on registration, one per client,
//!   held in an [`ApiKeyStore`] that is injected into the authority.
//! - **Tokens**: self-contained HS256 JWTs carrying the client id and a
//!   permission set. Nothing about them is stored server-side.
//!
//! [`CredentialAuthority`] issues and verifies both.

#![deny(unsafe_code)]

pub mod authority;
pub mod errors;
pub mod store;

pub use authority::{CredentialAuthority, VerifiedToken, bearer_token};
pub use errors::AuthError;
pub use store::ApiKeyStore;
