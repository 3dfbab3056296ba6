//! Medusa storefront client library.
//!
//! Typed access to a Medusa-compatible commerce backend plus the session
//! state a storefront keeps on top of it: the signed-in customer, the
//! current cart and the anonymous basket.
//!
//! - [`medusa`] - API client and one module per backend resource family
//! - [`session`] - customer, cart and basket state mirrored from the backend
//! - [`storage`] - persisted identity (token, cart id, fingerprint, basket)
//! - [`config`] - environment-driven configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod medusa;
pub mod session;
pub mod storage;

pub use config::StorefrontConfig;
pub use error::LoadError;
pub use medusa::{MedusaClient, MedusaError};
pub use session::Storefront;
