//! Medusa Storefront Core - Shared types library.
//!
//! This crate provides common types used across the storefront workspace:
//! - `client` - API client, domain modules and session state
//! - `cli` - Command-line driver for the client
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for backend IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
