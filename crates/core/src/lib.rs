//! Corner Shop Core - Shared types library.
//!
//! This crate provides common types used across all Corner Shop components:
//! - `api` - Storefront and back office JSON API, POS reconciliation
//! - `cli` - Command-line tools for migrations, admin users and sync runs
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, currency unit conversion, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
