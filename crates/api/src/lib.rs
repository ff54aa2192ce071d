//! Corner Shop API - storefront and back office JSON API.
//!
//! # Architecture
//!
//! - Axum routes under `/api`, JSON envelopes with a `success` flag
//! - `PostgreSQL` via sqlx; variants, items and carts stored as JSONB
//! - Sessions in `PostgreSQL` through tower-sessions
//! - A POS REST client and a two-way catalog sync (`sync`)
//! - An in-process event hub streamed to browsers as SSE
//!
//! The binary in `main.rs` wires these together; the CLI and integration
//! tests use the library directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod middleware;
pub mod models;
pub mod pos;
pub mod routes;
pub mod services;
pub mod state;
pub mod sync;
