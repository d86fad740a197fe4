//! Storekeep Core - Shared domain types.
//!
//! This crate provides the value types used across all Storekeep components:
//! - `api` - HTTP backend for customers, products, checkout, orders and payments
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP. Database and OpenAPI integration are opt-in through the `postgres`
//! and `openapi` features.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, customer documents, emails and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
