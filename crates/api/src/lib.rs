//! Storekeep API library.
//!
//! The binary in `main.rs` wires configuration, logging and the database pool
//! around [`routes::app`]; everything else lives here so it can be tested
//! without a server or a database.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;
