//! Core types for Storekeep.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod document;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use document::{Document, DocumentError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use status::*;
