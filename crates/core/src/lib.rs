//! Refund Desk Core - Shared types library.
//!
//! This crate provides common types used across all Refund Desk components:
//! - `refund-desk` - Refund calculation, session state, and gateway client
//! - `cli` - Command-line tools for quoting and issuing refunds
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Decimal money, Shopify global IDs, and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
