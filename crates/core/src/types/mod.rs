//! Core types for Refund Desk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod status;

pub use id::*;
pub use money::{CurrencyCode, CurrencyCodeError, Money};
pub use status::*;
