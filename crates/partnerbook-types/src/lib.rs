//! Shared domain types for Partnerbook.
//!
//! This crate contains the partner contact domain types, storage configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod contact;
pub mod error;
