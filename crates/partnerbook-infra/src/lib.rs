//! Infrastructure layer for Partnerbook.
//!
//! Contains implementations of the traits defined in `partnerbook-core`:
//! SQLite storage for partner contacts (live + archive tables) and
//! deterministic AES-256-GCM field encryption for PII at rest.

pub mod config;
pub mod crypto;
pub mod sqlite;
