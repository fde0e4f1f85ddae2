//! Cryptographic operations for Partnerbook.
//!
//! - `field`: deterministic AES-256-GCM encryption for PII columns at rest

pub mod field;
