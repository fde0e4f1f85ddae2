//! Repository and cipher trait definitions for Partnerbook.
//!
//! This crate defines the "ports" that the infrastructure layer implements.
//! It depends only on `partnerbook-types` -- never on `partnerbook-infra`
//! or any database/crypto crate, so storage and crypto backends can be
//! swapped without touching callers.

pub mod cipher;
pub mod repository;
