//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (partnerbook-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod partner_contact;
