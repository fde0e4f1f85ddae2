//! Partner contact repository trait definition.

use partnerbook_types::contact::{LocationId, PartnerContact};
use partnerbook_types::error::RepositoryError;

/// Repository trait for partner contact persistence.
///
/// Implementations live in partnerbook-infra (e.g., SqlitePartnerContactRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
///
/// All lookups return decrypted contacts; all writes encrypt before
/// persisting. Read paths propagate storage errors to the caller.
pub trait PartnerContactRepository: Send + Sync {
    /// Get the live contact for a location, or `None` when absent.
    fn get_by_location_id(
        &self,
        location_id: &LocationId,
    ) -> impl std::future::Future<Output = Result<Option<PartnerContact>, RepositoryError>> + Send;

    /// Point lookup by email (alternate unique key). The search key is
    /// encrypted before querying.
    fn get_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<PartnerContact>, RepositoryError>> + Send;

    /// Point lookup by phone number (alternate unique key). The search key
    /// is encrypted before querying.
    fn get_by_phone(
        &self,
        phone: &str,
    ) -> impl std::future::Future<Output = Result<Option<PartnerContact>, RepositoryError>> + Send;

    /// Offset-paginated listing of live contacts, ordered by location id.
    fn get_paginated(
        &self,
        skip: i64,
        take: i64,
    ) -> impl std::future::Future<Output = Result<Vec<PartnerContact>, RepositoryError>> + Send;

    /// Total number of live contacts.
    fn get_total(
        &self,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Upsert keyed on location id: insert when absent, overwrite the
    /// mutable fields when present. Re-using another location's email or
    /// phone number yields `RepositoryError::Conflict`.
    fn create_or_update(
        &self,
        contact: &PartnerContact,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Soft delete: within one transaction, copy the live row into the
    /// archive table and remove it from the live table. Absent rows are a
    /// no-op. Failures are logged and swallowed; callers cannot distinguish
    /// deleted, missing, and failed outcomes.
    fn delete_if_exists(
        &self,
        location_id: &LocationId,
    ) -> impl std::future::Future<Output = ()> + Send;
}
