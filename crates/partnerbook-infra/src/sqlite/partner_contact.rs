//! SQLite partner contact repository implementation.
//!
//! Implements `PartnerContactRepository` from `partnerbook-core` using sqlx
//! with split read/write pools. PII columns are encrypted via the injected
//! `ContactCipher` before they touch the database and decrypted on the way
//! out; alternate-key lookups (email, phone) encrypt the search key and
//! compare ciphertext, which relies on the cipher being deterministic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use partnerbook_core::cipher::ContactCipher;
use partnerbook_core::repository::partner_contact::PartnerContactRepository;
use partnerbook_types::contact::{EncryptedContact, LocationId, PartnerContact};
use partnerbook_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `PartnerContactRepository`.
///
/// Holds the database pool and the field cipher; every operation runs
/// against a pooled connection released at operation end.
pub struct SqlitePartnerContactRepository {
    pool: DatabasePool,
    cipher: Arc<dyn ContactCipher>,
}

impl SqlitePartnerContactRepository {
    /// Create a new repository backed by the given pool and cipher.
    pub fn new(pool: DatabasePool, cipher: Arc<dyn ContactCipher>) -> Self {
        Self { pool, cipher }
    }

    async fn get_by_encrypted_column(
        &self,
        column: &'static str,
        key: &[u8],
    ) -> Result<Option<PartnerContact>, RepositoryError> {
        // `column` is a compile-time constant, never caller input.
        let sql = format!("SELECT * FROM partner_contacts WHERE {column} = ?");
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let contact_row = ContactRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(self.decrypt_row(contact_row)?))
            }
            None => Ok(None),
        }
    }

    fn decrypt_row(&self, row: ContactRow) -> Result<PartnerContact, RepositoryError> {
        self.cipher
            .decrypt_record(&row.into_encrypted())
            .map_err(RepositoryError::Cipher)
    }

    /// The fallible inner half of `delete_if_exists`. Read the live row,
    /// append it to the archive, remove it, commit. Any error rolls the
    /// transaction back when `tx` drops.
    async fn archive_and_remove(&self, location_id: &LocationId) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let row = sqlx::query("SELECT * FROM partner_contacts WHERE location_id = ?")
            .bind(location_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(());
        };

        let contact_row =
            ContactRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;

        // Archive rows get their own id: repeated create/delete cycles for
        // one location append one archive row per deletion.
        sqlx::query(
            "INSERT INTO partner_contacts_archive (id, location_id, first_name, last_name, email, phone_number, created_at, updated_at, archived_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(&contact_row.location_id)
        .bind(&contact_row.first_name)
        .bind(&contact_row.last_name)
        .bind(&contact_row.email)
        .bind(&contact_row.phone_number)
        .bind(&contact_row.created_at)
        .bind(&contact_row.updated_at)
        .bind(format_datetime(&Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query("DELETE FROM partner_contacts WHERE location_id = ?")
            .bind(location_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}

/// Internal row type for mapping SQLite rows to the encrypted contact shape.
struct ContactRow {
    location_id: String,
    first_name: Vec<u8>,
    last_name: Vec<u8>,
    email: Vec<u8>,
    phone_number: Vec<u8>,
    created_at: String,
    updated_at: String,
}

impl ContactRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            location_id: row.try_get("location_id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone_number: row.try_get("phone_number")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_encrypted(self) -> EncryptedContact {
        EncryptedContact {
            location_id: LocationId::new(self.location_id),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
        }
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl PartnerContactRepository for SqlitePartnerContactRepository {
    async fn get_by_location_id(
        &self,
        location_id: &LocationId,
    ) -> Result<Option<PartnerContact>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM partner_contacts WHERE location_id = ?")
            .bind(location_id.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let contact_row = ContactRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(self.decrypt_row(contact_row)?))
            }
            None => Ok(None),
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<PartnerContact>, RepositoryError> {
        let key = self
            .cipher
            .encrypt_value(email)
            .map_err(RepositoryError::Cipher)?;
        self.get_by_encrypted_column("email", &key).await
    }

    async fn get_by_phone(&self, phone: &str) -> Result<Option<PartnerContact>, RepositoryError> {
        let key = self
            .cipher
            .encrypt_value(phone)
            .map_err(RepositoryError::Cipher)?;
        self.get_by_encrypted_column("phone_number", &key).await
    }

    async fn get_paginated(
        &self,
        skip: i64,
        take: i64,
    ) -> Result<Vec<PartnerContact>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM partner_contacts ORDER BY location_id LIMIT ? OFFSET ?",
        )
        .bind(take)
        .bind(skip)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut contacts = Vec::with_capacity(rows.len());
        for row in &rows {
            let contact_row =
                ContactRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            contacts.push(self.decrypt_row(contact_row)?);
        }

        Ok(contacts)
    }

    async fn get_total(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM partner_contacts")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count)
    }

    async fn create_or_update(&self, contact: &PartnerContact) -> Result<(), RepositoryError> {
        let record = self
            .cipher
            .encrypt_record(contact)
            .map_err(RepositoryError::Cipher)?;
        let now = format_datetime(&Utc::now());

        // Upsert keyed on location_id; created_at survives updates because
        // only the listed columns are overwritten on conflict.
        let result = sqlx::query(
            "INSERT INTO partner_contacts (location_id, first_name, last_name, email, phone_number, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(location_id) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 email = excluded.email,
                 phone_number = excluded.phone_number,
                 updated_at = excluded.updated_at",
        )
        .bind(record.location_id.as_str())
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.email)
        .bind(&record.phone_number)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            // The location_id conflict is absorbed by the upsert, so a UNIQUE
            // violation here means the email or phone is owned by another row.
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Err(RepositoryError::Conflict(format!(
                    "email or phone number already in use by another location (location_id = {})",
                    contact.location_id
                )))
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn delete_if_exists(&self, location_id: &LocationId) {
        // Fire-and-forget semantics: failures are logged, the transaction
        // rolls back, and the caller is not told. Confirmed upstream
        // behavior; callers cannot distinguish deleted, missing, and failed.
        if let Err(err) = self.archive_and_remove(location_id).await {
            tracing::error!(
                location_id = %location_id,
                error = %err,
                "failed to delete partner contact"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::field::FieldCipher;
    use crate::sqlite::pool::DatabasePool;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn test_cipher() -> Arc<dyn ContactCipher> {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        Arc::new(FieldCipher::new(&key).unwrap())
    }

    async fn test_repo() -> SqlitePartnerContactRepository {
        SqlitePartnerContactRepository::new(test_pool().await, test_cipher())
    }

    fn make_contact(location: &str, email: &str, phone: &str) -> PartnerContact {
        PartnerContact {
            location_id: LocationId::new(location),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            phone_number: phone.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_location_id() {
        let repo = test_repo().await;
        let contact = make_contact("L1", "ada@example.com", "+100");

        repo.create_or_update(&contact).await.unwrap();

        let found = repo
            .get_by_location_id(&LocationId::new("L1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, contact);
    }

    #[tokio::test]
    async fn test_get_by_location_id_missing_returns_none() {
        let repo = test_repo().await;

        let found = repo
            .get_by_location_id(&LocationId::new("nope"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_by_email() {
        let repo = test_repo().await;
        repo.create_or_update(&make_contact("L1", "ada@example.com", "+100"))
            .await
            .unwrap();

        let found = repo.get_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(found.location_id, LocationId::new("L1"));

        let missing = repo.get_by_email("bob@example.com").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_get_by_phone() {
        let repo = test_repo().await;
        repo.create_or_update(&make_contact("L1", "ada@example.com", "+100"))
            .await
            .unwrap();

        let found = repo.get_by_phone("+100").await.unwrap().unwrap();
        assert_eq!(found.email, "ada@example.com");

        let missing = repo.get_by_phone("+999").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_mutable_fields() {
        let repo = test_repo().await;
        repo.create_or_update(&make_contact("L1", "old@example.com", "+100"))
            .await
            .unwrap();

        let mut updated = make_contact("L1", "new@example.com", "+200");
        updated.first_name = "Grace".to_string();
        repo.create_or_update(&updated).await.unwrap();

        let found = repo
            .get_by_location_id(&LocationId::new("L1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, updated);

        // The old alternate keys no longer resolve
        assert!(repo.get_by_email("old@example.com").await.unwrap().is_none());
        assert!(repo.get_by_phone("+100").await.unwrap().is_none());

        // Still exactly one live row
        assert_eq!(repo.get_total().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let repo = test_repo().await;
        let contact = make_contact("L1", "ada@example.com", "+100");

        repo.create_or_update(&contact).await.unwrap();
        repo.create_or_update(&contact).await.unwrap();

        assert_eq!(repo.get_total().await.unwrap(), 1);
        let found = repo
            .get_by_location_id(&LocationId::new("L1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, contact);
    }

    #[tokio::test]
    async fn test_alternate_key_conflict() {
        let repo = test_repo().await;
        repo.create_or_update(&make_contact("L1", "ada@example.com", "+100"))
            .await
            .unwrap();

        // Another location claims the same email
        let err = repo
            .create_or_update(&make_contact("L2", "ada@example.com", "+200"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_paginated_ordering_and_bounds() {
        let repo = test_repo().await;
        repo.create_or_update(&make_contact("L3", "c@example.com", "+3"))
            .await
            .unwrap();
        repo.create_or_update(&make_contact("L1", "a@example.com", "+1"))
            .await
            .unwrap();
        repo.create_or_update(&make_contact("L2", "b@example.com", "+2"))
            .await
            .unwrap();

        let page = repo.get_paginated(0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].location_id, LocationId::new("L1"));
        assert_eq!(page[1].location_id, LocationId::new("L2"));

        let rest = repo.get_paginated(2, 10).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].location_id, LocationId::new("L3"));

        let past_end = repo.get_paginated(10, 10).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_total_matches_unpaginated_listing() {
        let repo = test_repo().await;
        for i in 0..5 {
            repo.create_or_update(&make_contact(
                &format!("L{i}"),
                &format!("p{i}@example.com"),
                &format!("+{i}"),
            ))
            .await
            .unwrap();
        }

        let all = repo.get_paginated(0, i64::MAX).await.unwrap();
        assert_eq!(repo.get_total().await.unwrap(), all.len() as i64);
    }

    #[tokio::test]
    async fn test_pii_is_ciphertext_at_rest() {
        let repo = test_repo().await;
        repo.create_or_update(&make_contact("L1", "ada@example.com", "+100"))
            .await
            .unwrap();

        let (email_blob,): (Vec<u8>,) =
            sqlx::query_as("SELECT email FROM partner_contacts WHERE location_id = 'L1'")
                .fetch_one(&repo.pool.reader)
                .await
                .unwrap();

        assert_ne!(email_blob, b"ada@example.com");
        let raw = String::from_utf8_lossy(&email_blob);
        assert!(!raw.contains("ada@example.com"));
    }

    #[tokio::test]
    async fn test_delete_moves_row_to_archive() {
        let repo = test_repo().await;
        repo.create_or_update(&make_contact("L1", "ada@example.com", "+100"))
            .await
            .unwrap();

        repo.delete_if_exists(&LocationId::new("L1")).await;

        // Gone from the live table
        assert!(repo
            .get_by_location_id(&LocationId::new("L1"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(repo.get_total().await.unwrap(), 0);

        // Present in the archive, ciphertext intact
        let (location, email_blob): (String, Vec<u8>) = sqlx::query_as(
            "SELECT location_id, email FROM partner_contacts_archive",
        )
        .fetch_one(&repo.pool.reader)
        .await
        .unwrap();
        assert_eq!(location, "L1");

        let key = test_cipher().encrypt_value("ada@example.com").unwrap();
        assert_eq!(email_blob, key);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let repo = test_repo().await;

        repo.delete_if_exists(&LocationId::new("ghost")).await;

        let (archived,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM partner_contacts_archive")
                .fetch_one(&repo.pool.reader)
                .await
                .unwrap();
        assert_eq!(archived, 0);
    }

    #[tokio::test]
    async fn test_repeated_delete_appends_archive_rows() {
        let repo = test_repo().await;

        repo.create_or_update(&make_contact("L1", "a@example.com", "+1"))
            .await
            .unwrap();
        repo.delete_if_exists(&LocationId::new("L1")).await;

        repo.create_or_update(&make_contact("L1", "b@example.com", "+2"))
            .await
            .unwrap();
        repo.delete_if_exists(&LocationId::new("L1")).await;

        let (archived,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM partner_contacts_archive WHERE location_id = 'L1'",
        )
        .fetch_one(&repo.pool.reader)
        .await
        .unwrap();
        assert_eq!(archived, 2);
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_live_table_unchanged() {
        let repo = test_repo().await;
        repo.create_or_update(&make_contact("L1", "ada@example.com", "+100"))
            .await
            .unwrap();

        // Sabotage the archive table so the transactional insert fails
        sqlx::query("DROP TABLE partner_contacts_archive")
            .execute(&repo.pool.writer)
            .await
            .unwrap();

        // Swallowed failure: no panic, no error surfaced
        repo.delete_if_exists(&LocationId::new("L1")).await;

        // The live row survived the rolled-back transaction
        let found = repo
            .get_by_location_id(&LocationId::new("L1"))
            .await
            .unwrap();
        assert!(found.is_some());
    }
}
