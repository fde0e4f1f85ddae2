//! Contact cipher trait definition.

use partnerbook_types::contact::{EncryptedContact, PartnerContact};
use partnerbook_types::error::CipherError;

/// Capability: encrypts and decrypts partner-contact PII.
///
/// Implementations live in partnerbook-infra (e.g., `FieldCipher`). The
/// repository only ever sees this trait, so the crypto backend can be
/// replaced without touching query logic.
///
/// Implementations MUST be deterministic for `encrypt_value`: encrypting the
/// same plaintext twice under the same key must yield identical ciphertext.
/// Alternate-key lookups (email, phone) compare ciphertext for equality in
/// the database, and the UNIQUE constraints on those columns depend on it.
pub trait ContactCipher: Send + Sync {
    /// Encrypt every PII field of a contact.
    fn encrypt_record(&self, contact: &PartnerContact) -> Result<EncryptedContact, CipherError>;

    /// Decrypt every PII field of a stored contact.
    fn decrypt_record(&self, record: &EncryptedContact) -> Result<PartnerContact, CipherError>;

    /// Encrypt a single value, e.g. a search key for an alternate-key lookup.
    fn encrypt_value(&self, value: &str) -> Result<Vec<u8>, CipherError>;
}
