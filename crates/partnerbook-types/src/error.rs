use thiserror::Error;

/// Errors from field-cipher operations.
///
/// IMPORTANT: These errors never include plaintext, key material, or ciphertext
/// in their Display/Debug output to prevent accidental logging of PII.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid ciphertext: too short")]
    CiphertextTooShort,

    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,

    #[error("key derivation failed")]
    KeyDerivationFailed,

    #[error("vault password not configured")]
    MissingPassword,

    #[error("keychain unavailable: {0}")]
    KeychainUnavailable(String),

    #[error("keychain error: {0}")]
    KeychainError(String),
}

/// Errors from repository operations (used by trait definitions in partnerbook-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("cipher error: {0}")]
    Cipher(CipherError),
}
