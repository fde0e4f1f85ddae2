//! Deterministic AES-256-GCM field encryption for PII at rest.
//!
//! `FieldCipher` encrypts the name, email, and phone columns of a partner
//! contact. Unlike a conventional AEAD setup with random nonces, the nonce
//! here is *synthetic*: HMAC-SHA256 over the plaintext under a dedicated
//! subkey, truncated to 12 bytes (SIV-style). Equal plaintexts therefore
//! produce equal ciphertexts, which is what allows equality lookups on the
//! encrypted email/phone columns and the UNIQUE constraints on them.
//!
//! The trade-off is standard for searchable deterministic encryption: an
//! observer of the ciphertext can tell when two rows share a value, but
//! learns nothing else about it.
//!
//! The master key can come from:
//! - A raw 32-byte key
//! - A password (Argon2id key derivation)
//! - The OS keychain (auto-generated, zero-friction default)
//!
//! Encrypted format: `nonce (12 bytes) || ciphertext`
//!
//! SECURITY: Error paths never carry plaintext or key material.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use partnerbook_core::cipher::ContactCipher;
use partnerbook_types::contact::{EncryptedContact, PartnerContact};
use partnerbook_types::error::CipherError;

type HmacSha256 = Hmac<Sha256>;

/// Nonce size for AES-256-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Domain-separation labels for subkey derivation.
const ENC_KEY_LABEL: &[u8] = b"partnerbook-enc-v1";
const NONCE_KEY_LABEL: &[u8] = b"partnerbook-nonce-v1";

/// Service name used for keychain storage of the master key.
const KEYCHAIN_SERVICE: &str = "partnerbook";
/// Keychain user/account for the field-cipher master key.
const KEYCHAIN_USER: &str = "field-master-key";

/// Deterministic AES-256-GCM cipher over partner-contact PII fields.
///
/// Two subkeys are derived from the 32-byte master key via HMAC-SHA256 with
/// distinct labels: one for AES-GCM, one for synthetic nonce derivation.
pub struct FieldCipher {
    cipher: Aes256Gcm,
    nonce_key: [u8; 32],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    /// Create a new FieldCipher from a raw 32-byte master key.
    pub fn new(master_key: &[u8; 32]) -> Result<Self, CipherError> {
        let enc_key = derive_subkey(master_key, ENC_KEY_LABEL)?;
        let nonce_key = derive_subkey(master_key, NONCE_KEY_LABEL)?;

        Ok(Self {
            cipher: Aes256Gcm::new((&enc_key).into()),
            nonce_key,
        })
    }

    /// Derive the master key from a password using Argon2id.
    ///
    /// Uses OWASP recommended parameters:
    /// - 19 MiB memory (19456 KiB)
    /// - 2 iterations
    /// - 1 parallelism degree
    ///
    /// The salt is deterministic ("partnerbook-vault-v1") so the same
    /// password always produces the same key. The password provides the
    /// entropy; the hash is used as a KDF, not stored for verification.
    pub fn from_password(password: &str) -> Result<Self, CipherError> {
        use argon2::{Algorithm, Argon2, Params, Version};

        let params = Params::new(19456, 2, 1, Some(32))
            .map_err(|_| CipherError::KeyDerivationFailed)?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = b"partnerbook-vault-v1";
        let mut key = [0u8; 32];
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|_| CipherError::KeyDerivationFailed)?;

        Self::new(&key)
    }

    /// Load or auto-generate a master key from the OS keychain.
    ///
    /// This is the zero-friction default path:
    /// 1. Try to load an existing key under service="partnerbook" user="field-master-key"
    /// 2. If not found, generate a random 32-byte key and store it
    ///
    /// The key is stored as a hex string in the keychain (64 hex chars = 32 bytes).
    pub fn from_keychain() -> Result<Self, CipherError> {
        let entry = keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_USER)
            .map_err(|e| CipherError::KeychainUnavailable(e.to_string()))?;

        match entry.get_password() {
            Ok(hex_key) => {
                let key_bytes = hex_decode(&hex_key)
                    .map_err(|_| CipherError::KeychainError("corrupted key in keychain".to_string()))?;
                if key_bytes.len() != 32 {
                    return Err(CipherError::KeychainError(
                        "invalid key length in keychain".to_string(),
                    ));
                }
                let mut key = [0u8; 32];
                key.copy_from_slice(&key_bytes);
                Self::new(&key)
            }
            Err(keyring::Error::NoEntry) => {
                // No key yet -- generate a random one
                let key: [u8; 32] = rand_bytes();
                let hex_key = hex_encode(&key);
                entry
                    .set_password(&hex_key)
                    .map_err(|e| CipherError::KeychainError(e.to_string()))?;
                Self::new(&key)
            }
            Err(e) => Err(CipherError::KeychainUnavailable(e.to_string())),
        }
    }

    /// Derive the synthetic nonce for a plaintext: HMAC-SHA256 under the
    /// nonce subkey, truncated to 12 bytes.
    fn synthetic_nonce(&self, plaintext: &[u8]) -> Result<[u8; NONCE_SIZE], CipherError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.nonce_key)
            .map_err(|_| CipherError::EncryptionFailed)?;
        mac.update(plaintext);
        let digest = mac.finalize().into_bytes();

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&digest[..NONCE_SIZE]);
        Ok(nonce)
    }

    /// Encrypt plaintext. Returns `nonce (12 bytes) || ciphertext`.
    ///
    /// Deterministic: the same plaintext always produces the same output
    /// under a given master key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = self.synthetic_nonce(plaintext)?;
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data produced by `encrypt()`.
    ///
    /// Expects `nonce (12 bytes) || ciphertext` format.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        if data.len() < NONCE_SIZE {
            return Err(CipherError::CiphertextTooShort);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)
    }

    fn decrypt_string(&self, data: &[u8]) -> Result<String, CipherError> {
        let bytes = self.decrypt(data)?;
        String::from_utf8(bytes).map_err(|_| CipherError::InvalidUtf8)
    }
}

impl ContactCipher for FieldCipher {
    fn encrypt_record(&self, contact: &PartnerContact) -> Result<EncryptedContact, CipherError> {
        Ok(EncryptedContact {
            location_id: contact.location_id.clone(),
            first_name: self.encrypt(contact.first_name.as_bytes())?,
            last_name: self.encrypt(contact.last_name.as_bytes())?,
            email: self.encrypt(contact.email.as_bytes())?,
            phone_number: self.encrypt(contact.phone_number.as_bytes())?,
        })
    }

    fn decrypt_record(&self, record: &EncryptedContact) -> Result<PartnerContact, CipherError> {
        Ok(PartnerContact {
            location_id: record.location_id.clone(),
            first_name: self.decrypt_string(&record.first_name)?,
            last_name: self.decrypt_string(&record.last_name)?,
            email: self.decrypt_string(&record.email)?,
            phone_number: self.decrypt_string(&record.phone_number)?,
        })
    }

    fn encrypt_value(&self, value: &str) -> Result<Vec<u8>, CipherError> {
        self.encrypt(value.as_bytes())
    }
}

/// Derive a 32-byte subkey from the master key with a domain-separation label.
fn derive_subkey(master_key: &[u8; 32], label: &[u8]) -> Result<[u8; 32], CipherError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(master_key)
        .map_err(|_| CipherError::KeyDerivationFailed)?;
    mac.update(label);
    let digest = mac.finalize().into_bytes();

    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    Ok(key)
}

/// Generate 32 random bytes using the OS CSPRNG.
fn rand_bytes() -> [u8; 32] {
    use aes_gcm::aead::rand_core::RngCore;
    let mut key = [0u8; 32];
    aes_gcm::aead::OsRng.fill_bytes(&mut key);
    key
}

/// Hex-encode bytes to string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hex-decode a string to bytes.
fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("odd length hex string".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| format!("invalid hex at position {i}: {e}"))
        })
        .collect()
}
