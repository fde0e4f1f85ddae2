use serde::{Deserialize, Serialize};

/// Where the field-cipher master key comes from.
///
/// - Keychain: auto-generated 32-byte key stored in the OS keychain
///   (zero-friction default).
/// - Password: Argon2id derivation from the `PARTNERBOOK_VAULT_PASSWORD`
///   environment variable. The password itself is never read from the
///   config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    Keychain,
    Password,
}

impl Default for KeySource {
    fn default() -> Self {
        KeySource::Keychain
    }
}

/// Storage configuration, loaded from `{data_dir}/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override for the SQLite database URL. When unset, the database lives
    /// at `{data_dir}/partnerbook.db`.
    pub database_url: Option<String>,
    /// Master-key source for field encryption.
    pub key_source: KeySource,
}
