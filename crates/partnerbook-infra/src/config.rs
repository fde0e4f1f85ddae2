//! Storage configuration loader for Partnerbook.
//!
//! Reads `config.toml` from the data directory (`~/.partnerbook/` in
//! production) and deserializes it into [`StorageConfig`]. Falls back to
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use partnerbook_types::config::{KeySource, StorageConfig};
use partnerbook_types::error::CipherError;

use crate::crypto::field::FieldCipher;

/// Environment variable overriding the data directory.
const DATA_DIR_ENV: &str = "PARTNERBOOK_DATA_DIR";
/// Environment variable carrying the vault password when `key_source = "password"`.
/// The password is never read from the config file.
const VAULT_PASSWORD_ENV: &str = "PARTNERBOOK_VAULT_PASSWORD";

/// Resolve the data directory: `PARTNERBOOK_DATA_DIR` env var, falling back
/// to `~/.partnerbook`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".partnerbook")
}

/// Load storage configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`StorageConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_storage_config(data_dir: &Path) -> StorageConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return StorageConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return StorageConfig::default();
        }
    };

    match toml::from_str::<StorageConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            StorageConfig::default()
        }
    }
}

/// Resolve the database URL: explicit override from the config, otherwise
/// `{data_dir}/partnerbook.db`.
pub fn database_url(config: &StorageConfig, data_dir: &Path) -> String {
    match &config.database_url {
        Some(url) => url.clone(),
        None => format!("sqlite://{}/partnerbook.db", data_dir.display()),
    }
}

/// Build the field cipher for the configured key source.
///
/// - `keychain`: load or auto-generate the master key in the OS keychain.
/// - `password`: Argon2id derivation from `PARTNERBOOK_VAULT_PASSWORD`;
///   missing/empty env var is `CipherError::MissingPassword`.
pub fn cipher_from_config(config: &StorageConfig) -> Result<FieldCipher, CipherError> {
    match config.key_source {
        KeySource::Keychain => FieldCipher::from_keychain(),
        KeySource::Password => {
            let password = std::env::var(VAULT_PASSWORD_ENV)
                .ok()
                .filter(|p| !p.is_empty())
                .ok_or(CipherError::MissingPassword)?;
            FieldCipher::from_password(&password)
        }
    }
}
