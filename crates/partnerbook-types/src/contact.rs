use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Unique identifier for the partner location a contact belongs to.
///
/// Location ids are assigned by the upstream partner-management system and
/// treated as opaque strings here. At most one live contact exists per id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocationId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// A partner contact as seen by callers: all fields in plaintext.
///
/// This is the view model returned from lookups and accepted by upserts.
/// The PII fields (names, email, phone) are only ever stored encrypted;
/// see [`EncryptedContact`] for the at-rest shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerContact {
    pub location_id: LocationId,
    pub first_name: String,
    pub last_name: String,
    /// Alternate unique key; stored encrypted.
    pub email: String,
    /// Alternate unique key; stored encrypted.
    pub phone_number: String,
}

/// A partner contact with its PII fields as opaque ciphertext.
///
/// This is the unit a `ContactCipher` produces and consumes, and the shape
/// the storage layer persists. The ciphertext bytes are never interpreted
/// by the repository -- only compared for equality on alternate-key lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedContact {
    pub location_id: LocationId,
    pub first_name: Vec<u8>,
    pub last_name: Vec<u8>,
    pub email: Vec<u8>,
    pub phone_number: Vec<u8>,
}
