use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const RECORD_ID_LEN: usize = 12;

/// Twelve-byte document identifier shared by every collection in the catalog.
///
/// The first four bytes hold the creation instant as big-endian unix seconds, which is the only
/// creation timestamp interactions carry. The textual form is 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId([u8; RECORD_ID_LEN]);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordIdError {
    #[error("record id must be {expected} hex characters, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("record id is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl RecordId {
    pub const fn from_bytes(bytes: [u8; RECORD_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; RECORD_ID_LEN] {
        self.0
    }

    /// Builds an id whose embedded timestamp is `created_at` (truncated to whole seconds).
    ///
    /// `discriminator` fills the trailing eight bytes so ids minted in the same second stay
    /// distinct and keep their relative order.
    pub fn from_timestamp(created_at: DateTime<Utc>, discriminator: u64) -> Self {
        let seconds = u32::try_from(created_at.timestamp().max(0)).unwrap_or(u32::MAX);
        let mut bytes = [0u8; RECORD_ID_LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&discriminator.to_be_bytes());
        Self(bytes)
    }

    /// Creation instant embedded in the id.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let seconds = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        DateTime::from_timestamp(i64::from(seconds), 0).unwrap_or_default()
    }
}

impl FromStr for RecordId {
    type Err = RecordIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.len() != RECORD_ID_LEN * 2 {
            return Err(RecordIdError::Length {
                expected: RECORD_ID_LEN * 2,
                actual: trimmed.len(),
            });
        }

        let mut bytes = [0u8; RECORD_ID_LEN];
        hex::decode_to_slice(trimmed, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
