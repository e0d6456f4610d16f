//! Native document identifier.
//!
//! # Invariants
//! - Textual form is exactly 24 hex characters; output is always lowercase.
//! - Generated ids are unique per process: 4-byte timestamp, 5 process-random
//!   bytes, 3-byte wrapping counter.

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const OBJECT_ID_LEN: usize = 12;
const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;
const COUNTER_MASK: u32 = 0x00ff_ffff;

static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| {
    let random = Uuid::new_v4();
    let mut bytes = [0u8; 5];
    bytes.copy_from_slice(&random.as_bytes()[..5]);
    bytes
});

static COUNTER: Lazy<AtomicU32> = Lazy::new(|| {
    let random = Uuid::new_v4();
    let bytes = random.as_bytes();
    AtomicU32::new(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
});

/// 12-byte identifier generated by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

/// Rejected textual identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdError {
    input: String,
}

impl Display for ObjectIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "`{}` is not a valid object id (expected {OBJECT_ID_HEX_LEN} hex characters)",
            self.input
        )
    }
}

impl Error for ObjectIdError {}

/// Seconds past the 32-bit range saturate instead of wrapping.
fn timestamp_field(elapsed_secs: u64) -> u32 {
    u32::try_from(elapsed_secs).unwrap_or(u32::MAX)
}

impl ObjectId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| timestamp_field(elapsed.as_secs()))
            .unwrap_or(0);
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Parses the 24-character hex form. Upper and lower case are accepted.
    pub fn parse_str(value: &str) -> Result<Self, ObjectIdError> {
        let invalid = || ObjectIdError {
            input: value.to_string(),
        };
        if value.len() != OBJECT_ID_HEX_LEN {
            return Err(invalid());
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(value, &mut bytes).map_err(|_| invalid())?;
        Ok(Self(bytes))
    }

    /// Returns whether `value` is syntactically a native identifier.
    pub fn is_valid(value: &str) -> bool {
        Self::parse_str(value).is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time embedded in the identifier, in Unix seconds.
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse_str(value)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse_str(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{timestamp_field, ObjectId};
    use std::collections::HashSet;

    #[test]
    fn parse_accepts_24_hex_and_normalizes_case() {
        let id = ObjectId::parse_str("507F1F77BCF86CD799439011").unwrap();
        assert_eq!(id.to_hex(), "507f1f77bcf86cd799439011");
        assert_eq!(id.timestamp_secs(), 0x507f1f77);
    }

    #[test]
    fn parse_rejects_wrong_length_and_non_hex() {
        assert!(!ObjectId::is_valid("507f1f77bcf86cd79943901"));
        assert!(!ObjectId::is_valid("507f1f77bcf86cd7994390111"));
        assert!(!ObjectId::is_valid("zz7f1f77bcf86cd799439011"));
        assert!(!ObjectId::is_valid(""));
    }

    #[test]
    fn generated_ids_are_unique_and_roundtrip_through_text() {
        let ids: HashSet<ObjectId> = (0..256).map(|_| ObjectId::new()).collect();
        assert_eq!(ids.len(), 256);

        let id = ObjectId::new();
        assert_eq!(id.to_string().parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn timestamp_saturates_past_the_32_bit_range() {
        assert_eq!(timestamp_field(1_700_000_000), 1_700_000_000);
        assert_eq!(timestamp_field(u64::from(u32::MAX)), u32::MAX);
        assert_eq!(timestamp_field(u64::from(u32::MAX) + 1), u32::MAX);
        assert_eq!(timestamp_field(u64::MAX), u32::MAX);
    }
}
