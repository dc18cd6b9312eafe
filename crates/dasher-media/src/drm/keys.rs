//! Key identifiers, content keys and initialization vectors.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{Error, Result};

/// Configuration value that asks for freshly generated material.
pub const GENERATE: &str = "rng";

fn decode_hex(value: &str, what: &str) -> Result<Vec<u8>> {
    let cleaned: String = value
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| *c != '-')
        .collect();
    hex::decode(&cleaned).map_err(|e| Error::invalid_key(format!("{} '{}': {}", what, value, e)))
}

fn decode_16(value: &str, what: &str) -> Result<[u8; 16]> {
    let bytes = decode_hex(value, what)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::invalid_key(format!("{} must be 16 bytes, got {}", what, bytes.len())))
}

/// 16-byte key identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; 16]);

impl KeyId {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generate a random key id.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Parse hex (dashes allowed) or generate when `value` is `rng`.
    pub fn parse_or_generate(value: &str) -> Result<Self> {
        if value.trim().eq_ignore_ascii_case(GENERATE) {
            Ok(Self::random())
        } else {
            value.parse()
        }
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Plain lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hyphenated UUID text, as used by `cenc:default_KID`.
    pub fn to_uuid_string(&self) -> String {
        Uuid::from_bytes(self.0).hyphenated().to_string()
    }

    /// Little-endian GUID byte order used by PlayReady.
    pub fn to_guid_bytes(&self) -> [u8; 16] {
        Uuid::from_bytes(self.0).to_bytes_le()
    }
}

impl FromStr for KeyId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode_16(s, "key id").map(Self)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.to_uuid_string())
    }
}

/// 16-byte AES content key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ContentKey([u8; 16]);

impl ContentKey {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn parse_or_generate(value: &str) -> Result<Self> {
        if value.trim().eq_ignore_ascii_case(GENERATE) {
            Ok(Self::random())
        } else {
            value.parse()
        }
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for ContentKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode_16(s, "content key").map(Self)
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// Initialization vector, 8 or 16 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iv(Vec<u8>);

impl Iv {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        match bytes.len() {
            8 | 16 => Ok(Self(bytes)),
            n => Err(Error::invalid_key(format!("iv must be 8 or 16 bytes, got {}", n))),
        }
    }

    /// Random 16-byte IV.
    pub fn random() -> Self {
        Self(rand::random::<[u8; 16]>().to_vec())
    }

    pub fn parse_or_generate(value: &str) -> Result<Self> {
        if value.trim().eq_ignore_ascii_case(GENERATE) {
            Ok(Self::random())
        } else {
            value.parse()
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl FromStr for Iv {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bytes(decode_hex(s, "iv")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KID: &str = "43215678-1234-1234-1234-123412341234";

    #[test]
    fn test_key_id_forms() {
        let kid: KeyId = KID.parse().unwrap();
        assert_eq!(kid.to_hex(), "43215678123412341234123412341234");
        assert_eq!(kid.to_uuid_string(), KID);
        assert_eq!(
            hex::encode(kid.to_guid_bytes()),
            "78562143341234121234123412341234"
        );
    }

    #[test]
    fn test_parse_or_generate() {
        let a = KeyId::parse_or_generate("rng").unwrap();
        let b = KeyId::parse_or_generate("RNG").unwrap();
        assert_ne!(a, b);

        let key = ContentKey::parse_or_generate("0x12341234123412341234123412341234").unwrap();
        assert_eq!(key.to_hex(), "12341234123412341234123412341234");
        assert_eq!(format!("{:?}", key), "ContentKey(..)");
    }

    #[test]
    fn test_invalid_material() {
        assert!("1234".parse::<KeyId>().is_err());
        assert!("zz215678123412341234123412341234".parse::<ContentKey>().is_err());
        assert!("0011223344".parse::<Iv>().is_err());
        assert_eq!("0011223344556677".parse::<Iv>().unwrap().len(), 8);
        assert_eq!(Iv::random().len(), 16);
    }
}
