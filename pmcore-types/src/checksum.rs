//! Package and metadata file checksums.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A supported checksum algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ChecksumKind {
    Sha1,
    Sha256,
    Sha512,
}

impl Display for ChecksumKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChecksumKind::Sha1 => "sha1",
            ChecksumKind::Sha256 => "sha256",
            ChecksumKind::Sha512 => "sha512",
        };
        write!(f, "{s}")
    }
}

/// A checksum: an algorithm id paired with the raw digest bytes.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Checksum {
    kind: ChecksumKind,
    #[serde(with = "hex_bytes")]
    digest: Vec<u8>,
}

impl Checksum {
    /// Creates a new checksum from an algorithm id and raw digest bytes.
    pub fn new(kind: ChecksumKind, digest: Vec<u8>) -> Self {
        Self { kind, digest }
    }

    /// Parses a checksum from a hex-encoded digest string.
    pub fn from_hex(kind: ChecksumKind, hex: &str) -> Result<Self, Error> {
        if hex.len() % 2 != 0 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidChecksum(hex.to_string()));
        }
        let digest = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| Error::InvalidChecksum(hex.to_string()))?;
        Ok(Self::new(kind, digest))
    }

    /// Returns the algorithm id.
    pub fn kind(&self) -> ChecksumKind {
        self.kind
    }

    /// Returns the raw digest bytes.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Returns the hex-encoded digest.
    pub fn to_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.to_hex())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        hex.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let hex = String::deserialize(deserializer)?;
        (0..hex.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex[i..i + 2], 16).map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hex() {
        let checksum = Checksum::from_hex(ChecksumKind::Sha256, "deadbeef").unwrap();
        assert_eq!(checksum.to_hex(), "deadbeef");
    }

    #[test]
    fn rejects_odd_length() {
        assert!(Checksum::from_hex(ChecksumKind::Sha1, "abc").is_err());
    }
}
