//! # Addresses
//!
//! A 20-byte root-chain address, canonicalized to its EIP-55 checksummed
//! form. Every ingestion path (channel messages, chain logs, configuration)
//! normalizes through [`Address::parse`]; equality and map ordering use the
//! raw bytes, so two spellings of the same address always collide.

use primitive_types::H160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Malformed address input, rejected at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Address string did not start with `0x`.
    #[error("bad address {0:?}: missing 0x prefix")]
    MissingPrefix(String),

    /// Address hex was not exactly 40 characters.
    #[error("bad address {input:?}: expected 40 hex chars, got {got}")]
    BadLength { input: String, got: usize },

    /// Address contained non-hex characters.
    #[error("bad address {0:?}: invalid hex")]
    BadHex(String),

    /// Mixed-case address failed its EIP-55 checksum.
    #[error("bad address {0:?}: checksum mismatch")]
    BadChecksum(String),
}

/// A canonicalized 20-byte address.
///
/// Ordering is lexicographic on the raw bytes, which is what makes
/// `BTreeMap<Address, Member>` iteration deterministic across runs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(H160);

impl Address {
    /// Wrap raw bytes without any validation.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(H160(bytes))
    }

    /// Parse and canonicalize a `0x`-prefixed hex address.
    ///
    /// All-lowercase and all-uppercase spellings are accepted; mixed-case
    /// input must carry a valid EIP-55 checksum.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let hex_part = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or_else(|| AddressError::MissingPrefix(input.to_string()))?;

        if hex_part.len() != 40 {
            return Err(AddressError::BadLength {
                input: input.to_string(),
                got: hex_part.len(),
            });
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|_| AddressError::BadHex(input.to_string()))?;
        let addr = Address(H160(bytes));

        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower && addr.checksummed()[2..] != *hex_part {
            return Err(AddressError::BadChecksum(input.to_string()));
        }

        Ok(addr)
    }

    /// Raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0 .0
    }

    /// The `0x`-prefixed lowercase 42-char form used in leaf hashing.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0 .0))
    }

    /// The EIP-55 checksummed form: hex chars whose keccak nibble is >= 8
    /// are uppercased.
    pub fn checksummed(&self) -> String {
        let lower = hex::encode(self.0 .0);
        let digest = Keccak256::digest(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                digest[i / 2] >> 4
            } else {
                digest[i / 2] & 0x0F
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.checksummed())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.checksummed())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.checksummed())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}
