//! Shared type definitions for the wagering engine
//!
//! Canonical identity, request and entropy types used by every game.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// 32-byte account identity (wallet address / public key hash)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    /// Address filled with a single byte, handy for fixtures
    pub fn from_byte(byte: u8) -> Self {
        Address([byte; 32])
    }

    /// Parse a hex string (with or without `0x` prefix)
    pub fn from_hex(value: &str) -> Result<Self, String> {
        let trimmed = value.strip_prefix("0x").unwrap_or(value);
        let bytes = hex::decode(trimmed).map_err(|e| format!("Invalid address hex: {}", e))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "Address must be 32 bytes".to_string())?;
        Ok(Address(array))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Identifier of a randomness request, unique within the strategy that minted it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque 256-bit unsigned value delivered by a randomness source (big-endian)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Entropy(pub [u8; 32]);

impl Entropy {
    /// Outcome index for one play: `SHA-256(entropy || play) mod space`
    pub fn derive_index(&self, play: u32, space: u128) -> u128 {
        if space == 0 {
            return 0;
        }
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(play.to_be_bytes());
        let digest = hasher.finalize();

        let mut head = [0u8; 16];
        head.copy_from_slice(&digest[..16]);
        u128::from_be_bytes(head) % space
    }

    /// Low 32 bits of the raw value
    pub fn low_u32(&self) -> u32 {
        let mut tail = [0u8; 4];
        tail.copy_from_slice(&self.0[28..]);
        u32::from_be_bytes(tail)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<u64> for Entropy {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Entropy(bytes)
    }
}

impl From<u128> for Entropy {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Entropy(bytes)
    }
}

impl From<[u8; 32]> for Entropy {
    fn from(bytes: [u8; 32]) -> Self {
        Entropy(bytes)
    }
}

/// Caller identity and ledger position of the transaction being executed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxContext {
    pub caller: Address,
    pub block_number: u64,
    pub block_hash: [u8; 32],
}

impl TxContext {
    pub fn new(caller: Address, block_number: u64) -> Self {
        Self {
            caller,
            block_number,
            block_hash: synthetic_block_hash(block_number),
        }
    }

    pub fn with_block_hash(mut self, block_hash: [u8; 32]) -> Self {
        self.block_hash = block_hash;
        self
    }
}

/// Deterministic stand-in hash for hosts that only track block numbers
pub fn synthetic_block_hash(block_number: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"block:");
    hasher.update(block_number.to_be_bytes());
    hasher.finalize().into()
}

/// Serde helpers carrying `u128` amounts as decimal strings.
///
/// TOML has no 128-bit integers, and JSON consumers lose precision above 2^53.
pub mod amount_str {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.trim().replace('_', "").parse().map_err(de::Error::custom),
            Raw::Number(number) => Ok(number as u128),
        }
    }
}

/// `amount_str` for sequences of amounts
pub mod amounts_str {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[u128], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| v.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u128>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| s.parse::<u128>().map_err(de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let address = Address::from_byte(0xab);
        let parsed = Address::from_hex(&address.to_string()).expect("valid hex");
        assert_eq!(parsed, address);
        assert!(Address::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_entropy_index_is_deterministic_and_bounded() {
        let entropy = Entropy::from(42u64);
        for play in 0..20 {
            let first = entropy.derive_index(play, 37);
            assert_eq!(first, entropy.derive_index(play, 37));
            assert!(first < 37);
        }
        assert_ne!(
            (0..8).map(|p| entropy.derive_index(p, 1_000_000)).collect::<Vec<_>>(),
            vec![entropy.derive_index(0, 1_000_000); 8]
        );
    }

    #[test]
    fn test_entropy_low_bits() {
        assert_eq!(Entropy::from(0x1_0000_0007u64).low_u32(), 7);
    }

    #[test]
    fn test_amount_str_accepts_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(with = "amount_str")]
            value: u128,
        }

        let text: Holder = serde_json::from_str(r#"{"value":"340282366920938463463374607431768211455"}"#).unwrap();
        assert_eq!(text.value, u128::MAX);
        let number: Holder = serde_json::from_str(r#"{"value":1000}"#).unwrap();
        assert_eq!(number.value, 1000);
    }
}
