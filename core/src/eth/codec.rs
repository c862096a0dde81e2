//! Hex-encoded scalar types following Ethereum's wire conventions.
//!
//! Quantities (`HexU64`, `HexBig`) marshal as minimal-width `0x`-prefixed
//! lowercase hex; unformatted data (`HexBytes`) marshals as `0x` plus two
//! hex digits per byte. Decoding tolerates odd-length input by
//! front-padding a single `0` nibble.

use ethers_core::{types::U256, utils::hex};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Decodes a `0x`-prefixed hex string into raw bytes.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    if stripped.len() % 2 != 0 {
        hex::decode(format!("0{stripped}"))
    } else {
        hex::decode(stripped)
    }
}

/// Encodes raw bytes as a `0x`-prefixed lowercase hex string.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// A 64-bit quantity, `"0x10"` on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexU64(pub u64);

impl HexU64 {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for HexU64 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<HexU64> for u64 {
    fn from(value: HexU64) -> Self {
        value.0
    }
}

impl fmt::Display for HexU64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Serialize for HexU64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexU64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let digits = raw.strip_prefix("0x").unwrap_or(&raw);
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|err| de::Error::custom(format!("invalid hex quantity {raw:?}: {err}")))
    }
}

/// An arbitrary-precision unsigned quantity, `"0x1a2b..."` on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexBig(pub U256);

impl From<U256> for HexBig {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<HexBig> for U256 {
    fn from(value: HexBig) -> Self {
        value.0
    }
}

impl fmt::Display for HexBig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Serialize for HexBig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexBig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let bytes = decode_hex(&raw)
            .map_err(|err| de::Error::custom(format!("invalid hex quantity {raw:?}: {err}")))?;
        if bytes.len() > 32 {
            return Err(de::Error::custom(format!("quantity {raw:?} exceeds 256 bits")));
        }
        Ok(Self(U256::from_big_endian(&bytes)))
    }
}

/// Unformatted byte data, `"0x0102..."` on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex(&self.0))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        decode_hex(&raw)
            .map(Self)
            .map_err(|err| de::Error::custom(format!("invalid hex data {raw:?}: {err}")))
    }
}
