//! # Identifier Newtypes — Token Ids and Addresses
//!
//! `TokenId` is a 256-bit unsigned integer naming the subject whose claims
//! are committed. `Address` is the 20-byte account that controls it. The
//! two are distinct types so a token id can never be checked against the
//! ownership oracle as if it were an address, or vice versa.
//!
//! ## Textual Forms
//!
//! - `TokenId` parses from decimal or `0x`-hex and renders as decimal,
//!   the canonical form of a `uint256`.
//! - `Address` parses from `0x`-hex. All-lowercase and all-uppercase input
//!   is accepted as-is; mixed case must carry a valid EIP-55 checksum.
//!   Rendering is always EIP-55 checksummed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::keccak256;
use crate::error::ParseError;

/// A 256-bit token identifier, stored big-endian.
///
/// `Ord` on the big-endian bytes is numeric order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TokenId(pub [u8; 32]);

impl TokenId {
    /// Wrap big-endian bytes.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the big-endian bytes.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Derive the token id the reference client assigns to an owner:
    /// `keccak256(address)` read as a big-endian integer.
    pub fn from_owner(owner: &Address) -> Self {
        Self(keccak256(owner.as_bytes()).0)
    }

    /// Render as `0x`-prefixed, zero-padded 64-digit hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse `0x`-prefixed hex of at most 64 digits.
    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        let digits = crate::strip_hex_prefix(s.trim());
        if digits.is_empty() {
            return Err(ParseError::Empty("token id"));
        }
        if digits.len() > 64 {
            return Err(ParseError::Overflow);
        }
        let padded = format!("{digits:0>64}");
        let bytes = crate::decode_hex("token id", &padded)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    /// Parse a base-10 integer.
    pub fn from_dec(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty("token id"));
        }
        let mut out = [0u8; 32];
        for c in s.chars() {
            let d = c.to_digit(10).ok_or(ParseError::InvalidDigit(c))?;
            let mut carry = d;
            for byte in out.iter_mut().rev() {
                let v = u32::from(*byte) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            if carry != 0 {
                return Err(ParseError::Overflow);
            }
        }
        Ok(Self(out))
    }

    /// Render as a base-10 integer.
    pub fn to_dec(&self) -> String {
        let mut n = self.0;
        let mut digits = Vec::new();
        while n.iter().any(|b| *b != 0) {
            let mut rem = 0u32;
            for byte in n.iter_mut() {
                let cur = (rem << 8) | u32::from(*byte);
                *byte = (cur / 10) as u8;
                rem = cur % 10;
            }
            digits.push(b'0' + rem as u8);
        }
        if digits.is_empty() {
            return "0".to_string();
        }
        digits.reverse();
        String::from_utf8_lossy(&digits).into_owned()
    }
}

impl From<u64> for TokenId {
    fn from(v: u64) -> Self {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&v.to_be_bytes());
        Self(out)
    }
}

impl FromStr for TokenId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.starts_with("0x") || t.starts_with("0X") {
            Self::from_hex(t)
        } else {
            Self::from_dec(t)
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dec())
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.to_hex())
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_dec())
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Render with an EIP-55 mixed-case checksum.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash.0[i / 2] >> 4
            } else {
                hash.0[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Parse `0x`-prefixed (or bare) hex, enforcing EIP-55 on mixed case.
    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        let bytes = crate::decode_hex("address", s)?;
        let arr: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseError::InvalidLength {
                kind: "address",
                expected: 20,
                actual: bytes.len(),
            })?;
        let addr = Self(arr);

        let digits = crate::strip_hex_prefix(s);
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower && addr.to_checksum()[2..] != *digits {
            return Err(ParseError::BadChecksum);
        }
        Ok(addr)
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
