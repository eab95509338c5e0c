//! Ledger field elements.
//!
//! ```text
//! felt  < 2^251 + 17 * 2^192 + 1
//! u256  = (low: felt < 2^128, high: felt < 2^128)
//! ```
//!
//! Protocol values (commitments, nullifiers, hashes) live in the BN254 field,
//! which is wider than a felt, so they cross the ledger boundary as u256 pairs.

use std::fmt;
use std::str::FromStr;

use obscura_privacy::field::{self, Field};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use sha3::{Digest, Keccak256};
use starknet_types_core::felt::Felt as StarkFelt;

use crate::error::LedgerError;

/// Big-endian bytes of the ledger's prime.
const PRIME: [u8; 32] = [
    0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
];

/// A ledger field element, stored big-endian.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Felt([u8; 32]);

impl Felt {
    pub const ZERO: Self = Self([0u8; 32]);
    pub const ONE: Self = {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        Self(bytes)
    };

    /// From up to 32 big-endian bytes; fails at or above the prime.
    pub fn from_bytes_be(bytes: &[u8]) -> Result<Self, LedgerError> {
        if bytes.len() > 32 {
            return Err(LedgerError::InvalidFelt(format!("{} bytes", bytes.len())));
        }
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(bytes);
        if out >= PRIME {
            return Err(LedgerError::InvalidFelt(format!("0x{}", hex::encode(out))));
        }
        Ok(Self(out))
    }

    pub fn from_hex(s: &str) -> Result<Self, LedgerError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 64 {
            return Err(LedgerError::InvalidFelt(s.to_string()));
        }
        let padded = format!("{digits:0>64}");
        let bytes = hex::decode(padded).map_err(|_| LedgerError::InvalidFelt(s.to_string()))?;
        Self::from_bytes_be(&bytes)
    }

    /// Wrap bytes already known to be below the prime.
    pub(crate) fn from_raw(bytes: [u8; 32]) -> Self {
        debug_assert!(bytes < PRIME);
        Self(bytes)
    }

    /// Random felt below 2^248.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes[1..]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Minimal `0x` hex, as the RPC renders felts.
    pub fn to_hex(&self) -> String {
        let digits = hex::encode(self.0);
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{trimmed}")
        }
    }

    /// Zero-padded 64 digit hex.
    pub fn to_fixed_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn to_u64(&self) -> Result<u64, LedgerError> {
        if self.0[..24].iter().any(|b| *b != 0) {
            return Err(LedgerError::InvalidFelt(format!("{} exceeds u64", self.to_hex())));
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.0[24..]);
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn to_u128(&self) -> Result<u128, LedgerError> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return Err(LedgerError::InvalidFelt(format!("{} exceeds u128", self.to_hex())));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&self.0[16..]);
        Ok(u128::from_be_bytes(bytes))
    }

    /// Reduce into the protocol field.
    pub fn to_field(&self) -> Field {
        field::from_be_bytes(&self.0)
    }
}

impl From<u64> for Felt {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl From<u128> for Felt {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl From<bool> for Felt {
    fn from(value: bool) -> Self {
        if value { Self::ONE } else { Self::ZERO }
    }
}

impl FromStr for Felt {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Felt({})", self.to_hex())
    }
}

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Felt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

// ============================================================================
// u256
// ============================================================================

/// Split 32 big-endian bytes into `(low, high)` 128-bit limbs.
pub fn split_u256(bytes: &[u8; 32]) -> (Felt, Felt) {
    let mut low = [0u8; 32];
    let mut high = [0u8; 32];
    low[16..].copy_from_slice(&bytes[16..]);
    high[16..].copy_from_slice(&bytes[..16]);
    (Felt(low), Felt(high))
}

/// Rejoin `(low, high)` limbs; each must fit 128 bits.
pub fn join_u256(low: &Felt, high: &Felt) -> Result<[u8; 32], LedgerError> {
    let low = low.to_u128()?;
    let high = high.to_u128()?;
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&high.to_be_bytes());
    out[16..].copy_from_slice(&low.to_be_bytes());
    Ok(out)
}

/// A protocol field element as `[low, high]`.
pub fn field_to_u256(value: &Field) -> [Felt; 2] {
    let (low, high) = split_u256(&field::to_be_bytes(value));
    [low, high]
}

pub fn u256_to_field(low: &Felt, high: &Felt) -> Result<Field, LedgerError> {
    Ok(field::from_be_bytes(&join_u256(low, high)?))
}

// ============================================================================
// Selectors
// ============================================================================

/// Keccak-256 of `name`, masked to 250 bits.
///
/// Event keys and entry point selectors are both derived this way.
pub fn starknet_keccak(name: &[u8]) -> Felt {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&Keccak256::digest(name));
    bytes[0] &= 0x03;
    Felt(bytes)
}

/// Starknet Poseidon over a felt sequence, as the pool contract computes
/// `poseidon_hash_span`.
pub fn poseidon_hash_many(felts: &[Felt]) -> Felt {
    let inputs: Vec<StarkFelt> = felts
        .iter()
        .map(|f| StarkFelt::from_bytes_be(&f.0))
        .collect();
    Felt(starknet_crypto::poseidon_hash_many(inputs.as_slice()).to_bytes_be())
}
