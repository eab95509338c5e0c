//! Note Commitments
//!
//! ```text
//! Commitment = H(H(amount, amount), H(owner_pk, blinding))
//! ```
//!
//! Hides the note contents while binding amount, owner and blinding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{self, Field, poseidon2};

/// A note commitment, the leaf value of the commitment tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(#[serde(with = "crate::field::serde_decimal")] pub Field);

impl Commitment {
    /// Commit to a note's contents.
    pub fn compute(amount: Field, owner_pk: Field, blinding: Field) -> Self {
        Self(poseidon2(
            poseidon2(amount, amount),
            poseidon2(owner_pk, blinding),
        ))
    }

    pub fn from_field(f: Field) -> Self {
        Self(f)
    }

    pub fn to_field(&self) -> Field {
        self.0
    }

    pub fn to_hex(&self) -> String {
        field::to_hex(&self.0)
    }
}

impl From<Field> for Commitment {
    fn from(f: Field) -> Self {
        Self(f)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_deterministic() {
        let c1 = Commitment::compute(Field::from(1000u64), Field::from(7u64), Field::from(42u64));
        let c2 = Commitment::compute(Field::from(1000u64), Field::from(7u64), Field::from(42u64));
        assert_eq!(c1, c2, "same inputs should produce same commitment");
    }

    #[test]
    fn test_commitment_hiding() {
        let c1 = Commitment::compute(Field::from(1000u64), Field::from(7u64), Field::from(1u64));
        let c2 = Commitment::compute(Field::from(1000u64), Field::from(7u64), Field::from(2u64));
        assert_ne!(c1, c2, "different blinding should produce different commitments");
    }

    #[test]
    fn test_commitment_binding() {
        let c1 = Commitment::compute(Field::from(1000u64), Field::from(7u64), Field::from(42u64));
        let c2 = Commitment::compute(Field::from(2000u64), Field::from(7u64), Field::from(42u64));
        let c3 = Commitment::compute(Field::from(1000u64), Field::from(8u64), Field::from(42u64));
        assert_ne!(c1, c2, "different amounts should produce different commitments");
        assert_ne!(c1, c3, "different owners should produce different commitments");
    }

    #[test]
    fn test_serializes_as_decimal() {
        let c = Commitment::from_field(Field::from(12345u64));
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"12345\"");
        let back: Commitment = serde_json::from_str("\"0x3039\"").unwrap();
        assert_eq!(back, c);
    }
}
