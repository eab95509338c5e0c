//! Nullifiers
//!
//! ```text
//! signature = H(H(sk, sk), H(commitment, index))
//! Nullifier = H(H(commitment, commitment), H(index, signature))
//! ```
//!
//! Once a nullifier is published, the corresponding note cannot be spent again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::field::{self, Field, poseidon2};

/// A nullifier, the public spend tag of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nullifier(#[serde(with = "crate::field::serde_decimal")] pub Field);

impl Nullifier {
    /// Derive from a commitment, its tree index and the owner's signature over both.
    pub fn derive(commitment: &Commitment, index: u64, signature: Field) -> Self {
        let c = commitment.to_field();
        Self(poseidon2(
            poseidon2(c, c),
            poseidon2(Field::from(index), signature),
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

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
