//! Shielded Notes
//!
//! A Note represents value held privately in the shielded pool.
//!
//! ```text
//! Note = {
//!     amount: u128,          // Amount in the smallest unit
//!     blinding: Field,       // Random hiding factor
//!     owner: Keypair,        // Whose public key the commitment binds
//!     index: Option<u64>,    // Position in the commitment tree (set once published)
//! }
//!
//! Payload (before encryption) = amount (31 bytes BE) || blinding (31 bytes BE)
//! ```

use std::fmt;

use ark_ff::Zero;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::error::PrivacyError;
use crate::field::{self, Field, RANDOM_BYTES};
use crate::keypair::Keypair;
use crate::nullifier::Nullifier;

/// Plaintext note payload length.
pub const PAYLOAD_LEN: usize = 2 * RANDOM_BYTES;

/// Note value with overflow protection
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NoteValue(pub u128);

impl NoteValue {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    pub fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn to_field(&self) -> Field {
        Field::from(self.0)
    }

    /// Checked addition
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Checked sum of a sequence of values.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(values: I) -> Option<Self> {
        values
            .into_iter()
            .try_fold(Self::ZERO, |acc, v| acc.checked_add(v))
    }
}

impl From<u128> for NoteValue {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for NoteValue {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl fmt::Display for NoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A shielded note representing privately held value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    amount: NoteValue,
    blinding: Field,
    owner: Keypair,
    index: Option<u64>,
    commitment: Commitment,
}

impl Note {
    /// Create a note with a fresh random blinding factor
    pub fn new<R: RngCore + ?Sized>(amount: NoteValue, owner: Keypair, rng: &mut R) -> Self {
        let blinding = field::random_field(rng);
        Self::with_blinding(amount, blinding, owner)
    }

    /// Create a note with explicit blinding (for recovery)
    pub fn with_blinding(amount: NoteValue, blinding: Field, owner: Keypair) -> Self {
        let commitment =
            Commitment::compute(amount.to_field(), owner.public_key(), blinding);
        Self {
            amount,
            blinding,
            owner,
            index: None,
            commitment,
        }
    }

    /// Zero-amount note owned by a fresh throwaway keypair, used for padding.
    pub fn zero<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let owner = Keypair::generate(rng);
        Self::new(NoteValue::ZERO, owner, rng)
    }

    /// Set the tree position (once the commitment is published)
    pub fn with_index(mut self, index: u64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn amount(&self) -> NoteValue {
        self.amount
    }

    pub fn blinding(&self) -> Field {
        self.blinding
    }

    pub fn owner(&self) -> &Keypair {
        &self.owner
    }

    pub fn index(&self) -> Option<u64> {
        self.index
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    /// Derive the nullifier for spending this note.
    ///
    /// Non-zero notes need both the tree index and the owner's spending key.
    /// Zero-amount notes fall back to index 0 and signature 0 for whatever is missing.
    pub fn nullifier(&self) -> Result<Nullifier, PrivacyError> {
        if !self.amount.is_zero() && (self.index.is_none() || self.owner.is_read_only()) {
            return Err(PrivacyError::MissingIndexOrKey);
        }

        let index = self.index.unwrap_or(0);
        let signature = if self.owner.is_read_only() {
            Field::zero()
        } else {
            self.owner.sign(self.commitment.to_field(), index)?
        };

        Ok(Nullifier::derive(&self.commitment, index, signature))
    }

    /// `amount || blinding`, 31 bytes each, big-endian.
    pub fn payload(&self) -> Result<[u8; PAYLOAD_LEN], PrivacyError> {
        let amount = field::to_be_bytes_fixed(&self.amount.to_field(), RANDOM_BYTES)?;
        let blinding = field::to_be_bytes_fixed(&self.blinding, RANDOM_BYTES)?;

        let mut out = [0u8; PAYLOAD_LEN];
        out[..RANDOM_BYTES].copy_from_slice(&amount);
        out[RANDOM_BYTES..].copy_from_slice(&blinding);
        Ok(out)
    }

    /// Encrypt the payload to the owner; returns the packed wire form.
    pub fn encrypted_payload<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<String, PrivacyError> {
        self.owner.encrypt(&self.payload()?, rng)
    }

    /// Decrypt a packed payload addressed to `keypair` and rebuild the note at `index`.
    pub fn decrypt(keypair: &Keypair, packed: &str, index: u64) -> Result<Self, PrivacyError> {
        let bytes = keypair.decrypt(packed)?;
        if bytes.len() != PAYLOAD_LEN {
            return Err(PrivacyError::MalformedPayload(format!(
                "expected {PAYLOAD_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let (amount, blinding) = bytes.split_at(RANDOM_BYTES);
        let high = RANDOM_BYTES - 16;
        if amount[..high].iter().any(|b| *b != 0) {
            return Err(PrivacyError::MalformedPayload(
                "amount exceeds 128 bits".into(),
            ));
        }
        let mut amount_bytes = [0u8; 16];
        amount_bytes.copy_from_slice(&amount[high..]);

        Ok(Self::with_blinding(
            NoteValue(u128::from_be_bytes(amount_bytes)),
            field::from_be_bytes(blinding),
            keypair.clone(),
        )
        .with_index(index))
    }

    /// Like [`Note::decrypt`], but "not mine" is `None` rather than an error.
    pub fn try_decrypt(keypair: &Keypair, packed: &str, index: u64) -> Option<Self> {
        Self::decrypt(keypair, packed, index).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_note_commitment() {
        let owner = Keypair::generate(&mut OsRng);
        let blinding = Field::from(77u64);
        let a = Note::with_blinding(NoteValue(1000), blinding, owner.clone());
        let b = Note::with_blinding(NoteValue(1000), blinding, owner.clone());

        assert_eq!(a.commitment(), b.commitment(), "commitment should be deterministic");
        assert_eq!(
            a.commitment(),
            Commitment::compute(Field::from(1000u64), owner.public_key(), blinding)
        );
    }

    #[test]
    fn test_note_nullifier_requires_index() {
        let owner = Keypair::generate(&mut OsRng);
        let note = Note::new(NoteValue(1000), owner, &mut OsRng);

        assert_eq!(note.nullifier(), Err(PrivacyError::MissingIndexOrKey));

        let note = note.with_index(42);
        assert!(note.nullifier().is_ok());
        assert_eq!(note.nullifier().unwrap(), note.nullifier().unwrap());
    }

    #[test]
    fn test_note_nullifier_requires_key() {
        let owner = Keypair::generate(&mut OsRng);
        let public = Keypair::from_public_string(&owner.address()).unwrap();
        let note = Note::new(NoteValue(5), public, &mut OsRng).with_index(3);
        assert_eq!(note.nullifier(), Err(PrivacyError::MissingIndexOrKey));
    }

    #[test]
    fn test_zero_note_nullifier_fallback() {
        let note = Note::zero(&mut OsRng);
        assert!(note.index().is_none());
        let nullifier = note.nullifier().unwrap();
        let sig = note.owner().sign(note.commitment().to_field(), 0).unwrap();
        assert_eq!(nullifier, Nullifier::derive(&note.commitment(), 0, sig));

        let owner = Keypair::generate(&mut OsRng);
        let public = Keypair::from_public_string(&owner.address()).unwrap();
        let read_only = Note::new(NoteValue::ZERO, public, &mut OsRng);
        assert_eq!(
            read_only.nullifier().unwrap(),
            Nullifier::derive(&read_only.commitment(), 0, Field::zero())
        );
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let owner = Keypair::generate(&mut OsRng);
        let blinding = Field::from(123456789u64);
        let note = Note::with_blinding(NoteValue(100), blinding, owner.clone());

        let packed = note.encrypted_payload(&mut OsRng).unwrap();
        let decrypted = Note::decrypt(&owner, &packed, 5).unwrap();

        assert_eq!(decrypted.amount(), NoteValue(100));
        assert_eq!(decrypted.blinding(), blinding);
        assert_eq!(decrypted.index(), Some(5));
        assert_eq!(decrypted.commitment(), note.commitment());
    }

    #[test]
    fn test_try_decrypt_wrong_keypair() {
        let owner = Keypair::generate(&mut OsRng);
        let stranger = Keypair::generate(&mut OsRng);
        let note = Note::new(NoteValue(1), owner, &mut OsRng);
        let packed = note.encrypted_payload(&mut OsRng).unwrap();

        assert!(Note::try_decrypt(&stranger, &packed, 0).is_none());
        assert_eq!(
            Note::decrypt(&stranger, &packed, 0),
            Err(PrivacyError::DecryptionFailed)
        );
    }

    #[test]
    fn test_payload_layout() {
        let owner = Keypair::generate(&mut OsRng);
        let note = Note::with_blinding(NoteValue(0x0102), Field::from(0x0304u64), owner);
        let payload = note.payload().unwrap();

        assert_eq!(payload.len(), 62);
        assert_eq!(&payload[29..31], &[0x01, 0x02]);
        assert_eq!(&payload[60..62], &[0x03, 0x04]);
        assert!(payload[..29].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_wide_blinding_rejected() {
        let owner = Keypair::generate(&mut OsRng);
        let note = Note::with_blinding(NoteValue(1), -Field::from(1u64), owner);
        assert_eq!(
            note.payload(),
            Err(PrivacyError::ValueTooWide { bytes: RANDOM_BYTES })
        );
    }

    #[test]
    fn test_malformed_payload() {
        let owner = Keypair::generate(&mut OsRng);

        let short = owner.encrypt(&[1u8; 10], &mut OsRng).unwrap();
        assert!(matches!(
            Note::decrypt(&owner, &short, 0),
            Err(PrivacyError::MalformedPayload(_))
        ));

        let mut wide = [0u8; PAYLOAD_LEN];
        wide[0] = 1;
        let wide = owner.encrypt(&wide, &mut OsRng).unwrap();
        assert!(matches!(
            Note::decrypt(&owner, &wide, 0),
            Err(PrivacyError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_note_value_checked_ops() {
        let v1 = NoteValue::new(100);
        let v2 = NoteValue::new(50);

        assert_eq!(v1.checked_add(v2), Some(NoteValue::new(150)));
        assert_eq!(v1.checked_sub(v2), Some(NoteValue::new(50)));
        assert_eq!(v2.checked_sub(v1), None); // Underflow
        assert_eq!(NoteValue::MAX.checked_add(NoteValue::new(1)), None); // Overflow
        assert_eq!(NoteValue::checked_sum([v1, v2, v2]), Some(NoteValue::new(200)));
        assert_eq!(NoteValue::checked_sum([NoteValue::MAX, v1]), None);
    }
}
