//! Shielded Keypair
//!
//! ```text
//! spending_key   : 32 random bytes (secret)
//! public_key     = H(sk mod P, sk mod P)
//! encryption key = X25519(sk)
//! address        = hex32(public_key) || hex32(encryption public key)   (128 hex chars)
//! ```
//!
//! A keypair parsed from an address is read-only: it can receive notes
//! but cannot sign, decrypt or derive nullifiers.

use std::fmt;

use rand::{CryptoRng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::encryption::{self, EncryptedMessage};
use crate::error::PrivacyError;
use crate::field::{self, Field, poseidon2};

/// Length of the serialized public identity, in hex characters.
pub const PUBLIC_STRING_LEN: usize = 128;

const SEED_CONTEXT: &str = "obscura-spending-key-seed-v1";

/// Secret spending key.
///
/// Loss = loss of funds. Compromise = theft of funds.
#[derive(Clone, PartialEq, Eq)]
pub struct SpendingKey([u8; 32]);

impl SpendingKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The key reduced into the field, as it enters every hash.
    pub fn to_field(&self) -> Field {
        field::from_be_bytes(&self.0)
    }

    fn encryption_secret(&self) -> StaticSecret {
        StaticSecret::from(self.0)
    }
}

impl fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpendingKey(..)")
    }
}

/// A shielded identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    spending_key: Option<SpendingKey>,
    public_key: Field,
    encryption_key: [u8; 32],
}

impl Keypair {
    /// Fresh identity from a secure random source.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self::from_spending_key(SpendingKey::from_bytes(bytes))
    }

    /// Restore from a known spending key.
    pub fn from_spending_key(spending_key: SpendingKey) -> Self {
        let sk = spending_key.to_field();
        let public_key = poseidon2(sk, sk);
        let encryption_key = *PublicKey::from(&spending_key.encryption_secret()).as_bytes();

        Self {
            spending_key: Some(spending_key),
            public_key,
            encryption_key,
        }
    }

    /// Deterministic identity from an external seed, e.g. a wallet signature.
    ///
    /// Seeds up to 32 bytes are left-padded and used directly; longer seeds
    /// are compressed with a keyed BLAKE3.
    pub fn derive_from_seed(seed: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        if seed.len() <= 32 {
            bytes[32 - seed.len()..].copy_from_slice(seed);
        } else {
            bytes = blake3::derive_key(SEED_CONTEXT, seed);
        }
        Self::from_spending_key(SpendingKey::from_bytes(bytes))
    }

    /// Parse a shared address into a read-only keypair.
    pub fn from_public_string(s: &str) -> Result<Self, PrivacyError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != PUBLIC_STRING_LEN {
            return Err(PrivacyError::InvalidKeyLength {
                expected: PUBLIC_STRING_LEN,
                actual: digits.len(),
            });
        }

        let bytes = hex::decode(digits).map_err(|e| PrivacyError::InvalidHex(e.to_string()))?;
        let (public_key, encryption_key) = bytes.split_at(32);

        Ok(Self {
            spending_key: None,
            public_key: field::from_be_bytes(public_key),
            encryption_key: encryption_key
                .try_into()
                .map_err(|_| PrivacyError::InvalidHex("encryption key".into()))?,
        })
    }

    /// Serialized public identity for out-of-band sharing.
    pub fn to_public_string(&self) -> String {
        format!(
            "0x{}{}",
            hex::encode(field::to_be_bytes(&self.public_key)),
            hex::encode(self.encryption_key)
        )
    }

    /// Alias of [`Keypair::to_public_string`].
    pub fn address(&self) -> String {
        self.to_public_string()
    }

    pub fn public_key(&self) -> Field {
        self.public_key
    }

    pub fn encryption_key(&self) -> &[u8; 32] {
        &self.encryption_key
    }

    pub fn spending_key(&self) -> Option<&SpendingKey> {
        self.spending_key.as_ref()
    }

    /// Hex of the raw spending key, for key files.
    pub fn spending_key_hex(&self) -> Option<String> {
        self.spending_key
            .as_ref()
            .map(|sk| format!("0x{}", hex::encode(sk.as_bytes())))
    }

    pub fn is_read_only(&self) -> bool {
        self.spending_key.is_none()
    }

    /// `H(H(sk, sk), H(commitment, path_index))`
    pub fn sign(&self, commitment: Field, path_index: u64) -> Result<Field, PrivacyError> {
        let sk = self
            .spending_key
            .as_ref()
            .ok_or(PrivacyError::MissingSpendingKey)?
            .to_field();
        Ok(poseidon2(
            poseidon2(sk, sk),
            poseidon2(commitment, Field::from(path_index)),
        ))
    }

    /// Encrypt to this identity's encryption key; returns the packed wire form.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<String, PrivacyError> {
        Ok(encryption::seal(&self.encryption_key, plaintext, rng)?.pack())
    }

    pub fn decrypt(&self, packed: &str) -> Result<Vec<u8>, PrivacyError> {
        let spending_key = self
            .spending_key
            .as_ref()
            .ok_or(PrivacyError::MissingSpendingKey)?;
        let message = EncryptedMessage::unpack(packed)?;
        encryption::open(&message, spending_key.as_bytes())
    }
}
