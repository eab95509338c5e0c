//! Note Encryption
//!
//! Curve25519 public-key authenticated encryption of note payloads, in the
//! NaCl `box` construction (x25519-xsalsa20-poly1305).
//!
//! ```text
//! Flow:
//! 1. Sender generates ephemeral keypair (epk, esk)
//! 2. Ciphertext = box(plaintext, nonce, recipient_pk, esk)
//! 3. Recipient opens with box_open(ciphertext, nonce, epk, sk)
//!
//! Wire format (hex, 0x-prefixed):
//!   nonce (24) || epk (32) || ciphertext (n + 16)
//! ```

use crypto_box::aead::Aead;
use crypto_box::aead::generic_array::GenericArray;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::{CryptoRng, RngCore};

use crate::error::PrivacyError;

pub const NONCE_LEN: usize = 24;
pub const EPHEMERAL_KEY_LEN: usize = 32;
pub const TAG_LEN: usize = 16;

/// Smallest packed message: header plus an empty ciphertext's tag.
pub const MIN_PACKED_LEN: usize = NONCE_LEN + EPHEMERAL_KEY_LEN + TAG_LEN;

/// An encrypted message as published on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    pub nonce: [u8; NONCE_LEN],
    pub ephemeral_pk: [u8; EPHEMERAL_KEY_LEN],
    /// Boxed plaintext, Poly1305 tag included
    pub ciphertext: Vec<u8>,
}

impl EncryptedMessage {
    /// Pack into the `0x`-prefixed hex wire format.
    pub fn pack(&self) -> String {
        let mut bytes = Vec::with_capacity(NONCE_LEN + EPHEMERAL_KEY_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ephemeral_pk);
        bytes.extend_from_slice(&self.ciphertext);
        format!("0x{}", hex::encode(bytes))
    }

    /// Parse the hex wire format.
    pub fn unpack(packed: &str) -> Result<Self, PrivacyError> {
        let digits = packed.strip_prefix("0x").unwrap_or(packed);
        let bytes = hex::decode(digits).map_err(|e| PrivacyError::InvalidHex(e.to_string()))?;
        if bytes.len() < MIN_PACKED_LEN {
            return Err(PrivacyError::DecryptionFailed);
        }

        let (nonce, rest) = bytes.split_at(NONCE_LEN);
        let (ephemeral_pk, ciphertext) = rest.split_at(EPHEMERAL_KEY_LEN);

        Ok(Self {
            nonce: nonce.try_into().map_err(|_| PrivacyError::DecryptionFailed)?,
            ephemeral_pk: ephemeral_pk
                .try_into()
                .map_err(|_| PrivacyError::DecryptionFailed)?,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Box `plaintext` to the holder of `recipient_pk` from a fresh ephemeral key.
pub fn seal<R: RngCore + CryptoRng>(
    recipient_pk: &[u8; 32],
    plaintext: &[u8],
    rng: &mut R,
) -> Result<EncryptedMessage, PrivacyError> {
    let mut ephemeral = [0u8; 32];
    rng.fill_bytes(&mut ephemeral);
    let ephemeral_secret = SecretKey::from(ephemeral);
    let ephemeral_pk = ephemeral_secret.public_key();

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let ciphertext = SalsaBox::new(&PublicKey::from(*recipient_pk), &ephemeral_secret)
        .encrypt(GenericArray::from_slice(&nonce), plaintext)
        .map_err(|_| PrivacyError::EncryptionFailed)?;

    Ok(EncryptedMessage {
        nonce,
        ephemeral_pk: *ephemeral_pk.as_bytes(),
        ciphertext,
    })
}

/// Open with the recipient's 32-byte X25519 secret.
///
/// Any authentication failure, wrong key included, surfaces as `DecryptionFailed`.
pub fn open(message: &EncryptedMessage, secret: &[u8; 32]) -> Result<Vec<u8>, PrivacyError> {
    SalsaBox::new(&PublicKey::from(message.ephemeral_pk), &SecretKey::from(*secret))
        .decrypt(
            GenericArray::from_slice(&message.nonce),
            message.ciphertext.as_slice(),
        )
        .map_err(|_| PrivacyError::DecryptionFailed)
}
