//! Field Arithmetic
//!
//! Every hash, amount and blinding factor in the protocol lives in the
//! BN254 scalar field.
//!
//! ```text
//! P = 21888242871839275222246405745257275088548364400416034343698204186575808495617
//! H(a, b) = Poseidon_circom(a, b)            (width 3, x^5, 8 full / 57 partial rounds)
//! hash_many([x0, x1, ..]) = H(.. H(H(0, H(x0, x1)), H(x2, x3)) ..)
//! ```

use ark_ff::{BigInteger, PrimeField, Zero};
use light_poseidon::{Poseidon, PoseidonHasher};
use num_bigint::BigUint;
use rand::RngCore;

use crate::error::PrivacyError;

/// The BN254 scalar field element used throughout the protocol.
pub use ark_bn254::Fr as Field;

/// Decimal form of the field modulus.
pub const FIELD_SIZE: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// Width in bytes of a serialized field element.
pub const FIELD_BYTES: usize = 32;

/// Number of random bytes drawn for a blinding factor; keeps it under the modulus.
pub const RANDOM_BYTES: usize = 31;

/// The field modulus as a big integer.
pub fn field_modulus() -> BigUint {
    BigUint::from_bytes_be(&Field::MODULUS.to_bytes_be())
}

/// Two-to-one Poseidon hash.
pub fn poseidon2(left: Field, right: Field) -> Field {
    // Width 3 circom parameters are bundled with the crate and always load.
    let mut poseidon = Poseidon::<Field>::new_circom(2).expect("width 3 parameters");
    poseidon
        .hash(&[left, right])
        .expect("two inputs match width 3")
}

/// Pairwise chained Poseidon over an arbitrary number of elements.
pub fn hash_many(items: &[Field]) -> Field {
    items.chunks(2).fold(Field::zero(), |acc, pair| {
        let right = pair.get(1).copied().unwrap_or_else(Field::zero);
        poseidon2(acc, poseidon2(pair[0], right))
    })
}

/// Sample a uniformly random element from 31 bytes of entropy.
pub fn random_field<R: RngCore + ?Sized>(rng: &mut R) -> Field {
    let mut bytes = [0u8; RANDOM_BYTES];
    rng.fill_bytes(&mut bytes);
    Field::from_be_bytes_mod_order(&bytes)
}

/// Reduce arbitrary big-endian bytes into the field.
pub fn from_be_bytes(bytes: &[u8]) -> Field {
    Field::from_be_bytes_mod_order(bytes)
}

/// Canonical 32-byte big-endian encoding.
pub fn to_be_bytes(value: &Field) -> [u8; FIELD_BYTES] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_BYTES];
    out[FIELD_BYTES - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Big-endian encoding truncated to `len` bytes.
///
/// Fails when the value needs more than `len` bytes.
pub fn to_be_bytes_fixed(value: &Field, len: usize) -> Result<Vec<u8>, PrivacyError> {
    let full = to_be_bytes(value);
    let cut = FIELD_BYTES.saturating_sub(len);
    if full[..cut].iter().any(|b| *b != 0) {
        return Err(PrivacyError::ValueTooWide { bytes: len });
    }
    let mut out = vec![0u8; len.saturating_sub(FIELD_BYTES)];
    out.extend_from_slice(&full[cut..]);
    Ok(out)
}

/// `0x`-prefixed, zero-padded 64 digit hex.
pub fn to_hex(value: &Field) -> String {
    format!("0x{}", hex::encode(to_be_bytes(value)))
}

/// Parse hex (with or without `0x`), reducing mod P.
pub fn from_hex(s: &str) -> Result<Field, PrivacyError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|e| PrivacyError::InvalidHex(e.to_string()))?;
    Ok(from_be_bytes(&bytes))
}

/// Decimal rendering, the form circuit witnesses expect.
pub fn to_decimal(value: &Field) -> String {
    BigUint::from(value.into_bigint()).to_string()
}

/// Parse a decimal string, reducing mod P.
pub fn from_decimal(s: &str) -> Result<Field, PrivacyError> {
    let n = BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or_else(|| PrivacyError::InvalidNumber(s.to_string()))?;
    Ok(from_be_bytes(&n.to_bytes_be()))
}

/// Serde adapter: field elements travel as decimal strings, `0x` hex is accepted on input.
pub mod serde_decimal {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::{Field, from_decimal, from_hex, to_decimal};

    pub fn serialize<S: Serializer>(value: &Field, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_decimal(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Field, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(D::Error::custom)
    }

    pub(crate) fn parse(s: &str) -> Result<Field, crate::error::PrivacyError> {
        if s.starts_with("0x") {
            from_hex(s)
        } else {
            from_decimal(s)
        }
    }

    /// Same encoding for sequences.
    pub mod vec {
        use serde::{Deserialize, Deserializer, Serializer, de::Error, ser::SerializeSeq};

        use super::super::{Field, to_decimal};

        pub fn serialize<S: Serializer>(values: &[Field], serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for value in values {
                seq.serialize_element(&to_decimal(value))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Field>, D::Error> {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|s| super::parse(s).map_err(D::Error::custom))
                .collect()
        }
    }

    /// Sequences of sequences, e.g. one Merkle path per input.
    pub mod nested {
        use serde::{Deserialize, Deserializer, Serializer, de::Error, ser::SerializeSeq};

        use super::super::{Field, to_decimal};

        pub fn serialize<S: Serializer>(
            values: &[Vec<Field>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for row in values {
                let row: Vec<String> = row.iter().map(to_decimal).collect();
                seq.serialize_element(&row)?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<Field>>, D::Error> {
            Vec::<Vec<String>>::deserialize(deserializer)?
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|s| super::parse(s).map_err(D::Error::custom))
                        .collect()
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;
    use rand::rngs::OsRng;

    #[test]
    fn test_modulus_matches_constant() {
        assert_eq!(field_modulus().to_string(), FIELD_SIZE);
    }

    #[test]
    fn test_poseidon_known_vector() {
        // circomlibjs: poseidon([1, 2])
        let result = poseidon2(Field::from(1u64), Field::from(2u64));
        assert_eq!(
            to_hex(&result),
            "0x115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a"
        );
    }

    #[test]
    fn test_hash_many_pads_odd_tail() {
        let a = Field::from(7u64);
        let b = Field::from(9u64);
        assert_eq!(hash_many(&[a]), hash_many(&[a, Field::zero()]));
        assert_ne!(hash_many(&[a]), hash_many(&[a, b]));
        assert_eq!(hash_many(&[]), Field::zero());
    }

    #[test]
    fn test_hex_and_decimal() {
        let x = Field::from(255u64);
        assert_eq!(
            to_hex(&x),
            "0x00000000000000000000000000000000000000000000000000000000000000ff"
        );
        assert_eq!(from_hex("0xff").unwrap(), x);
        assert_eq!(from_hex("f").unwrap(), x);
        assert_eq!(to_decimal(&x), "255");
        assert_eq!(from_decimal("255").unwrap(), x);
        assert!(from_decimal("12a").is_err());
        assert!(from_hex("0xzz").is_err());
    }

    #[test]
    fn test_modulus_reduces_to_zero() {
        assert_eq!(from_decimal(FIELD_SIZE).unwrap(), Field::zero());
        assert_eq!(-Field::one(), from_decimal(&(field_modulus() - 1u32).to_string()).unwrap());
    }

    #[test]
    fn test_fixed_width_encoding() {
        let x = Field::from(0x0102u64);
        assert_eq!(to_be_bytes_fixed(&x, 31).unwrap().len(), 31);
        assert_eq!(to_be_bytes_fixed(&x, 2).unwrap(), vec![0x01, 0x02]);
        assert!(to_be_bytes_fixed(&x, 1).is_err());
    }

    #[test]
    fn test_random_field_fits_31_bytes() {
        let mut rng = OsRng;
        for _ in 0..16 {
            let r = random_field(&mut rng);
            assert!(to_be_bytes_fixed(&r, RANDOM_BYTES).is_ok());
        }
    }
}
