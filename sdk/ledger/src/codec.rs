//! Cairo `ByteArray` serialization.
//!
//! ```text
//! [ data.len, data[0], .., data[n-1], pending_word, pending_word_len ]
//!
//! data[i]      : full 31-byte words, big-endian
//! pending_word : trailing 0..=30 bytes, right-aligned
//! ```
//!
//! Encrypted note outputs travel through events and calldata as the
//! ASCII of their packed hex string.

use crate::error::LedgerError;
use crate::felt::Felt;

/// Bytes per full word.
pub const WORD_LEN: usize = 31;

pub fn encode_byte_array(bytes: &[u8]) -> Vec<Felt> {
    let full = bytes.len() / WORD_LEN;
    let mut out = Vec::with_capacity(full + 3);
    out.push(Felt::from(full as u64));

    let mut chunks = bytes.chunks_exact(WORD_LEN);
    for chunk in chunks.by_ref() {
        out.push(word(chunk));
    }
    let pending = chunks.remainder();
    out.push(word(pending));
    out.push(Felt::from(pending.len() as u64));
    out
}

pub fn encode_str(s: &str) -> Vec<Felt> {
    encode_byte_array(s.as_bytes())
}

/// Decode one `ByteArray` from the front of `felts`.
///
/// Returns the bytes and the number of felts consumed.
pub fn decode_byte_array(felts: &[Felt]) -> Result<(Vec<u8>, usize), LedgerError> {
    let len = felts
        .first()
        .ok_or_else(|| LedgerError::Decode("empty byte array".into()))?
        .to_u64()? as usize;
    let consumed = len
        .checked_add(3)
        .filter(|n| *n <= felts.len())
        .ok_or_else(|| {
            LedgerError::Decode(format!("byte array of {len} words exceeds {} felts", felts.len()))
        })?;

    let mut out = Vec::with_capacity(len * WORD_LEN + WORD_LEN);
    for felt in &felts[1..=len] {
        out.extend_from_slice(&unword(felt, WORD_LEN)?);
    }

    let pending_len = felts[len + 2].to_u64()? as usize;
    if pending_len >= WORD_LEN {
        return Err(LedgerError::Decode(format!("pending word length {pending_len}")));
    }
    out.extend_from_slice(&unword(&felts[len + 1], pending_len)?);

    Ok((out, consumed))
}

pub fn decode_str(felts: &[Felt]) -> Result<(String, usize), LedgerError> {
    let (bytes, consumed) = decode_byte_array(felts)?;
    let s = String::from_utf8(bytes).map_err(|e| LedgerError::Decode(e.to_string()))?;
    Ok((s, consumed))
}

fn word(chunk: &[u8]) -> Felt {
    let mut bytes = [0u8; 32];
    bytes[32 - chunk.len()..].copy_from_slice(chunk);
    // at most 31 bytes, always below the prime
    Felt::from_raw(bytes)
}

fn unword(felt: &Felt, len: usize) -> Result<Vec<u8>, LedgerError> {
    let bytes = felt.as_bytes();
    if bytes[..32 - len].iter().any(|b| *b != 0) {
        return Err(LedgerError::Decode(format!(
            "word {} wider than {len} bytes",
            felt.to_hex()
        )));
    }
    Ok(bytes[32 - len..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_string() {
        let felts = encode_str("hello");
        assert_eq!(felts.len(), 3);
        assert_eq!(felts[0], Felt::ZERO);
        assert_eq!(felts[1].to_hex(), "0x68656c6c6f");
        assert_eq!(felts[2], Felt::from(5u64));
        assert_eq!(decode_str(&felts).unwrap(), ("hello".to_string(), 3));
    }

    #[test]
    fn test_exact_word_boundary() {
        let s = "a".repeat(62);
        let felts = encode_str(&s);
        assert_eq!(felts.len(), 5);
        assert_eq!(felts[0], Felt::from(2u64));
        assert_eq!(felts[3], Felt::ZERO);
        assert_eq!(felts[4], Felt::ZERO);
        assert_eq!(decode_str(&felts).unwrap().0, s);
    }

    #[test]
    fn test_empty() {
        let felts = encode_byte_array(&[]);
        assert_eq!(felts, vec![Felt::ZERO, Felt::ZERO, Felt::ZERO]);
        assert_eq!(decode_byte_array(&felts).unwrap(), (vec![], 3));
    }

    #[test]
    fn test_decode_consumes_prefix_only() {
        let mut felts = encode_str("0xdeadbeef");
        felts.push(Felt::from(99u64));
        let (s, consumed) = decode_str(&felts).unwrap();
        assert_eq!(s, "0xdeadbeef");
        assert_eq!(&felts[consumed..], &[Felt::from(99u64)]);
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let felts = encode_str(&"x".repeat(40));
        assert!(decode_byte_array(&felts[..felts.len() - 1]).is_err());
        assert!(decode_byte_array(&[]).is_err());

        // pending word longer than declared
        let bad = vec![Felt::ZERO, Felt::from(0xffffu64), Felt::from(1u64)];
        assert!(decode_byte_array(&bad).is_err());
    }
}
