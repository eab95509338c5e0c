//! External data
//!
//! The public, non-private half of a transaction, bound into the proof by hash.
//!
//! ```text
//! serialize(ext) = [ recipient,
//!                    ext_amount.low, ext_amount.high, ext_amount.is_negative,
//!                    relayer,
//!                    fee.low, fee.high,
//!                    ByteArray(encrypted_output1),
//!                    ByteArray(encrypted_output2) ]
//!
//! ext_data_hash  = poseidon_hash_many(serialize(ext))    (Starknet Poseidon)
//! ```

use obscura_ledger::codec::encode_str;
use obscura_ledger::{Felt, poseidon_hash_many};
use obscura_privacy::NoteValue;
use obscura_privacy::field::Field;
use serde::{Deserialize, Serialize};

use crate::error::TransactionError;

/// Signed net value crossing the pool boundary.
///
/// Positive: deposited into the pool. Negative: withdrawn to `recipient`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtAmount {
    pub value: u128,
    pub is_negative: bool,
}

impl ExtAmount {
    /// `credit - debit`, as magnitude and sign.
    pub fn difference(credit: NoteValue, debit: NoteValue) -> Self {
        let (credit, debit) = (credit.as_u128(), debit.as_u128());
        if credit >= debit {
            Self {
                value: credit - debit,
                is_negative: false,
            }
        } else {
            Self {
                value: debit - credit,
                is_negative: true,
            }
        }
    }

    /// `fee + Σ outputs − Σ inputs`
    pub fn for_transaction(
        fee: NoteValue,
        outputs: impl IntoIterator<Item = NoteValue>,
        inputs: impl IntoIterator<Item = NoteValue>,
    ) -> Result<Self, TransactionError> {
        let credit = NoteValue::checked_sum(outputs)
            .and_then(|sum| sum.checked_add(fee))
            .ok_or(TransactionError::AmountOverflow)?;
        let debit = NoteValue::checked_sum(inputs).ok_or(TransactionError::AmountOverflow)?;
        Ok(Self::difference(credit, debit))
    }

    /// The amount as a field element; negative values wrap to `P - value`.
    pub fn to_field(&self) -> Field {
        let magnitude = Field::from(self.value);
        if self.is_negative { -magnitude } else { magnitude }
    }

    pub fn to_felts(&self) -> [Felt; 3] {
        [
            Felt::from(self.value),
            Felt::ZERO,
            Felt::from(self.is_negative),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtData {
    pub recipient: Felt,
    pub ext_amount: ExtAmount,
    pub relayer: Felt,
    pub fee: NoteValue,
    pub encrypted_output1: String,
    pub encrypted_output2: String,
}

impl ExtData {
    /// Ledger serialization, shared by the hash and the call payload.
    pub fn to_felts(&self) -> Vec<Felt> {
        let mut felts = vec![self.recipient];
        felts.extend(self.ext_amount.to_felts());
        felts.push(self.relayer);
        felts.push(Felt::from(self.fee.as_u128()));
        felts.push(Felt::ZERO);
        felts.extend(encode_str(&self.encrypted_output1));
        felts.extend(encode_str(&self.encrypted_output2));
        felts
    }

    /// Hashed with the ledger's own Poseidon so the contract can recompute it.
    pub fn hash(&self) -> Field {
        poseidon_hash_many(&self.to_felts()).to_field()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext_data() -> ExtData {
        ExtData {
            recipient: Felt::from(0xaaaau64),
            ext_amount: ExtAmount {
                value: 40,
                is_negative: true,
            },
            relayer: Felt::from(0xbbbbu64),
            fee: NoteValue::new(3),
            encrypted_output1: "0x0102".into(),
            encrypted_output2: "0x0304".into(),
        }
    }

    #[test]
    fn test_difference_sign() {
        assert_eq!(
            ExtAmount::difference(NoteValue::new(100), NoteValue::new(60)),
            ExtAmount { value: 40, is_negative: false }
        );
        assert_eq!(
            ExtAmount::difference(NoteValue::new(60), NoteValue::new(100)),
            ExtAmount { value: 40, is_negative: true }
        );
        assert_eq!(
            ExtAmount::difference(NoteValue::new(7), NoteValue::new(7)),
            ExtAmount::default()
        );
    }

    #[test]
    fn test_for_transaction() {
        let ext = ExtAmount::for_transaction(
            NoteValue::new(2),
            [NoteValue::new(60), NoteValue::new(40)],
            [NoteValue::new(100), NoteValue::ZERO],
        )
        .unwrap();
        assert_eq!(ext, ExtAmount { value: 2, is_negative: false });

        let overflow = ExtAmount::for_transaction(NoteValue::MAX, [NoteValue::new(1)], []);
        assert!(matches!(overflow, Err(TransactionError::AmountOverflow)));
    }

    #[test]
    fn test_negative_to_field_wraps() {
        let ext = ExtAmount { value: 5, is_negative: true };
        assert_eq!(ext.to_field() + Field::from(5u64), Field::from(0u64));
    }

    #[test]
    fn test_serialization_layout() {
        let felts = ext_data().to_felts();
        assert_eq!(felts[0], Felt::from(0xaaaau64));
        assert_eq!(&felts[1..4], &[Felt::from(40u64), Felt::ZERO, Felt::ONE]);
        assert_eq!(felts[4], Felt::from(0xbbbbu64));
        assert_eq!(&felts[5..7], &[Felt::from(3u64), Felt::ZERO]);
        // two short ByteArrays of three felts each
        assert_eq!(felts.len(), 7 + 3 + 3);
        assert_eq!(felts[9], Felt::from(6u64));
    }

    #[test]
    fn test_hash_binds_every_field() {
        let base = ext_data();
        let h = base.hash();
        assert_eq!(h, ext_data().hash());

        let mut changed = ext_data();
        changed.ext_amount.is_negative = false;
        assert_ne!(changed.hash(), h);

        let mut changed = ext_data();
        changed.encrypted_output2 = "0x0305".into();
        assert_ne!(changed.hash(), h);

        let mut changed = ext_data();
        changed.relayer = Felt::from(1u64);
        assert_ne!(changed.hash(), h);
    }

    #[test]
    fn test_hash_uses_ledger_poseidon() {
        let ext = ext_data();
        let ledger_hash = poseidon_hash_many(&ext.to_felts());
        assert_eq!(ext.hash(), ledger_hash.to_field());

        let elements: Vec<Field> = ext.to_felts().iter().map(Felt::to_field).collect();
        assert_ne!(ext.hash(), obscura_privacy::hash_many(&elements));
    }
}
