//! Ledger call payload
//!
//! ```text
//! transact(args, ext_data)
//! register_and_transact(account, args, ext_data)
//!
//! args     = [ proof.len, proof..,
//!              root.low, root.high,
//!              nullifiers.len, (low, high)..,
//!              commitments.len, (low, high)..,
//!              public_amount.low, public_amount.high,
//!              ext_data_hash.low, ext_data_hash.high ]
//! account  = [ owner, ByteArray(public_key) ]
//! ```

use obscura_ledger::Felt;
use obscura_ledger::codec::encode_str;
use obscura_ledger::felt::field_to_u256;
use obscura_ledger::starknet_keccak;
use obscura_privacy::field::{Field, serde_decimal};
use obscura_privacy::{Commitment, Nullifier};
use serde::{Deserialize, Serialize};

use crate::ext_data::ExtData;

pub const TRANSACT_ENTRYPOINT: &str = "transact";
pub const REGISTER_AND_TRANSACT_ENTRYPOINT: &str = "register_and_transact";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactArgs {
    pub proof: Vec<Felt>,
    #[serde(with = "serde_decimal")]
    pub root: Field,
    pub input_nullifiers: Vec<Nullifier>,
    pub output_commitments: Vec<Commitment>,
    #[serde(with = "serde_decimal")]
    pub public_amount: Field,
    #[serde(with = "serde_decimal")]
    pub ext_data_hash: Field,
}

impl TransactArgs {
    pub fn to_felts(&self) -> Vec<Felt> {
        let mut felts = Vec::with_capacity(
            self.proof.len()
                + 2 * (self.input_nullifiers.len() + self.output_commitments.len())
                + 9,
        );

        felts.push(Felt::from(self.proof.len() as u64));
        felts.extend_from_slice(&self.proof);
        felts.extend(field_to_u256(&self.root));

        felts.push(Felt::from(self.input_nullifiers.len() as u64));
        for nullifier in &self.input_nullifiers {
            felts.extend(field_to_u256(&nullifier.to_field()));
        }

        felts.push(Felt::from(self.output_commitments.len() as u64));
        for commitment in &self.output_commitments {
            felts.extend(field_to_u256(&commitment.to_field()));
        }

        felts.extend(field_to_u256(&self.public_amount));
        felts.extend(field_to_u256(&self.ext_data_hash));
        felts
    }
}

/// Registration bundled with a first transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub owner: Felt,
    /// Public identity string, see `Keypair::address`.
    pub public_key: String,
}

impl Account {
    pub fn to_felts(&self) -> Vec<Felt> {
        let mut felts = vec![self.owner];
        felts.extend(encode_str(&self.public_key));
        felts
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entrypoint {
    Transact,
    RegisterAndTransact(Account),
}

impl Entrypoint {
    pub fn name(&self) -> &'static str {
        match self {
            Entrypoint::Transact => TRANSACT_ENTRYPOINT,
            Entrypoint::RegisterAndTransact(_) => REGISTER_AND_TRANSACT_ENTRYPOINT,
        }
    }

    pub fn selector(&self) -> Felt {
        starknet_keccak(self.name().as_bytes())
    }
}

/// A fully assembled pool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactCall {
    pub entrypoint: Entrypoint,
    pub args: TransactArgs,
    pub ext_data: ExtData,
}

impl TransactCall {
    pub fn selector(&self) -> Felt {
        self.entrypoint.selector()
    }

    pub fn to_calldata(&self) -> Vec<Felt> {
        let mut calldata = match &self.entrypoint {
            Entrypoint::Transact => Vec::new(),
            Entrypoint::RegisterAndTransact(account) => account.to_felts(),
        };
        calldata.extend(self.args.to_felts());
        calldata.extend(self.ext_data.to_felts());
        calldata
    }

    /// Bind to a pool contract, in the shape wallets submit.
    pub fn to_call(&self, contract_address: Felt) -> Call {
        Call {
            contract_address,
            entry_point_selector: self.selector(),
            calldata: self.to_calldata(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub contract_address: Felt,
    pub entry_point_selector: Felt,
    pub calldata: Vec<Felt>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext_data::ExtAmount;
    use obscura_privacy::NoteValue;

    fn call(entrypoint: Entrypoint) -> TransactCall {
        TransactCall {
            entrypoint,
            args: TransactArgs {
                proof: vec![Felt::from(0xaau64), Felt::from(0xbbu64)],
                root: Field::from(1u64),
                input_nullifiers: vec![
                    Nullifier::from_field(Field::from(2u64)),
                    Nullifier::from_field(Field::from(3u64)),
                ],
                output_commitments: vec![
                    Commitment::from_field(Field::from(4u64)),
                    Commitment::from_field(Field::from(5u64)),
                ],
                public_amount: Field::from(0u64),
                ext_data_hash: Field::from(6u64),
            },
            ext_data: ExtData {
                recipient: Felt::from(7u64),
                ext_amount: ExtAmount::default(),
                relayer: Felt::from(8u64),
                fee: NoteValue::ZERO,
                encrypted_output1: "0x01".into(),
                encrypted_output2: "0x02".into(),
            },
        }
    }

    #[test]
    fn test_args_layout() {
        let felts = call(Entrypoint::Transact).args.to_felts();
        let n = |v: u64| Felt::from(v);
        assert_eq!(
            felts,
            vec![
                n(2), n(0xaa), n(0xbb),
                n(1), n(0),
                n(2), n(2), n(0), n(3), n(0),
                n(2), n(4), n(0), n(5), n(0),
                n(0), n(0),
                n(6), n(0),
            ]
        );
    }

    #[test]
    fn test_u256_high_limb() {
        let mut args = call(Entrypoint::Transact).args;
        args.public_amount = -Field::from(1u64);
        let felts = args.to_felts();
        let high = felts[felts.len() - 3];
        assert_ne!(high, Felt::ZERO);
    }

    #[test]
    fn test_register_prefixes_account() {
        let account = Account {
            owner: Felt::from(0xa11cu64),
            public_key: "0xabc".into(),
        };
        let plain = call(Entrypoint::Transact);
        let register = call(Entrypoint::RegisterAndTransact(account.clone()));

        let calldata = register.to_calldata();
        let prefix = account.to_felts();
        assert_eq!(&calldata[..prefix.len()], &prefix[..]);
        assert_eq!(&calldata[prefix.len()..], &plain.to_calldata()[..]);
        assert_ne!(register.selector(), plain.selector());
        assert_eq!(plain.selector(), starknet_keccak(b"transact"));
    }

    #[test]
    fn test_to_call() {
        let c = call(Entrypoint::Transact).to_call(Felt::from(0x5eedu64));
        assert_eq!(c.contract_address, Felt::from(0x5eedu64));
        assert_eq!(c.calldata.len(), 19 + 7 + 3 + 3);
    }
}
