//! Transaction Assembler
//!
//! Turns spend intent into a balanced, fixed-shape transaction and its witness.
//!
//! ```text
//!   inputs (≤16) ──┐                              ┌── input_nullifiers
//!                  ├─ pad ─ shuffle ─ tree paths ─┤
//!   outputs (≤2) ──┘                              ├── output_commitments
//!                                                 ├── public_amount
//!   fee, recipient, relayer ─── ext_data ─ hash ──┴── ext_data_hash
//!
//!   ext_amount    = fee + Σ out − Σ in
//!   public_amount = (ext_amount − fee) mod P = Σ out − Σ in
//! ```
//!
//! Coverage of the requested spend (`InsufficientInputValue`) is the caller's
//! job, see [`crate::selection`]. The assembler only enforces shape and
//! tree membership.

use std::str::FromStr;

use obscura_ledger::Felt;
use obscura_privacy::field::Field;
use obscura_privacy::{MerkleTree, Note, NoteValue, PrivacyError};
use rand::seq::SliceRandom;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::TransactionError;
use crate::ext_data::{ExtAmount, ExtData};
use crate::payload::{Account, Entrypoint, TransactArgs, TransactCall};
use crate::prover::Proof;
use crate::witness::ProofInputs;

pub const MAX_INPUTS: usize = 16;
pub const MIN_INPUTS: usize = 2;
pub const OUTPUTS: usize = 2;

// ============================================================================
// Padding policy
// ============================================================================

/// How many zero-amount inputs to add.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputPadding {
    /// Top up to 2; counts of 2..=16 are left alone.
    #[default]
    MinimumTwo,
    /// Top up to the nearest circuit arity, 2 or 16.
    CircuitArity,
}

impl InputPadding {
    pub fn padded_len(&self, supplied: usize) -> usize {
        match self {
            InputPadding::MinimumTwo => supplied.max(MIN_INPUTS),
            InputPadding::CircuitArity if supplied <= MIN_INPUTS => MIN_INPUTS,
            InputPadding::CircuitArity => MAX_INPUTS,
        }
    }
}

impl FromStr for InputPadding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimum-two" => Ok(InputPadding::MinimumTwo),
            "circuit-arity" => Ok(InputPadding::CircuitArity),
            other => Err(format!(
                "unknown input padding '{other}' (expected minimum-two or circuit-arity)"
            )),
        }
    }
}

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    pub inputs: Vec<Note>,
    pub outputs: Vec<Note>,
    pub fee: NoteValue,
    /// Withdrawal target; random when absent.
    pub recipient: Option<Felt>,
    /// Fee collector; random when absent.
    pub relayer: Option<Felt>,
    /// Register this account's public key in the same call.
    pub account: Option<Account>,
}

impl TransactionRequest {
    pub fn new(inputs: Vec<Note>, outputs: Vec<Note>) -> Self {
        Self {
            inputs,
            outputs,
            ..Default::default()
        }
    }

    pub fn fee(mut self, fee: NoteValue) -> Self {
        self.fee = fee;
        self
    }

    pub fn recipient(mut self, recipient: Felt) -> Self {
        self.recipient = Some(recipient);
        self
    }

    pub fn relayer(mut self, relayer: Felt) -> Self {
        self.relayer = Some(relayer);
        self
    }

    pub fn register(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }
}

// ============================================================================
// Prepared transaction
// ============================================================================

/// Everything needed to request a proof and, once proven, the ledger call.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    /// Padded, shuffled, with tree indices resolved.
    pub inputs: Vec<Note>,
    /// Padded and shuffled.
    pub outputs: Vec<Note>,
    pub ext_data: ExtData,
    pub ext_data_hash: Field,
    pub public_amount: Field,
    pub root: Field,
    pub proof_inputs: ProofInputs,
    pub entrypoint: Entrypoint,
}

impl PreparedTransaction {
    pub fn finalize(self, proof: Proof) -> TransactCall {
        let ProofInputs {
            input_nullifiers,
            output_commitment,
            ..
        } = self.proof_inputs;

        TransactCall {
            entrypoint: self.entrypoint,
            args: TransactArgs {
                proof: proof.calldata,
                root: self.root,
                input_nullifiers: input_nullifiers
                    .into_iter()
                    .map(obscura_privacy::Nullifier::from_field)
                    .collect(),
                output_commitments: output_commitment
                    .into_iter()
                    .map(obscura_privacy::Commitment::from_field)
                    .collect(),
                public_amount: self.public_amount,
                ext_data_hash: self.ext_data_hash,
            },
            ext_data: self.ext_data,
        }
    }
}

// ============================================================================
// Assembly
// ============================================================================

pub fn prepare<R: RngCore + CryptoRng>(
    request: TransactionRequest,
    tree: &MerkleTree,
    padding: InputPadding,
    rng: &mut R,
) -> Result<PreparedTransaction, TransactionError> {
    let TransactionRequest {
        mut inputs,
        mut outputs,
        fee,
        recipient,
        relayer,
        account,
    } = request;

    if inputs.len() > MAX_INPUTS || outputs.len() > OUTPUTS {
        return Err(TransactionError::TooManyInputsOrOutputs {
            inputs: inputs.len(),
            outputs: outputs.len(),
            max_inputs: MAX_INPUTS,
            max_outputs: OUTPUTS,
        });
    }

    let supplied = (inputs.len(), outputs.len());
    let target = padding.padded_len(inputs.len());
    while inputs.len() < target {
        inputs.push(Note::zero(rng));
    }
    while outputs.len() < OUTPUTS {
        outputs.push(Note::zero(rng));
    }
    debug!(
        supplied_inputs = supplied.0,
        supplied_outputs = supplied.1,
        inputs = inputs.len(),
        outputs = outputs.len(),
        "padded transaction"
    );

    let ext_amount = ExtAmount::for_transaction(
        fee,
        outputs.iter().map(Note::amount),
        inputs.iter().map(Note::amount),
    )?;

    inputs.shuffle(rng);
    outputs.shuffle(rng);

    let mut resolved = Vec::with_capacity(inputs.len());
    let mut path_indices = Vec::with_capacity(inputs.len());
    let mut path_elements = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.amount().is_zero() {
            let path = tree.zero_path();
            path_indices.push(path.index);
            path_elements.push(path.siblings);
            resolved.push(input);
            continue;
        }

        let index = tree.index_of(&input.commitment())?;
        let path = tree.path(index)?;
        debug!(index, amount = %input.amount(), "resolved input path");
        path_indices.push(index);
        path_elements.push(path.siblings);
        resolved.push(input.with_index(index));
    }
    let inputs = resolved;

    let ext_data = ExtData {
        recipient: recipient.unwrap_or_else(|| Felt::random(rng)),
        ext_amount,
        relayer: relayer.unwrap_or_else(|| Felt::random(rng)),
        fee,
        encrypted_output1: outputs[0].encrypted_payload(rng)?,
        encrypted_output2: outputs[1].encrypted_payload(rng)?,
    };
    let ext_data_hash = ext_data.hash();
    let public_amount = ext_amount.to_field() - fee.to_field();
    let root = tree.root();

    let input_nullifiers = inputs
        .iter()
        .map(|note| note.nullifier().map(|n| n.to_field()))
        .collect::<Result<Vec<_>, _>>()?;
    let in_private_key = inputs
        .iter()
        .map(private_key_of)
        .collect::<Result<Vec<_>, _>>()?;

    let proof_inputs = ProofInputs {
        root,
        input_nullifiers,
        output_commitment: outputs.iter().map(|n| n.commitment().to_field()).collect(),
        public_amount,
        ext_data_hash,
        in_amount: inputs.iter().map(|n| n.amount().to_field()).collect(),
        in_private_key,
        in_blinding: inputs.iter().map(Note::blinding).collect(),
        in_path_indices: path_indices,
        in_path_elements: path_elements,
        out_amount: outputs.iter().map(|n| n.amount().to_field()).collect(),
        out_blinding: outputs.iter().map(Note::blinding).collect(),
        out_pubkey: outputs.iter().map(|n| n.owner().public_key()).collect(),
    };

    let entrypoint = match account {
        Some(account) => Entrypoint::RegisterAndTransact(account),
        None => Entrypoint::Transact,
    };

    info!(
        inputs = inputs.len(),
        outputs = outputs.len(),
        ext_amount = ext_amount.value,
        withdraw = ext_amount.is_negative,
        fee = %fee,
        entrypoint = entrypoint.name(),
        "prepared transaction"
    );

    Ok(PreparedTransaction {
        inputs,
        outputs,
        ext_data,
        ext_data_hash,
        public_amount,
        root,
        proof_inputs,
        entrypoint,
    })
}

/// Spending key as a field element; zero for padding notes without one.
fn private_key_of(note: &Note) -> Result<Field, PrivacyError> {
    match note.owner().spending_key() {
        Some(key) => Ok(key.to_field()),
        None if note.amount().is_zero() => Ok(Field::from(0u64)),
        None => Err(PrivacyError::MissingSpendingKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_len() {
        let min = InputPadding::MinimumTwo;
        assert_eq!(min.padded_len(0), 2);
        assert_eq!(min.padded_len(1), 2);
        assert_eq!(min.padded_len(2), 2);
        assert_eq!(min.padded_len(5), 5);
        assert_eq!(min.padded_len(16), 16);

        let arity = InputPadding::CircuitArity;
        assert_eq!(arity.padded_len(1), 2);
        assert_eq!(arity.padded_len(2), 2);
        assert_eq!(arity.padded_len(3), 16);
        assert_eq!(arity.padded_len(16), 16);
    }

    #[test]
    fn test_padding_from_str() {
        assert_eq!("minimum-two".parse::<InputPadding>(), Ok(InputPadding::MinimumTwo));
        assert_eq!("circuit-arity".parse::<InputPadding>(), Ok(InputPadding::CircuitArity));
        assert!("sixteen".parse::<InputPadding>().is_err());
    }
}
