//! Circuit witness
//!
//! Field names follow the transaction circuit's signal names; every field
//! element travels as a decimal string.

use obscura_privacy::field::{Field, serde_decimal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofInputs {
    // public
    #[serde(with = "serde_decimal")]
    pub root: Field,
    #[serde(with = "serde_decimal::vec")]
    pub input_nullifiers: Vec<Field>,
    #[serde(with = "serde_decimal::vec")]
    pub output_commitment: Vec<Field>,
    #[serde(with = "serde_decimal")]
    pub public_amount: Field,
    #[serde(with = "serde_decimal")]
    pub ext_data_hash: Field,

    // private, one entry per input
    #[serde(with = "serde_decimal::vec")]
    pub in_amount: Vec<Field>,
    #[serde(with = "serde_decimal::vec")]
    pub in_private_key: Vec<Field>,
    #[serde(with = "serde_decimal::vec")]
    pub in_blinding: Vec<Field>,
    pub in_path_indices: Vec<u64>,
    #[serde(with = "serde_decimal::nested")]
    pub in_path_elements: Vec<Vec<Field>>,

    // private, one entry per output
    #[serde(with = "serde_decimal::vec")]
    pub out_amount: Vec<Field>,
    #[serde(with = "serde_decimal::vec")]
    pub out_blinding: Vec<Field>,
    #[serde(with = "serde_decimal::vec")]
    pub out_pubkey: Vec<Field>,
}

impl ProofInputs {
    /// Public signals in circuit order.
    pub fn public_signals(&self) -> Vec<Field> {
        let mut signals = vec![self.root];
        signals.extend(&self.input_nullifiers);
        signals.extend(&self.output_commitment);
        signals.push(self.public_amount);
        signals.push(self.ext_data_hash);
        signals
    }

    pub fn input_count(&self) -> usize {
        self.input_nullifiers.len()
    }

    pub fn output_count(&self) -> usize {
        self.output_commitment.len()
    }
}
