use obscura_ledger::LedgerError;
use obscura_privacy::{NoteValue, PrivacyError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("incorrect inputs/outputs count: {inputs} inputs (max {max_inputs}), {outputs} outputs (max {max_outputs})")]
    TooManyInputsOrOutputs {
        inputs: usize,
        outputs: usize,
        max_inputs: usize,
        max_outputs: usize,
    },

    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientInputValue {
        required: NoteValue,
        available: NoteValue,
    },

    #[error("amount overflow")]
    AmountOverflow,

    #[error(transparent)]
    Privacy(#[from] PrivacyError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Prover(#[from] ProverError),
}

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("failed to reach prover: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("prover returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("prover error ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("proof generation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("invalid proof response: {0}")]
    InvalidResponse(String),

    #[error("witness serialization failed: {0}")]
    Witness(#[from] serde_json::Error),
}
