use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    #[error("spending key is required for this operation")]
    MissingSpendingKey,

    #[error("invalid key length: expected {expected} hex chars, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("value does not fit in {bytes} bytes")]
    ValueTooWide { bytes: usize },

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("malformed note payload: {0}")]
    MalformedPayload(String),

    #[error("cannot compute nullifier without note index or spending key")]
    MissingIndexOrKey,

    #[error("input commitment {0} was not found in the tree")]
    CommitmentNotFound(String),

    #[error("leaf index {index} out of range (tree holds {len} leaves)")]
    LeafIndexOutOfRange { index: u64, len: u64 },

    #[error("merkle tree of depth {depth} is full")]
    TreeFull { depth: usize },

    #[error("merkle tree depth {depth} outside 1..={max}")]
    InvalidDepth { depth: usize, max: usize },
}
