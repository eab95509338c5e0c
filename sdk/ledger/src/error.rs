use obscura_privacy::PrivacyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("no result in rpc response")]
    MissingResult,

    #[error("invalid felt: {0}")]
    InvalidFelt(String),

    #[error("event decoding failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Privacy(#[from] PrivacyError),
}
