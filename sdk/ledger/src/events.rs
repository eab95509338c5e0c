//! Ledger events consumed by the wallet.
//!
//! ```text
//! NewCommitment   keys = [selector]
//!                 data = [commitment.low, commitment.high, index, ByteArray(encrypted_output)]
//!
//! PublicKey       keys = [selector, owner]
//!                 data = [ByteArray(public_key)]
//! ```

use obscura_privacy::Commitment;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::LedgerError;
use crate::felt::{self, Felt, starknet_keccak};

pub const NEW_COMMITMENT_EVENT: &str = "NewCommitment";
pub const PUBLIC_KEY_EVENT: &str = "PublicKey";

/// Events per page when the caller does not say otherwise.
pub const DEFAULT_CHUNK_SIZE: u64 = 10;

/// A raw event as returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub from_address: Felt,
    pub keys: Vec<Felt>,
    pub data: Vec<Felt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<Felt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<Felt>,
}

/// Block range and page size for event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    pub chunk_size: u64,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            from_block: None,
            to_block: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EventFilter {
    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

/// One page of decoded events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPage<T> {
    pub events: Vec<T>,
    pub continuation_token: Option<String>,
}

/// A published note commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentEvent {
    pub commitment: Commitment,
    /// Leaf position assigned by the ledger
    pub index: u64,
    /// Packed encrypted note payload
    pub encrypted_output: String,
    pub block_number: Option<u64>,
}

impl CommitmentEvent {
    pub fn selector() -> Felt {
        starknet_keccak(NEW_COMMITMENT_EVENT.as_bytes())
    }

    pub fn decode(event: &EmittedEvent) -> Result<Self, LedgerError> {
        let data = &event.data;
        if data.len() < 3 {
            return Err(LedgerError::Decode(format!(
                "{NEW_COMMITMENT_EVENT}: expected at least 3 data felts, got {}",
                data.len()
            )));
        }

        let commitment = Commitment::from_field(felt::u256_to_field(&data[0], &data[1])?);
        let index = data[2].to_u64()?;
        let (encrypted_output, _) = codec::decode_str(&data[3..])?;

        Ok(Self {
            commitment,
            index,
            encrypted_output,
            block_number: event.block_number,
        })
    }

    /// Event data in ledger layout.
    pub fn encode_data(&self) -> Vec<Felt> {
        let mut data = felt::field_to_u256(&self.commitment.to_field()).to_vec();
        data.push(Felt::from(self.index));
        data.extend(codec::encode_str(&self.encrypted_output));
        data
    }
}

/// A shielded public key registered for a ledger account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationEvent {
    pub owner: Felt,
    /// Serialized public identity string
    pub public_key: String,
    pub block_number: Option<u64>,
}

impl RegistrationEvent {
    pub fn selector() -> Felt {
        starknet_keccak(PUBLIC_KEY_EVENT.as_bytes())
    }

    pub fn decode(event: &EmittedEvent) -> Result<Self, LedgerError> {
        let owner = *event.keys.get(1).ok_or_else(|| {
            LedgerError::Decode(format!("{PUBLIC_KEY_EVENT}: missing owner key"))
        })?;
        let (public_key, _) = codec::decode_str(&event.data)?;

        Ok(Self {
            owner,
            public_key,
            block_number: event.block_number,
        })
    }

    pub fn encode_data(&self) -> Vec<Felt> {
        codec::encode_str(&self.public_key)
    }
}
