//! Obscura Ledger SDK
//!
//! Reads the shielded pool's public state: commitment events, key
//! registrations and the nullifier registry.
//!
//! ```text
//! LedgerClient ──pages──▶ fetch_commitment_events ──sorted──▶ MerkleTree (transaction crate)
//!                                    │
//!                                    └──pairs──▶ recover_candidates ──is_spent──▶ scan_unspent
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod events;
pub mod felt;
pub mod index;
pub mod rpc;
pub mod scan;

pub use client::{LedgerClient, MemoryLedger};
pub use error::LedgerError;
pub use events::{
    CommitmentEvent, DEFAULT_CHUNK_SIZE, EmittedEvent, EventFilter, EventPage, RegistrationEvent,
};
pub use felt::{Felt, poseidon_hash_many, starknet_keccak};
pub use index::{fetch_commitment_events, fetch_registration_events, lookup_public_key};
pub use rpc::{RpcConfig, StarknetRpcLedger};
pub use scan::{ScanResult, recover_candidates, scan_unspent, try_recover};
