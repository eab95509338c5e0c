//! Obscura Privacy SDK
//!
//! Note-based privacy primitives for shielded transfers over the BN254 field.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Shielded Transaction                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifiers  │  │ Commitments  │  │   Encrypted Outputs   │ │
//! │  │  (spent)     │  │  (new notes) │  │   (for recipients)    │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              ZK Proof (external prover)                  │   │
//! │  │  • Inputs exist in the commitment tree                   │   │
//! │  │  • Valid nullifier derivation                            │   │
//! │  │  • Σ outputs − Σ inputs = public amount                  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod encryption;
pub mod error;
pub mod field;
pub mod keypair;
pub mod merkle;
pub mod note;
pub mod nullifier;

pub use commitment::Commitment;
pub use encryption::{EncryptedMessage, open, seal};
pub use error::PrivacyError;
pub use field::{Field, hash_many, poseidon2, random_field};
pub use keypair::{Keypair, SpendingKey};
pub use merkle::{DEFAULT_DEPTH, MerklePath, MerkleTree, ZERO_VALUE};
pub use note::{Note, NoteValue};
pub use nullifier::Nullifier;
