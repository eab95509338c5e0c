//! Obscura Transaction
//!
//! Assembles shielded pool transactions from wallet notes.
//!
//! ```text
//!   ledger events ─▶ build_tree ─▶ MerkleTree
//!                                      │
//!   TransactionRequest ─────────▶ prepare ─▶ PreparedTransaction
//!                                                 │ proof_inputs
//!                                                 ▼
//!                                           Prover::prove
//!                                                 │ Proof
//!                                                 ▼
//!                                      finalize ─▶ TransactCall ─▶ calldata
//! ```

pub mod assembler;
pub mod error;
pub mod ext_data;
pub mod payload;
pub mod prover;
pub mod selection;
pub mod witness;

pub use assembler::{
    InputPadding, MAX_INPUTS, MIN_INPUTS, OUTPUTS, PreparedTransaction, TransactionRequest,
    prepare,
};
pub use error::{ProverError, TransactionError};
pub use ext_data::{ExtAmount, ExtData};
pub use payload::{Account, Call, Entrypoint, TransactArgs, TransactCall};
pub use prover::{HttpProver, HttpProverConfig, MockProver, Proof, Prover};
pub use selection::{Selection, plan_deposit, plan_transfer, plan_withdrawal, select_inputs};
pub use witness::ProofInputs;

use obscura_ledger::{EventFilter, LedgerClient, fetch_commitment_events};
use obscura_privacy::{DEFAULT_DEPTH, MerkleTree};
use rand::{CryptoRng, RngCore};
use tracing::{info, warn};

/// Where to read the tree from and how to shape the transaction.
#[derive(Debug, Clone, Copy)]
pub struct TransactOptions {
    pub filter: EventFilter,
    pub depth: usize,
    pub padding: InputPadding,
}

impl Default for TransactOptions {
    fn default() -> Self {
        Self {
            filter: EventFilter::default(),
            depth: DEFAULT_DEPTH,
            padding: InputPadding::default(),
        }
    }
}

/// Rebuild the commitment tree from the ledger's event log.
pub async fn build_tree<L: LedgerClient>(
    ledger: &L,
    filter: &EventFilter,
    depth: usize,
) -> Result<MerkleTree, TransactionError> {
    let events = fetch_commitment_events(ledger, filter).await?;

    if let Some((position, event)) = events
        .iter()
        .enumerate()
        .find(|(position, event)| event.index != *position as u64)
    {
        warn!(
            position,
            index = event.index,
            "commitment events are not contiguous from leaf 0, root may not match the pool"
        );
    }

    let tree = MerkleTree::from_leaves(depth, events.into_iter().map(|e| e.commitment))?;
    info!(leaves = tree.len(), depth = tree.depth(), "built commitment tree");
    Ok(tree)
}

/// Fetch, prepare, prove, and assemble the ledger call.
pub async fn transact<L, P, R>(
    ledger: &L,
    prover: &P,
    request: TransactionRequest,
    options: &TransactOptions,
    rng: &mut R,
) -> Result<TransactCall, TransactionError>
where
    L: LedgerClient,
    P: Prover,
    R: RngCore + CryptoRng,
{
    let tree = build_tree(ledger, &options.filter, options.depth).await?;
    let prepared = prepare(request, &tree, options.padding, rng)?;
    let proof = prover.prove(&prepared.proof_inputs).await?;
    Ok(prepared.finalize(proof))
}
