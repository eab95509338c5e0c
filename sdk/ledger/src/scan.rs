//! Candidate note recovery.
//!
//! Every transaction emits exactly two commitment events, one per output,
//! so events are grouped in fixed pairs by emission order. A wallet owns at
//! most one output of a pair it did not build itself (its change or its
//! incoming transfer), hence at most one candidate per pair.

use obscura_privacy::{Keypair, Note, NoteValue};
use tracing::{debug, info};

use crate::client::LedgerClient;
use crate::error::LedgerError;
use crate::events::CommitmentEvent;

/// Outputs per transaction.
pub const OUTPUTS_PER_TX: usize = 2;

/// Spendable notes found for a keypair.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub notes: Vec<Note>,
    pub balance: NoteValue,
}

/// Try one event: decrypt, then check the rebuilt note against the event commitment.
pub fn try_recover(keypair: &Keypair, event: &CommitmentEvent) -> Option<Note> {
    let note = Note::try_decrypt(keypair, &event.encrypted_output, event.index)?;
    if note.commitment() != event.commitment {
        debug!(
            index = event.index,
            "decrypted payload does not match event commitment"
        );
        return None;
    }
    Some(note)
}

/// Walk index-ordered events in pairs, first then second, keeping at most one note per pair.
pub fn recover_candidates(keypair: &Keypair, events: &[CommitmentEvent]) -> Vec<Note> {
    let candidates: Vec<Note> = events
        .chunks(OUTPUTS_PER_TX)
        .filter_map(|pair| pair.iter().find_map(|event| try_recover(keypair, event)))
        .collect();

    debug!(
        events = events.len(),
        candidates = candidates.len(),
        "recovered candidate notes"
    );
    candidates
}

/// Candidates whose nullifier is not yet in the ledger's registry.
pub async fn scan_unspent<L: LedgerClient>(
    ledger: &L,
    keypair: &Keypair,
    events: &[CommitmentEvent],
) -> Result<ScanResult, LedgerError> {
    let mut result = ScanResult::default();

    for note in recover_candidates(keypair, events) {
        if note.amount().is_zero() {
            continue;
        }
        let nullifier = note.nullifier()?;
        if ledger.is_spent(&nullifier).await? {
            debug!(index = ?note.index(), "candidate already spent");
            continue;
        }
        result.balance = result
            .balance
            .checked_add(note.amount())
            .ok_or_else(|| LedgerError::Decode("balance overflow".into()))?;
        result.notes.push(note);
    }

    info!(
        notes = result.notes.len(),
        balance = %result.balance,
        "scanned unspent notes"
    );
    Ok(result)
}
