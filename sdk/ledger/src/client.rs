//! Ledger access seam.
//!
//! The wallet needs three things from the ledger: paged commitment events,
//! paged key registrations, and the nullifier registry.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;

use obscura_privacy::Nullifier;

use crate::error::LedgerError;
use crate::events::{CommitmentEvent, EventFilter, EventPage, RegistrationEvent};
use crate::felt::Felt;

/// Read access to the shielded pool contract.
pub trait LedgerClient: Send + Sync {
    /// One page of `NewCommitment` events in delivery order.
    fn commitment_events_page(
        &self,
        filter: &EventFilter,
        continuation_token: Option<&str>,
    ) -> impl Future<Output = Result<EventPage<CommitmentEvent>, LedgerError>> + Send;

    /// One page of `PublicKey` events, optionally restricted to one owner.
    fn registration_events_page(
        &self,
        filter: &EventFilter,
        owner: Option<Felt>,
        continuation_token: Option<&str>,
    ) -> impl Future<Output = Result<EventPage<RegistrationEvent>, LedgerError>> + Send;

    /// Whether the nullifier registry already holds `nullifier`.
    fn is_spent(
        &self,
        nullifier: &Nullifier,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;
}

// ============================================================================
// In-memory ledger
// ============================================================================

/// Ledger held in memory, for tests and offline tooling.
///
/// Pages are cut by `chunk_size`; continuation tokens are decimal offsets.
/// Events are served in insertion order, which need not match their index.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    commitments: Mutex<Vec<CommitmentEvent>>,
    registrations: Mutex<Vec<RegistrationEvent>>,
    spent: Mutex<HashSet<Nullifier>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_commitment(&self, event: CommitmentEvent) {
        lock(&self.commitments).push(event);
    }

    pub fn push_registration(&self, event: RegistrationEvent) {
        lock(&self.registrations).push(event);
    }

    pub fn mark_spent(&self, nullifier: Nullifier) {
        lock(&self.spent).insert(nullifier);
    }

    pub fn commitment_count(&self) -> usize {
        lock(&self.commitments).len()
    }
}

impl LedgerClient for MemoryLedger {
    async fn commitment_events_page(
        &self,
        filter: &EventFilter,
        continuation_token: Option<&str>,
    ) -> Result<EventPage<CommitmentEvent>, LedgerError> {
        let events: Vec<_> = lock(&self.commitments)
            .iter()
            .filter(|e| in_range(filter, e.block_number))
            .cloned()
            .collect();
        paginate(events, filter, continuation_token)
    }

    async fn registration_events_page(
        &self,
        filter: &EventFilter,
        owner: Option<Felt>,
        continuation_token: Option<&str>,
    ) -> Result<EventPage<RegistrationEvent>, LedgerError> {
        let events: Vec<_> = lock(&self.registrations)
            .iter()
            .filter(|e| in_range(filter, e.block_number))
            .filter(|e| owner.is_none_or(|o| o == e.owner))
            .cloned()
            .collect();
        paginate(events, filter, continuation_token)
    }

    async fn is_spent(&self, nullifier: &Nullifier) -> Result<bool, LedgerError> {
        Ok(lock(&self.spent).contains(nullifier))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn in_range(filter: &EventFilter, block: Option<u64>) -> bool {
    let block = block.unwrap_or(0);
    filter.from_block.is_none_or(|from| block >= from)
        && filter.to_block.is_none_or(|to| block <= to)
}

fn paginate<T>(
    events: Vec<T>,
    filter: &EventFilter,
    continuation_token: Option<&str>,
) -> Result<EventPage<T>, LedgerError> {
    let offset = match continuation_token {
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| LedgerError::Decode(format!("bad continuation token {token:?}")))?,
        None => 0,
    };
    let end = offset
        .saturating_add(filter.chunk_size.max(1) as usize)
        .min(events.len());
    let continuation_token = (end < events.len()).then(|| end.to_string());
    let events = events
        .into_iter()
        .skip(offset)
        .take(end.saturating_sub(offset))
        .collect();

    Ok(EventPage {
        events,
        continuation_token,
    })
}
