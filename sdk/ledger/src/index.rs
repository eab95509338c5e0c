//! Ledger event index.
//!
//! Each call walks continuation tokens from scratch and returns a complete,
//! ordered snapshot; no cursor survives between calls.

use obscura_privacy::Keypair;
use tracing::{debug, info, warn};

use crate::client::LedgerClient;
use crate::error::LedgerError;
use crate::events::{CommitmentEvent, EventFilter, RegistrationEvent};
use crate::felt::Felt;

/// All commitment events in range, sorted by leaf index.
///
/// Delivery order is not guaranteed to follow index order, so pages are
/// concatenated first and sorted once at the end.
pub async fn fetch_commitment_events<L: LedgerClient>(
    ledger: &L,
    filter: &EventFilter,
) -> Result<Vec<CommitmentEvent>, LedgerError> {
    let mut events = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = ledger
            .commitment_events_page(filter, token.as_deref())
            .await?;
        pages += 1;
        events.extend(page.events);

        match page.continuation_token {
            Some(next) if token.as_deref() == Some(next.as_str()) => {
                warn!(token = %next, "ledger repeated continuation token, stopping");
                break;
            }
            Some(next) => token = Some(next),
            None => break,
        }
    }

    events.sort_by_key(|e| e.index);
    info!(events = events.len(), pages, "fetched commitment events");
    Ok(events)
}

/// All key registrations in range, oldest first.
pub async fn fetch_registration_events<L: LedgerClient>(
    ledger: &L,
    filter: &EventFilter,
    owner: Option<Felt>,
) -> Result<Vec<RegistrationEvent>, LedgerError> {
    let mut events = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = ledger
            .registration_events_page(filter, owner, token.as_deref())
            .await?;
        events.extend(page.events);

        match page.continuation_token {
            Some(next) if token.as_deref() == Some(next.as_str()) => break,
            Some(next) => token = Some(next),
            None => break,
        }
    }

    // stable: same-block registrations keep delivery order
    events.sort_by_key(|e| e.block_number.unwrap_or(0));
    debug!(events = events.len(), ?owner, "fetched registration events");
    Ok(events)
}

/// Latest shielded identity registered by `owner`, if any.
pub async fn lookup_public_key<L: LedgerClient>(
    ledger: &L,
    filter: &EventFilter,
    owner: Felt,
) -> Result<Option<Keypair>, LedgerError> {
    let events = fetch_registration_events(ledger, filter, Some(owner)).await?;
    match events.last() {
        Some(event) => Ok(Some(Keypair::from_public_string(&event.public_key)?)),
        None => Ok(None),
    }
}
