use obscura_ledger::{
    CommitmentEvent, EventFilter, LedgerClient, MemoryLedger, fetch_commitment_events,
    recover_candidates, scan_unspent,
};
use obscura_privacy::{Keypair, Note, NoteValue};
use rand::rngs::OsRng;

fn publish(note: &Note, index: u64) -> CommitmentEvent {
    CommitmentEvent {
        commitment: note.commitment(),
        index,
        encrypted_output: note.encrypted_payload(&mut OsRng).unwrap(),
        block_number: Some(index / 2),
    }
}

#[test]
fn only_second_of_pair_decrypts() {
    let a = Keypair::generate(&mut OsRng);
    let b = Keypair::generate(&mut OsRng);

    let to_a = Note::new(NoteValue::new(40), a, &mut OsRng);
    let to_b = Note::new(NoteValue::new(60), b.clone(), &mut OsRng);
    let events = vec![publish(&to_a, 0), publish(&to_b, 1)];

    let candidates = recover_candidates(&b, &events);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].amount(), NoteValue::new(60));
    assert_eq!(candidates[0].index(), Some(1));
    assert_eq!(candidates[0].commitment(), to_b.commitment());
}

#[test]
fn at_most_one_candidate_per_pair() {
    let a = Keypair::generate(&mut OsRng);
    let first = Note::new(NoteValue::new(1), a.clone(), &mut OsRng);
    let second = Note::new(NoteValue::new(2), a.clone(), &mut OsRng);
    let events = vec![publish(&first, 0), publish(&second, 1)];

    let candidates = recover_candidates(&a, &events);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].amount(), NoteValue::new(1));
}

#[test]
fn stranger_finds_nothing() {
    let a = Keypair::generate(&mut OsRng);
    let stranger = Keypair::generate(&mut OsRng);
    let events: Vec<_> = (0..4)
        .map(|i| publish(&Note::new(NoteValue::new(i as u128 + 1), a.clone(), &mut OsRng), i))
        .collect();

    assert!(recover_candidates(&stranger, &events).is_empty());
    assert_eq!(recover_candidates(&a, &events).len(), 2);
}

#[test]
fn payload_under_wrong_commitment_is_rejected() {
    let a = Keypair::generate(&mut OsRng);
    let real = Note::new(NoteValue::new(5), a.clone(), &mut OsRng);
    let other = Note::new(NoteValue::new(5), a.clone(), &mut OsRng);

    let mut forged = publish(&real, 0);
    forged.commitment = other.commitment();
    let padding = publish(&Note::zero(&mut OsRng), 1);

    assert!(recover_candidates(&a, &[forged, padding]).is_empty());
}

#[tokio::test]
async fn scan_skips_spent_notes() {
    let ledger = MemoryLedger::new();
    let a = Keypair::generate(&mut OsRng);

    let notes: Vec<_> = [30u128, 70, 100]
        .into_iter()
        .map(|amount| Note::new(NoteValue::new(amount), a.clone(), &mut OsRng))
        .collect();

    // each transaction: one note for `a`, one padding output, delivered out of order
    let mut index = 0;
    let mut published = Vec::new();
    for note in &notes {
        published.push(publish(note, index));
        published.push(publish(&Note::zero(&mut OsRng), index + 1));
        index += 2;
    }
    published.reverse();
    for event in published {
        ledger.push_commitment(event);
    }

    let events = fetch_commitment_events(&ledger, &EventFilter::default().chunk_size(3))
        .await
        .unwrap();
    assert_eq!(events.len(), 6);

    let before = scan_unspent(&ledger, &a, &events).await.unwrap();
    assert_eq!(before.notes.len(), 3);
    assert_eq!(before.balance, NoteValue::new(200));

    let spent = before
        .notes
        .iter()
        .find(|n| n.amount() == NoteValue::new(70))
        .unwrap();
    ledger.mark_spent(spent.nullifier().unwrap());
    assert!(ledger.is_spent(&spent.nullifier().unwrap()).await.unwrap());

    let after = scan_unspent(&ledger, &a, &events).await.unwrap();
    assert_eq!(after.notes.len(), 2);
    assert_eq!(after.balance, NoteValue::new(130));
}
